//! Onboarding and chat transitions for one inbound direct message.
//!
//! `advance` is synchronous and mutates the record in place; the caller holds
//! the store's lock for its duration, so no other task ever observes a
//! half-applied transition. Model calls are described by [`Step::Chat`] and
//! performed by the caller afterwards.

use crate::api_types::ChatMessage;
use crate::history::HistoryWindowBuilder;
use crate::llm::CompletionParams;
use crate::prompts::{ContextAssembler, ModelParams};
use crate::quick_replies::QuickReplies;
use crate::replies;
use rand::Rng;
use sienna_core::record::{validate_name, MIN_ONBOARDING_AGE};
use sienna_core::{Language, OnboardingState, Turn, UserRecord};

/// Ages above this are treated as typos.
pub const MAX_AGE: u32 = 120;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Deliver these segments; the record is unchanged.
    Reply(Vec<String>),
    /// The record changed; persist it, then deliver these segments.
    Advanced(Vec<String>),
    /// The user turn has been appended; ask the model.
    Chat(ChatRequest),
}

impl Step {
    pub fn mutated(&self) -> bool {
        !matches!(self, Step::Reply(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub params: CompletionParams,
    pub language: Language,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStateMachine {
    history: HistoryWindowBuilder,
    quick: QuickReplies,
    params: ModelParams,
}

impl ConversationStateMachine {
    pub fn new(history: HistoryWindowBuilder, params: ModelParams) -> Self {
        Self {
            history,
            quick: QuickReplies,
            params,
        }
    }

    pub fn advance<R: Rng + ?Sized>(&self, record: &mut UserRecord, input: &str, rng: &mut R) -> Step {
        match record.profile.state {
            OnboardingState::WaitingLanguage => match Language::from_choice(input) {
                Some(language) => {
                    record.profile.language = Some(language);
                    record.profile.state = OnboardingState::WaitingUserName;
                    Step::Advanced(replies::language_selected(language))
                }
                None => Step::Reply(vec![replies::language_unrecognized()]),
            },

            OnboardingState::WaitingUserName => {
                let language = record.language();
                match validate_name(input) {
                    Some(name) => {
                        let segments = replies::name_accepted(language, &name);
                        record.profile.display_name = Some(name);
                        record.profile.state = OnboardingState::WaitingAge;
                        Step::Advanced(segments)
                    }
                    None => Step::Reply(vec![replies::name_invalid(language)]),
                }
            }

            OnboardingState::WaitingAge => {
                let language = record.language();
                match parse_age(input) {
                    AgeInput::Accepted(age) => {
                        record.profile.age = Some(age);
                        record.profile.state = OnboardingState::WaitingBotName;
                        Step::Advanced(replies::age_accepted(language, age))
                    }
                    AgeInput::TooYoung => Step::Reply(vec![replies::age_too_young(language)]),
                    AgeInput::Invalid => Step::Reply(vec![replies::age_not_a_number(language)]),
                }
            }

            OnboardingState::WaitingBotName => {
                let language = record.language();
                match validate_name(input) {
                    Some(name) => {
                        record.profile.companion_name = name;
                        record.profile.activated = true;
                        record.profile.state = OnboardingState::Normal;
                        Step::Advanced(replies::companion_named(language, &record.profile))
                    }
                    None => Step::Reply(vec![replies::companion_name_invalid(language)]),
                }
            }

            OnboardingState::Normal => self.chat(record, input, rng),
        }
    }

    fn chat<R: Rng + ?Sized>(&self, record: &mut UserRecord, input: &str, rng: &mut R) -> Step {
        let language = record.language();
        if !record.profile.activated {
            return Step::Reply(vec![replies::not_activated(language)]);
        }
        if let Some(reply) = self.quick.lookup(language, input, rng) {
            return Step::Reply(vec![reply.to_string()]);
        }

        record.conversation_log.push(Turn::user(input));
        let window = self.history.build(&record.conversation_log, rng);
        Step::Chat(ChatRequest {
            system: ContextAssembler::system_prompt(&record.profile, language),
            messages: window.iter().map(ChatMessage::from).collect(),
            params: self.params.for_profile(&record.profile),
            language,
        })
    }
}

enum AgeInput {
    Accepted(u32),
    TooYoung,
    Invalid,
}

fn parse_age(input: &str) -> AgeInput {
    match input.trim().parse::<i64>() {
        Ok(age) if age < i64::from(MIN_ONBOARDING_AGE) => AgeInput::TooYoung,
        Ok(age) if age <= i64::from(MAX_AGE) => AgeInput::Accepted(age as u32),
        _ => AgeInput::Invalid,
    }
}
