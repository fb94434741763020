use crate::{
    llm::{BackendError, LlmClient},
    machine::{ChatRequest, ConversationStateMachine, Step},
    progress::{self, DailyClaim, LeaderboardEntry, LeaderboardPage, ProgressEngine},
    replies,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use sienna_core::record::{parse_time_of_day, MIN_EXPLICIT_AGE};
use sienna_core::{timefmt, ActivityTracker, Language, Profile, Reminder, SiennaConfig, Turn, UserRecord};
use sienna_memory::{StoreError, UserRecordStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Longest backend error excerpt shown to a user.
const ERROR_EXCERPT_CHARS: usize = 100;

/// Answers that confirm a pending reset.
const RESET_CONFIRMATIONS: [&str; 4] = ["نعم", "yes", "y", "✅"];

// ============================================================================
// Replies and outcomes
// ============================================================================

/// Outbound text for one inbound trigger: ordered segments, plus a separate
/// level-up announcement when the trigger crossed a level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub segments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_up: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![text.into()],
            level_up: None,
        }
    }

    pub fn segments(segments: Vec<String>) -> Self {
        Self {
            segments,
            level_up: None,
        }
    }

    /// Everything to deliver, in order.
    pub fn messages(&self) -> Vec<String> {
        self.segments
            .iter()
            .chain(self.level_up.iter())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub outcome: T,
    #[serde(flatten)]
    pub reply: Reply,
}

impl<T> Outcome<T> {
    fn new(outcome: T, reply: Reply) -> Self {
        Self { outcome, reply }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActivationOutcome {
    Activated,
    InvalidCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DailyOutcome {
    Granted {
        xp_gained: u32,
        streak: u32,
        level: u32,
        xp: u32,
    },
    AlreadyClaimed {
        remaining_secs: i64,
    },
    NotActivated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReminderOutcome {
    Added { reminder: Reminder },
    InvalidTime,
    NotActivated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExplicitOutcome {
    Updated { enabled: bool },
    Underage,
    NotActivated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResetOutcome {
    AwaitingConfirmation { window_secs: u64 },
    NotActivated,
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub activation_code: String,
    pub backend_timeout: Duration,
    pub reset_window: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &SiennaConfig) -> Self {
        Self {
            activation_code: config.bot.activation_code.clone(),
            backend_timeout: config.llm.timeout(),
            reset_window: Duration::from_secs(config.bot.reset_confirm_secs),
        }
    }
}

/// Orchestrates one inbound trigger for one user: load, transition, model
/// call, progress, persist.
///
/// Triggers for the same user are serialized by a per-user lock held for the
/// whole trigger (model call included); different users never wait on each
/// other. Store and RNG locks are only taken inside synchronous sections.
pub struct ChatEngine {
    store: Arc<UserRecordStore>,
    client: Arc<dyn LlmClient>,
    activity: Arc<ActivityTracker>,
    machine: ConversationStateMachine,
    progress: ProgressEngine,
    settings: EngineSettings,
    rng: Mutex<StdRng>,
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    pending_resets: Mutex<HashMap<String, Instant>>,
}

impl ChatEngine {
    pub fn new(
        store: Arc<UserRecordStore>,
        client: Arc<dyn LlmClient>,
        activity: Arc<ActivityTracker>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            client,
            activity,
            machine: ConversationStateMachine::default(),
            progress: ProgressEngine::default(),
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
            turn_locks: Mutex::new(HashMap::new()),
            pending_resets: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_machine(mut self, machine: ConversationStateMachine) -> Self {
        self.machine = machine;
        self
    }

    pub fn with_progress(mut self, progress: ProgressEngine) -> Self {
        self.progress = progress;
        self
    }

    /// Seed the randomness used for quick replies, recall sampling and XP.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn store(&self) -> &Arc<UserRecordStore> {
        &self.store
    }

    pub fn activity(&self) -> &Arc<ActivityTracker> {
        &self.activity
    }

    // ------------------------------------------------------------------
    // Direct messages
    // ------------------------------------------------------------------

    /// Process one direct message. Always produces at least one segment.
    #[tracing::instrument(skip(self, text))]
    pub async fn handle_message(&self, user_id: &str, text: &str) -> Reply {
        let lock = self.turn_lock(user_id);
        let _turn = lock.lock().await;
        self.activity.touch(user_id, Instant::now());

        if let Some(reply) = self.answer_pending_reset(user_id, text).await {
            return reply;
        }

        if let Err(e) = self.store.load_one(user_id).await {
            tracing::warn!("Cannot load record for {}: {}", user_id, e);
            return Reply::text(replies::record_unavailable());
        }

        let step = self.locked_rng(|rng| {
            self.store
                .update(user_id, |record| self.machine.advance(record, text, rng))
        });
        let Some(step) = step else {
            return Reply::text(replies::record_unavailable());
        };

        match step {
            Step::Reply(segments) => Reply::segments(segments),
            Step::Advanced(segments) => {
                self.persist(user_id).await;
                Reply::segments(segments)
            }
            Step::Chat(request) => {
                // The user turn is on disk before the model call yields.
                self.persist(user_id).await;
                self.complete_chat(user_id, request).await
            }
        }
    }

    async fn complete_chat(&self, user_id: &str, request: ChatRequest) -> Reply {
        let ChatRequest {
            system,
            messages,
            params,
            language,
        } = request;
        tracing::debug!("Sending {} context turns to {}", messages.len(), self.client.model());

        let timeout = self.settings.backend_timeout;
        let result = match tokio::time::timeout(timeout, self.client.complete(&system, messages, params)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(timeout)),
        };

        let reply = match result {
            Ok(text) => {
                let level = self.locked_rng(|rng| {
                    self.store.update(user_id, |record| {
                        record.conversation_log.push(Turn::assistant(text.clone()));
                        self.progress.on_chat_turn(&mut record.progress, rng)
                    })
                });
                Reply {
                    segments: vec![text],
                    level_up: level.flatten().map(|l| replies::level_up(language, l)),
                }
            }
            Err(e) => {
                tracing::warn!("Model call failed for {}: {}", user_id, e);
                Reply::text(replies::backend_failure(language, &e.user_facing(ERROR_EXCERPT_CHARS)))
            }
        };

        // The user turn was appended either way.
        self.persist(user_id).await;
        reply
    }

    // ------------------------------------------------------------------
    // Account actions
    // ------------------------------------------------------------------

    /// Restart onboarding. Progress, reminders and the log survive; profile
    /// keys owned by the dashboard are carried over.
    #[tracing::instrument(skip(self, code))]
    pub async fn activate(&self, user_id: &str, code: &str) -> Result<Outcome<ActivationOutcome>, StoreError> {
        if code.trim() != self.settings.activation_code {
            tracing::info!("Rejected activation code for {}", user_id);
            return Ok(Outcome::new(
                ActivationOutcome::InvalidCode,
                Reply::text(replies::invalid_code()),
            ));
        }

        let lock = self.turn_lock(user_id);
        let _turn = lock.lock().await;

        match self.store.load_one(user_id).await {
            Ok(_) => {}
            Err(e @ StoreError::Corrupt { .. }) => {
                tracing::warn!("Replacing unreadable record on activation: {}", e);
                self.store.insert(user_id, self.store.fresh_record());
            }
            Err(e) => return Err(e),
        }

        let fresh = self.store.fresh_record().profile;
        self.mutate(user_id, |record, _| {
            let extra = std::mem::take(&mut record.profile.extra);
            record.profile = Profile {
                extra,
                ..fresh
            };
        })?;
        self.lock_resets().remove(user_id);
        self.activity.touch(user_id, Instant::now());
        self.persist(user_id).await;

        tracing::info!("Activated user {}", user_id);
        Ok(Outcome::new(
            ActivationOutcome::Activated,
            Reply::segments(replies::activation_prompt()),
        ))
    }

    #[tracing::instrument(skip(self))]
    pub async fn claim_daily(&self, user_id: &str) -> Result<Outcome<DailyOutcome>, StoreError> {
        let lock = self.turn_lock(user_id);
        let _turn = lock.lock().await;
        self.store.load_one(user_id).await?;

        let now = timefmt::now_local();
        let (outcome, reply) = self.mutate(user_id, |record, rng| {
            let language = record.language();
            if !record.profile.activated {
                return (
                    DailyOutcome::NotActivated,
                    Reply::text(replies::not_activated(language)),
                );
            }
            match self
                .progress
                .claim_daily(&mut record.profile, &mut record.progress, now, rng)
            {
                DailyClaim::Granted(reward) => (
                    DailyOutcome::Granted {
                        xp_gained: reward.total(),
                        streak: reward.streak,
                        level: record.progress.level,
                        xp: record.progress.xp,
                    },
                    Reply {
                        segments: vec![replies::daily_granted(language, &reward, &record.progress)],
                        level_up: reward.level_up.map(|l| replies::level_up(language, l)),
                    },
                ),
                DailyClaim::AlreadyClaimed { remaining } => {
                    let minutes = remaining.num_minutes();
                    (
                        DailyOutcome::AlreadyClaimed {
                            remaining_secs: remaining.num_seconds(),
                        },
                        Reply::text(replies::daily_already_claimed(language, minutes / 60, minutes % 60)),
                    )
                }
            }
        })?;

        if matches!(outcome, DailyOutcome::Granted { .. }) {
            self.persist(user_id).await;
        }
        Ok(Outcome::new(outcome, reply))
    }

    #[tracing::instrument(skip(self, message))]
    pub async fn set_reminder(
        &self,
        user_id: &str,
        time_of_day: &str,
        message: &str,
    ) -> Result<Outcome<ReminderOutcome>, StoreError> {
        let lock = self.turn_lock(user_id);
        let _turn = lock.lock().await;
        self.store.load_one(user_id).await?;

        let parsed = parse_time_of_day(time_of_day);
        let (outcome, reply) = self.mutate(user_id, |record, _| {
            let language = record.language();
            if !record.profile.activated {
                return (
                    ReminderOutcome::NotActivated,
                    Reply::text(replies::not_activated(language)),
                );
            }
            match parsed {
                Ok(time_of_day) => {
                    let reminder = Reminder {
                        id: record.next_reminder_id(),
                        time_of_day,
                        message: message.trim().to_string(),
                        created_at: timefmt::now_local(),
                    };
                    record.reminders.push(reminder.clone());
                    let reply = Reply::text(replies::reminder_added(language, &reminder));
                    (ReminderOutcome::Added { reminder }, reply)
                }
                Err(_) => (
                    ReminderOutcome::InvalidTime,
                    Reply::text(replies::reminder_invalid_time(language)),
                ),
            }
        })?;

        if matches!(outcome, ReminderOutcome::Added { .. }) {
            self.persist(user_id).await;
        }
        Ok(Outcome::new(outcome, reply))
    }

    /// Read-only. A user with no record is `UnknownUser`; no file is created.
    pub async fn list_reminders(&self, user_id: &str) -> Result<Outcome<Vec<Reminder>>, StoreError> {
        let record = self.store.load_existing(user_id).await?;
        let reply = Reply::text(replies::reminder_list(record.language(), &record.reminders));
        Ok(Outcome::new(record.reminders, reply))
    }

    /// `Some(on)` sets the mode, `None` toggles it. Turning it off clears
    /// the conversation log.
    #[tracing::instrument(skip(self))]
    pub async fn set_explicit_mode(
        &self,
        user_id: &str,
        desired: Option<bool>,
    ) -> Result<Outcome<ExplicitOutcome>, StoreError> {
        let lock = self.turn_lock(user_id);
        let _turn = lock.lock().await;
        self.store.load_one(user_id).await?;

        let (outcome, reply) = self.mutate(user_id, |record, _| {
            let language = record.language();
            if !record.profile.activated {
                return (
                    ExplicitOutcome::NotActivated,
                    Reply::text(replies::not_activated(language)),
                );
            }
            if record.profile.age.unwrap_or(0) < MIN_EXPLICIT_AGE {
                return (
                    ExplicitOutcome::Underage,
                    Reply::text(replies::explicit_underage(language)),
                );
            }
            let enabled = desired.unwrap_or(!record.profile.explicit_mode);
            record.profile.explicit_mode = enabled;
            if !enabled {
                record.conversation_log.clear();
            }
            (
                ExplicitOutcome::Updated { enabled },
                Reply::text(replies::explicit_changed(language, enabled)),
            )
        })?;

        if matches!(outcome, ExplicitOutcome::Updated { .. }) {
            self.persist(user_id).await;
        }
        Ok(Outcome::new(outcome, reply))
    }

    /// Arm a reset. The user's next direct message inside the window is the
    /// answer. A user with no record is `UnknownUser`.
    pub async fn request_reset(&self, user_id: &str) -> Result<Outcome<ResetOutcome>, StoreError> {
        let record = self.store.load_existing(user_id).await?;
        let language = record.language();
        if !record.profile.activated {
            return Ok(Outcome::new(
                ResetOutcome::NotActivated,
                Reply::text(replies::not_activated(language)),
            ));
        }

        let window = self.settings.reset_window;
        self.lock_resets()
            .insert(user_id.to_string(), Instant::now() + window);
        Ok(Outcome::new(
            ResetOutcome::AwaitingConfirmation {
                window_secs: window.as_secs(),
            },
            Reply::text(replies::reset_prompt(language, window.as_secs())),
        ))
    }

    /// Consume a pending reset if one is armed and still open.
    async fn answer_pending_reset(&self, user_id: &str, text: &str) -> Option<Reply> {
        let deadline = self.lock_resets().remove(user_id)?;
        if Instant::now() > deadline {
            tracing::debug!("Reset window for {} expired", user_id);
            return None;
        }

        let language = self
            .store
            .get(user_id)
            .map(|r| r.language())
            .unwrap_or(Language::Ar);
        let answer = text.trim().to_lowercase();
        if !RESET_CONFIRMATIONS.contains(&answer.as_str()) {
            return Some(Reply::text(replies::reset_cancelled(language)));
        }

        match self.store.delete(user_id).await {
            Ok(()) => {
                self.activity.forget(user_id);
                tracing::info!("User {} reset their data", user_id);
                Some(Reply::text(replies::reset_done(language)))
            }
            Err(e) => {
                tracing::error!("Reset for {} failed: {}", user_id, e);
                Some(Reply::text(replies::record_unavailable()))
            }
        }
    }

    // ------------------------------------------------------------------
    // Leaderboard
    // ------------------------------------------------------------------

    pub fn leaderboard(&self, page: usize) -> LeaderboardPage {
        progress::leaderboard_page(&self.store.snapshot(), page)
    }

    pub fn rank(&self, user_id: &str) -> Option<LeaderboardEntry> {
        progress::rank_of(&self.store.snapshot(), user_id)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn turn_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.turn_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    fn lock_resets(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.pending_resets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn locked_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    /// Apply `f` to the loaded record under the store lock.
    fn mutate<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserRecord, &mut StdRng) -> T,
    ) -> Result<T, StoreError> {
        self.locked_rng(|rng| self.store.update(user_id, |record| f(record, rng)))
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))
    }

    /// Persistence failures never fail the trigger: the in-memory record
    /// stays authoritative until the next successful save.
    async fn persist(&self, user_id: &str) {
        if let Err(e) = self.store.save_one(user_id).await {
            tracing::warn!("Failed to persist record for {}: {}", user_id, e);
        }
    }
}
