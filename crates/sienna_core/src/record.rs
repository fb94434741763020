//! The durable per-user record.
//!
//! One `UserRecord` exists per Discord user id. Every reader gets the same
//! defaults through `UserRecord::fresh` and the `#[serde(default)]` attributes,
//! so a file with missing keys still loads into a complete record.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::timefmt;

/// Companion name used until the user picks one.
pub const DEFAULT_COMPANION_NAME: &str = "Sienna";

/// Accepted length range (in characters) for display and companion names.
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 20;

/// Minimum age to finish onboarding.
pub const MIN_ONBOARDING_AGE: u32 = 14;
/// Minimum age to enable explicit mode.
pub const MIN_EXPLICIT_AGE: u32 = 18;

// ============================================================================
// Onboarding cursor
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    #[default]
    WaitingLanguage,
    WaitingUserName,
    WaitingAge,
    WaitingBotName,
    Normal,
}

impl OnboardingState {
    /// Position in the forward-only onboarding order.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::WaitingLanguage => 0,
            Self::WaitingUserName => 1,
            Self::WaitingAge => 2,
            Self::WaitingBotName => 3,
            Self::Normal => 4,
        }
    }

    pub fn is_onboarding(self) -> bool {
        self != Self::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ar,
    En,
}

impl Language {
    /// Map a language-choice reply to a language. Case-insensitive, trimmed.
    pub fn from_choice(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "عربي" | "ar" => Some(Self::Ar),
            "2" | "english" | "en" => Some(Self::En),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }
}

// ============================================================================
// Personality traits
// ============================================================================

pub const TRAIT_NAMES: [&str; 8] = [
    "curiosity",
    "sensitivity",
    "happiness",
    "sadness",
    "boldness",
    "kindness",
    "shyness",
    "intelligence",
];

/// The eight personality percentages. Values are clamped into `0..=100` on read,
/// and any key the file lacks takes its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Traits {
    #[serde(deserialize_with = "percent")]
    pub curiosity: u8,
    #[serde(deserialize_with = "percent")]
    pub sensitivity: u8,
    #[serde(deserialize_with = "percent")]
    pub happiness: u8,
    #[serde(deserialize_with = "percent")]
    pub sadness: u8,
    #[serde(deserialize_with = "percent")]
    pub boldness: u8,
    #[serde(deserialize_with = "percent")]
    pub kindness: u8,
    #[serde(deserialize_with = "percent")]
    pub shyness: u8,
    #[serde(deserialize_with = "percent")]
    pub intelligence: u8,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            curiosity: 50,
            sensitivity: 50,
            happiness: 50,
            sadness: 20,
            boldness: 50,
            kindness: 50,
            shyness: 20,
            intelligence: 80,
        }
    }
}

impl Traits {
    pub fn get(&self, name: &str) -> Option<u8> {
        Some(match name {
            "curiosity" => self.curiosity,
            "sensitivity" => self.sensitivity,
            "happiness" => self.happiness,
            "sadness" => self.sadness,
            "boldness" => self.boldness,
            "kindness" => self.kindness,
            "shyness" => self.shyness,
            "intelligence" => self.intelligence,
            _ => return None,
        })
    }

    /// Set a trait by name, clamping to 100. Returns false for an unknown name.
    pub fn set(&mut self, name: &str, value: u8) -> bool {
        let value = value.min(100);
        let slot = match name {
            "curiosity" => &mut self.curiosity,
            "sensitivity" => &mut self.sensitivity,
            "happiness" => &mut self.happiness,
            "sadness" => &mut self.sadness,
            "boldness" => &mut self.boldness,
            "kindness" => &mut self.kindness,
            "shyness" => &mut self.shyness,
            "intelligence" => &mut self.intelligence,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        TRAIT_NAMES
            .iter()
            .filter_map(move |name| self.get(name).map(|v| (*name, v)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = match RawNumber::deserialize(deserializer)? {
        RawNumber::Int(i) => i,
        RawNumber::Float(f) => f.round() as i64,
        RawNumber::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("trait value is not a number: {s}")))?,
    };
    Ok(value.clamp(0, 100) as u8)
}

// ============================================================================
// Profile / progress / reminders / log
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub activated: bool,
    pub state: OnboardingState,
    pub language: Option<Language>,
    #[serde(alias = "user_name")]
    pub display_name: Option<String>,
    pub age: Option<u32>,
    #[serde(alias = "bot_name")]
    pub companion_name: String,
    #[serde(alias = "sex_mode")]
    pub explicit_mode: bool,
    pub traits: Traits,
    #[serde(with = "timefmt")]
    pub joined_at: NaiveDateTime,
    pub daily_streak: u32,
    #[serde(alias = "last_daily")]
    pub last_daily_claim: Option<NaiveDate>,
    /// Keys owned by the dashboard (notification toggle, saved presets, ...).
    /// Carried through bot saves untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            activated: false,
            state: OnboardingState::WaitingLanguage,
            language: None,
            display_name: None,
            age: None,
            companion_name: DEFAULT_COMPANION_NAME.to_string(),
            explicit_mode: false,
            traits: Traits::default(),
            joined_at: timefmt::now_local(),
            daily_streak: 0,
            last_daily_claim: None,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub level: u32,
    pub xp: u32,
    pub messages: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            messages: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default)]
    pub id: u32,
    #[serde(alias = "time")]
    pub time_of_day: String,
    #[serde(default)]
    pub message: String,
    #[serde(with = "timefmt", default = "timefmt::now_local")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(with = "timefmt", default = "timefmt::now_local")]
    pub time: NaiveDateTime,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            time: timefmt::now_local(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            time: timefmt::now_local(),
        }
    }
}

// ============================================================================
// UserRecord
// ============================================================================

/// A list block that older writers sometimes stored as `{}` or `null`.
/// An object contributes its values; anything else that is not an array
/// reads as empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let items = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        _ => return Ok(Vec::new()),
    };
    items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    #[serde(alias = "user_data")]
    pub profile: Profile,
    #[serde(alias = "user_progress")]
    pub progress: Progress,
    #[serde(alias = "user_reminders", deserialize_with = "lenient_list")]
    pub reminders: Vec<Reminder>,
    #[serde(alias = "user_conversation_history", deserialize_with = "lenient_list")]
    pub conversation_log: Vec<Turn>,
}

impl UserRecord {
    /// A brand-new record: waiting for a language choice, not activated,
    /// default traits, level 1, empty reminders and log.
    pub fn fresh(companion_name: &str) -> Self {
        Self {
            profile: Profile {
                companion_name: companion_name.to_string(),
                ..Profile::default()
            },
            ..Self::default()
        }
    }

    /// Repair values a hand-edited file can get wrong but serde cannot reject.
    pub fn normalize(&mut self) {
        self.progress.level = self.progress.level.max(1);
        if self.profile.companion_name.trim().is_empty() {
            self.profile.companion_name = DEFAULT_COMPANION_NAME.to_string();
        }
        // Only the final transition sets `activated`; a half-onboarded
        // record carrying it is reset to the gate-closed default.
        if self.profile.state.is_onboarding() {
            self.profile.activated = false;
        }
    }

    /// Language for replies; records that never chose one speak Arabic.
    pub fn language(&self) -> Language {
        self.profile.language.unwrap_or(Language::Ar)
    }

    /// Display name, or `User<last four digits>` when the user never set one.
    pub fn display_name_or(&self, user_id: &str) -> String {
        match &self.profile.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => {
                let tail: String = user_id
                    .chars()
                    .rev()
                    .take(4)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("User{tail}")
            }
        }
    }

    pub fn last_user_turn(&self) -> Option<&Turn> {
        self.conversation_log
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
    }

    /// Drop turns from the head once the log exceeds `high_water`, keeping
    /// the most recent `keep`. Returns whether anything was removed.
    pub fn prune_log(&mut self, high_water: usize, keep: usize) -> bool {
        let len = self.conversation_log.len();
        if len <= high_water {
            return false;
        }
        let keep = keep.min(len);
        self.conversation_log.drain(..len - keep);
        true
    }

    pub fn next_reminder_id(&self) -> u32 {
        self.reminders.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

/// Trim and accept a name of 2 to 20 characters.
pub fn validate_name(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let len = trimmed.chars().count();
    (NAME_MIN_CHARS..=NAME_MAX_CHARS)
        .contains(&len)
        .then(|| trimmed.to_string())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid time of day {0:?}, expected HH:MM")]
pub struct TimeOfDayError(pub String);

/// Validate a 24h `HH:MM` reminder time and return it zero-padded.
pub fn parse_time_of_day(input: &str) -> Result<String, TimeOfDayError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| TimeOfDayError(input.to_string()))
}
