pub mod activity;
pub mod config;
pub mod record;
pub mod timefmt;

pub use activity::ActivityTracker;
pub use config::SiennaConfig;
pub use record::{
    Language, OnboardingState, Profile, Progress, Reminder, Role, Traits, Turn, UserRecord,
};

use async_trait::async_trait;

/// Outbound direct-message delivery to a single user.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, user_id: &str, text: &str) -> anyhow::Result<()>;
}
