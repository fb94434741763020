//! Nudges for users who went quiet mid-conversation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sienna_core::{ActivityTracker, Language, Messenger, UserRecord};
use sienna_memory::UserRecordStore;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const BUSY_AR: &[&str] = &["نوم", "نام", "هنام", "هريح", "مشغول", "شغل", "تعبت", "تعبان", "دور", "هروح"];
const BUSY_EN: &[&str] = &["sleep", "sleeping", "tired", "busy", "work", "rest", "go", "leave", "bed"];

const NUDGES_AR: &[&str] = &[
    "💭 **انت رحت فين؟** أنتظر ردك!",
    "😢 **انت زعلت مني ولا حاجه؟** ما تتغيبش عليا!",
    "✨ **فينك كل ده؟** اشتقتلك!",
    "🎭 **كارف وا كدا يعني؟** تعال كلمني!",
    "💔 **زهقت مني ولا ايه؟** ما تسيبنيش!",
];
const NUDGES_EN: &[&str] = &[
    "💭 **Where did you go?** Waiting for your reply!",
    "😢 **Are you upset with me?** Don't disappear on me!",
    "✨ **Where have you been?** I miss you!",
    "🎭 **Ignoring me like that?** Come talk to me!",
    "💔 **Getting tired of me?** Don't leave me!",
];

pub fn busy_keywords(language: Language) -> &'static [&'static str] {
    match language {
        Language::Ar => BUSY_AR,
        Language::En => BUSY_EN,
    }
}

pub fn nudges(language: Language) -> &'static [&'static str] {
    match language {
        Language::Ar => NUDGES_AR,
        Language::En => NUDGES_EN,
    }
}

/// Whether the user's latest message said they were stepping away.
pub fn signed_off(record: &UserRecord) -> bool {
    let Some(turn) = record.last_user_turn() else {
        return false;
    };
    let text = turn.content.to_lowercase();
    busy_keywords(record.language())
        .iter()
        .any(|k| text.contains(k))
}

pub struct InactivityWatcher {
    store: Arc<UserRecordStore>,
    activity: Arc<ActivityTracker>,
    messenger: Arc<dyn Messenger>,
    threshold: Duration,
    rng: Mutex<StdRng>,
}

impl InactivityWatcher {
    pub fn new(
        store: Arc<UserRecordStore>,
        activity: Arc<ActivityTracker>,
        messenger: Arc<dyn Messenger>,
        threshold: Duration,
    ) -> Self {
        Self {
            store,
            activity,
            messenger,
            threshold,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// One pass. Returns the users nudged.
    pub async fn check(&self, now: Instant) -> Vec<String> {
        let mut nudged = Vec::new();
        for user_id in self.activity.idle_since(now, self.threshold) {
            let Some(record) = self.store.get(&user_id) else {
                continue;
            };
            if !record.profile.activated || record.last_user_turn().is_none() || signed_off(&record) {
                continue;
            }

            let text = {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                let line = nudges(record.language()).choose(&mut *rng).copied().unwrap_or("💭");
                format!("```css\n[ ⏰ {} ]\n```{}", notice_label(record.language()), line)
            };
            match self.messenger.send(&user_id, &text).await {
                Ok(()) => {
                    self.activity.mark_notified(&user_id);
                    tracing::debug!("Nudged idle user {}", user_id);
                    nudged.push(user_id);
                }
                Err(e) => tracing::debug!("Nudge to {} not delivered: {}", user_id, e),
            }
        }
        nudged
    }

    pub async fn run(self, period: Duration) {
        let mut ticker = crate::ticker(period);
        loop {
            ticker.tick().await;
            self.check(Instant::now()).await;
        }
    }
}

fn notice_label(language: Language) -> &'static str {
    match language {
        Language::Ar => "إشعار",
        Language::En => "Notice",
    }
}
