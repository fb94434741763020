//! Fires reminders whose time of day matches the current local minute.

use chrono::Local;
use sienna_core::{Language, Messenger, Reminder};
use sienna_memory::UserRecordStore;
use std::sync::Arc;
use std::time::Duration;

pub struct ReminderDispatcher {
    store: Arc<UserRecordStore>,
    messenger: Arc<dyn Messenger>,
}

impl ReminderDispatcher {
    pub fn new(store: Arc<UserRecordStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self { store, messenger }
    }

    /// Send every reminder due at `now_hhmm` and remove it once delivered.
    /// An undelivered reminder stays queued and is retried on the next pass.
    /// Returns the number fired.
    pub async fn dispatch_due(&self, now_hhmm: &str) -> usize {
        let mut fired = 0;
        for (user_id, record) in self.store.snapshot() {
            let due: Vec<&Reminder> = record
                .reminders
                .iter()
                .filter(|r| r.time_of_day == now_hhmm)
                .collect();
            if due.is_empty() {
                continue;
            }

            let mut delivered = Vec::new();
            for reminder in due {
                let text = reminder_text(record.language(), reminder);
                match self.messenger.send(&user_id, &text).await {
                    Ok(()) => delivered.push(reminder.id),
                    Err(e) => tracing::warn!("Reminder #{} for {} not delivered: {}", reminder.id, user_id, e),
                }
            }
            if delivered.is_empty() {
                continue;
            }

            // Remove by id on the live record; it may have changed while sending.
            self.store.update(&user_id, |r| {
                r.reminders.retain(|rem| !delivered.contains(&rem.id));
            });
            if let Err(e) = self.store.save_one(&user_id).await {
                tracing::warn!("Failed to persist fired reminders for {}: {}", user_id, e);
            }
            fired += delivered.len();
        }
        if fired > 0 {
            tracing::info!("Fired {} reminders at {}", fired, now_hhmm);
        }
        fired
    }

    pub async fn run(self, period: Duration) {
        let mut ticker = crate::ticker(period);
        loop {
            ticker.tick().await;
            let now = Local::now().format("%H:%M").to_string();
            self.dispatch_due(&now).await;
        }
    }
}

pub fn reminder_text(language: Language, reminder: &Reminder) -> String {
    let fallback = match language {
        Language::Ar => "بدون رسالة",
        Language::En => "No message",
    };
    let body = if reminder.message.trim().is_empty() {
        fallback
    } else {
        reminder.message.as_str()
    };
    match language {
        Language::Ar => format!("```css\n[ ⏰ تذكير ]\n```**{body}**"),
        Language::En => format!("```css\n[ ⏰ Reminder ]\n```**{body}**"),
    }
}
