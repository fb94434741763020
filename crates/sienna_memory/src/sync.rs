//! Reconciling out-of-band record edits (the dashboard writes the same files)
//! back into the in-memory table.
//!
//! Change detection sits behind [`ChangeSource`] so the mtime poller can be
//! swapped for a push-based feed without touching the synchronizer.

use async_trait::async_trait;
use sienna_core::{Language, Messenger};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::store::{user_id_from_path, UserRecordStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    /// A tracked file now has a newer mtime than the store last recorded.
    Modified { user_id: String, mtime: SystemTime },
    /// A file the store has never tracked (created out-of-band).
    Discovered { user_id: String, mtime: SystemTime },
}

#[async_trait]
pub trait ChangeSource: Send {
    /// Wait for and return the next batch of changes.
    async fn next_batch(&mut self) -> anyhow::Result<Vec<RecordChange>>;
}

// ============================================================================
// Polling source
// ============================================================================

/// Compares each record file's mtime against the store's tracked value on a
/// fixed interval.
pub struct MtimePoller {
    store: Arc<UserRecordStore>,
    interval: tokio::time::Interval,
}

impl MtimePoller {
    pub fn new(store: Arc<UserRecordStore>, period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(50)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        Self { store, interval }
    }

    /// One pass over the data directory. Files whose metadata cannot be read
    /// are skipped for this pass.
    pub async fn scan(&self) -> anyhow::Result<Vec<RecordChange>> {
        let dir = self.store.data_dir();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut changes = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(user_id) = user_id_from_path(&path) else {
                continue;
            };
            let mtime = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };
            match self.store.tracked_mtime(&user_id) {
                None => changes.push(RecordChange::Discovered { user_id, mtime }),
                Some(known) if mtime > known => changes.push(RecordChange::Modified { user_id, mtime }),
                Some(_) => {}
            }
        }
        Ok(changes)
    }
}

#[async_trait]
impl ChangeSource for MtimePoller {
    async fn next_batch(&mut self) -> anyhow::Result<Vec<RecordChange>> {
        self.interval.tick().await;
        self.scan().await
    }
}

// ============================================================================
// Synchronizer
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub reloaded: Vec<String>,
    pub baselined: Vec<String>,
    pub failed: Vec<String>,
}

pub struct FileWatchSynchronizer<S: ChangeSource> {
    store: Arc<UserRecordStore>,
    source: S,
    notifier: Option<Arc<dyn Messenger>>,
}

impl<S: ChangeSource> FileWatchSynchronizer<S> {
    pub fn new(store: Arc<UserRecordStore>, source: S) -> Self {
        Self {
            store,
            source,
            notifier: None,
        }
    }

    /// Tell users by direct message when their settings were changed externally.
    pub fn with_notifier(mut self, notifier: Arc<dyn Messenger>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Apply one batch. A failure on one user never stops the rest; a failed
    /// reload leaves the tracked mtime untouched so the next batch retries.
    pub async fn apply(&self, changes: Vec<RecordChange>) -> SyncReport {
        let mut report = SyncReport::default();
        for change in changes {
            match change {
                RecordChange::Discovered { user_id, mtime } => {
                    self.store.track_baseline(&user_id, mtime);
                    report.baselined.push(user_id);
                }
                RecordChange::Modified { user_id, mtime } => {
                    match self.store.reload(&user_id, mtime).await {
                        Ok(record) => {
                            tracing::info!("Reloaded record for user {} after external edit", user_id);
                            self.notify(&user_id, record.language()).await;
                            report.reloaded.push(user_id);
                        }
                        Err(e) => {
                            tracing::warn!("Could not reload record for {}: {}", user_id, e);
                            report.failed.push(user_id);
                        }
                    }
                }
            }
        }
        report
    }

    async fn notify(&self, user_id: &str, language: Language) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.send(user_id, settings_updated_text(language)).await {
            tracing::debug!("Sync notification to {} not delivered: {}", user_id, e);
        }
    }

    /// Poll forever. Runs until the task is aborted.
    pub async fn run(mut self) {
        loop {
            match self.source.next_batch().await {
                Ok(batch) if batch.is_empty() => {}
                Ok(batch) => {
                    self.apply(batch).await;
                }
                Err(e) => tracing::warn!("Record watch pass failed: {}", e),
            }
        }
    }
}

pub fn settings_updated_text(language: Language) -> &'static str {
    match language {
        Language::Ar => "```css\n[ ✨ تم تحديث إعداداتي من الموقع بنجاح! ]\n```",
        Language::En => "```css\n[ ✨ My settings were updated from the dashboard! ]\n```",
    }
}
