use sienna_memory::UserRecordStore;
use std::sync::Arc;
use std::time::Duration;

/// Bounds stored conversation logs: any log longer than `high_water` is cut
/// to its most recent `keep` turns.
pub struct LogRetention {
    store: Arc<UserRecordStore>,
    high_water: usize,
    keep: usize,
}

impl LogRetention {
    pub fn new(store: Arc<UserRecordStore>, high_water: usize, keep: usize) -> Self {
        Self {
            store,
            high_water,
            keep,
        }
    }

    /// One pass over every loaded record. Returns the users pruned.
    pub async fn sweep(&self) -> Vec<String> {
        let mut pruned = Vec::new();
        for user_id in self.store.user_ids() {
            let changed = self
                .store
                .update(&user_id, |r| r.prune_log(self.high_water, self.keep))
                .unwrap_or(false);
            if !changed {
                continue;
            }
            if let Err(e) = self.store.save_one(&user_id).await {
                tracing::warn!("Failed to persist pruned log for {}: {}", user_id, e);
            }
            tracing::info!("Pruned conversation log for {}", user_id);
            pruned.push(user_id);
        }
        pruned
    }

    pub async fn run(self, period: Duration) {
        let mut ticker = crate::ticker(period);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }
}
