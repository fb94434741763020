//! Per-user activity bookkeeping shared by the chat path and the inactivity loop.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Default)]
struct ActivityState {
    last_active: HashMap<String, Instant>,
    notified: HashSet<String>,
}

/// Tracks when each user last spoke and who has already been nudged since.
///
/// A user is nudged at most once per silence: `touch` clears the notified flag,
/// `mark_notified` sets it.
#[derive(Default)]
pub struct ActivityTracker {
    inner: Mutex<ActivityState>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record inbound activity for `user_id` at `now`.
    pub fn touch(&self, user_id: &str, now: Instant) {
        let mut state = self.lock();
        state.last_active.insert(user_id.to_string(), now);
        state.notified.remove(user_id);
    }

    pub fn mark_notified(&self, user_id: &str) {
        self.lock().notified.insert(user_id.to_string());
    }

    pub fn is_notified(&self, user_id: &str) -> bool {
        self.lock().notified.contains(user_id)
    }

    /// Users silent for longer than `threshold` who have not been nudged yet.
    pub fn idle_since(&self, now: Instant, threshold: Duration) -> Vec<String> {
        let state = self.lock();
        let mut idle: Vec<String> = state
            .last_active
            .iter()
            .filter(|(uid, at)| {
                now.saturating_duration_since(**at) > threshold && !state.notified.contains(*uid)
            })
            .map(|(uid, _)| uid.clone())
            .collect();
        idle.sort();
        idle
    }

    pub fn forget(&self, user_id: &str) {
        let mut state = self.lock();
        state.last_active.remove(user_id);
        state.notified.remove(user_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActivityState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
