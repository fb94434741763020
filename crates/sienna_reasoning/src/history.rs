//! Bounded model context from a user's full conversation log.

use rand::seq::index;
use rand::Rng;
use sienna_core::Turn;

/// Recency-biased window with occasional recall of older turns.
///
/// Short logs yield the most recent `recent` turns. Once the log is longer
/// than `recall_threshold`, up to `max_recalled` turns are sampled without
/// replacement from everything except the newest `protected_tail` turns and
/// placed (oldest first) ahead of the recent turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindowBuilder {
    pub recall_threshold: usize,
    pub recent: usize,
    pub protected_tail: usize,
    pub max_recalled: usize,
}

impl Default for HistoryWindowBuilder {
    fn default() -> Self {
        Self {
            recall_threshold: 15,
            recent: 6,
            protected_tail: 8,
            max_recalled: 2,
        }
    }
}

impl HistoryWindowBuilder {
    /// Upper bound on the window length.
    pub fn max_len(&self) -> usize {
        self.recent + self.max_recalled
    }

    pub fn build<R: Rng + ?Sized>(&self, log: &[Turn], rng: &mut R) -> Vec<Turn> {
        let recent_start = log.len().saturating_sub(self.recent);
        let mut window = Vec::with_capacity(self.max_len());

        if log.len() > self.recall_threshold {
            let pool = log.len().saturating_sub(self.protected_tail);
            let k = self.max_recalled.min(pool);
            if k > 0 {
                let mut picked = index::sample(rng, pool, k).into_vec();
                picked.sort_unstable();
                window.extend(picked.into_iter().map(|i| log[i].clone()));
            }
        }

        window.extend_from_slice(&log[recent_start..]);
        window
    }
}
