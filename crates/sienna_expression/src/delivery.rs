use sienna_core::Messenger;
use std::sync::Arc;
use std::time::Duration;

/// Sends a reply's segments as separate messages, in order, with a short
/// pause between them.
#[derive(Clone)]
pub struct SegmentDelivery {
    messenger: Arc<dyn Messenger>,
    delay: Duration,
}

impl SegmentDelivery {
    pub fn new(messenger: Arc<dyn Messenger>, delay: Duration) -> Self {
        Self { messenger, delay }
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    /// Blank segments are skipped. Stops at the first failed send so later
    /// segments never arrive without the earlier ones. Returns how many
    /// segments were sent.
    pub async fn deliver(&self, user_id: &str, segments: &[String]) -> anyhow::Result<usize> {
        let mut sent = 0;
        for segment in segments.iter().filter(|s| !s.trim().is_empty()) {
            if sent > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.messenger.send(user_id, segment).await?;
            sent += 1;
        }
        Ok(sent)
    }
}
