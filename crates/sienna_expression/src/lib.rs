//! Outbound side of the companion: paced segment delivery and the periodic
//! loops that speak without being spoken to.

pub mod delivery;
pub mod inactivity;
pub mod reminders;
pub mod retention;

pub use delivery::SegmentDelivery;
pub use inactivity::InactivityWatcher;
pub use reminders::ReminderDispatcher;
pub use retention::LogRetention;

use std::time::Duration;

/// A fixed-period ticker that does not try to catch up on missed ticks.
pub(crate) fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(10)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval
}
