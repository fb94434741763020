pub mod store;
pub mod sync;

pub use store::{StoreError, UserRecordStore};
pub use sync::{ChangeSource, FileWatchSynchronizer, MtimePoller, RecordChange, SyncReport};

#[cfg(test)]
mod tests;
