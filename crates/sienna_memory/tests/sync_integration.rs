//! Integration tests for the file-watch synchronizer.
//!
//! Uses tempfile::TempDir for an isolated data directory and writes record
//! files directly, the way the dashboard does.

use async_trait::async_trait;
use sienna_core::Messenger;
use sienna_memory::{
    FileWatchSynchronizer, MtimePoller, RecordChange, UserRecordStore,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        self.sent.lock().await.push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}

struct UnreachableMessenger;

#[async_trait]
impl Messenger for UnreachableMessenger {
    async fn send(&self, _user_id: &str, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("cannot open DM channel")
    }
}

/// Write `body` to the file and push its mtime `ahead` into the future, so the
/// test does not depend on filesystem timestamp resolution.
fn external_write(path: &Path, body: &str, ahead: Duration) {
    std::fs::write(path, body).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + ahead).unwrap();
}

async fn setup(dir: &tempfile::TempDir) -> (Arc<UserRecordStore>, MtimePoller) {
    let store = Arc::new(UserRecordStore::new(dir.path(), "Sienna"));
    store.load_all().await.unwrap();
    let poller = MtimePoller::new(store.clone(), Duration::from_millis(50));
    (store, poller)
}

#[tokio::test]
async fn test_own_save_is_not_reported() {
    let dir = tempfile::TempDir::new().unwrap();
    let (store, poller) = setup(&dir).await;

    store.load_one("1001").await.unwrap();
    store.update("1001", |r| r.progress.xp = 10);
    store.save_one("1001").await.unwrap();

    assert!(poller.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_external_edit_is_reloaded_and_notified() {
    let dir = tempfile::TempDir::new().unwrap();
    let (store, poller) = setup(&dir).await;
    store.load_one("1001").await.unwrap();

    let path = dir.path().join("1001.json");
    external_write(
        &path,
        r#"{"user_data": {"bot_name": "Luna", "language": "en", "traits": {"kindness": 95}}}"#,
        Duration::from_secs(5),
    );

    let changes = poller.scan().await.unwrap();
    assert!(matches!(
        changes.as_slice(),
        [RecordChange::Modified { user_id, .. }] if user_id == "1001"
    ));

    let messenger = RecordingMessenger::new();
    let sync = FileWatchSynchronizer::new(store.clone(), MtimePoller::new(store.clone(), Duration::from_secs(1)))
        .with_notifier(messenger.clone());
    let report = sync.apply(changes).await;
    assert_eq!(report.reloaded, vec!["1001".to_string()]);

    let record = store.get("1001").unwrap();
    assert_eq!(record.profile.companion_name, "Luna");
    assert_eq!(record.profile.traits.kindness, 95);

    let sent = messenger.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "1001");
    assert!(sent[0].1.contains("dashboard"));
    drop(sent);

    // Up to date now: the same file is not reported again.
    assert!(poller.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_new_file_is_only_baselined() {
    let dir = tempfile::TempDir::new().unwrap();
    let (store, poller) = setup(&dir).await;

    external_write(
        &dir.path().join("2002.json"),
        r#"{"user_data": {"user_name": "Out of band"}}"#,
        Duration::ZERO,
    );

    let changes = poller.scan().await.unwrap();
    assert!(matches!(changes.as_slice(), [RecordChange::Discovered { .. }]));

    let messenger = RecordingMessenger::new();
    let sync = FileWatchSynchronizer::new(store.clone(), MtimePoller::new(store.clone(), Duration::from_secs(1)))
        .with_notifier(messenger.clone());
    let report = sync.apply(changes).await;

    assert_eq!(report.baselined, vec!["2002".to_string()]);
    assert!(report.reloaded.is_empty());
    assert!(!store.contains("2002"));
    assert!(store.tracked_mtime("2002").is_some());
    assert!(messenger.sent.lock().await.is_empty());
    assert!(poller.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_edit_is_retried_next_pass() {
    let dir = tempfile::TempDir::new().unwrap();
    let (store, poller) = setup(&dir).await;
    store.load_one("1001").await.unwrap();
    store.load_one("1002").await.unwrap();
    let tracked_before = store.tracked_mtime("1001").unwrap();

    external_write(&dir.path().join("1001.json"), "{ half written", Duration::from_secs(5));
    external_write(
        &dir.path().join("1002.json"),
        r#"{"profile": {"companion_name": "Maya"}}"#,
        Duration::from_secs(5),
    );

    let sync = FileWatchSynchronizer::new(store.clone(), MtimePoller::new(store.clone(), Duration::from_secs(1)));
    let report = sync.apply(poller.scan().await.unwrap()).await;

    // One bad file does not stop the other user's reload.
    assert_eq!(report.failed, vec!["1001".to_string()]);
    assert_eq!(report.reloaded, vec!["1002".to_string()]);
    assert_eq!(store.get("1002").unwrap().profile.companion_name, "Maya");
    assert_eq!(store.tracked_mtime("1001"), Some(tracked_before));

    // The failed user is still reported as modified.
    let again = poller.scan().await.unwrap();
    assert!(again
        .iter()
        .any(|c| matches!(c, RecordChange::Modified { user_id, .. } if user_id == "1001")));

    // Once the writer finishes, the reload succeeds.
    external_write(
        &dir.path().join("1001.json"),
        r#"{"profile": {"companion_name": "Zara"}}"#,
        Duration::from_secs(10),
    );
    let report = sync.apply(poller.scan().await.unwrap()).await;
    assert_eq!(report.reloaded, vec!["1001".to_string()]);
    assert_eq!(store.get("1001").unwrap().profile.companion_name, "Zara");
}

#[tokio::test]
async fn test_unreachable_user_does_not_fail_reload() {
    let dir = tempfile::TempDir::new().unwrap();
    let (store, poller) = setup(&dir).await;
    store.load_one("1001").await.unwrap();

    external_write(
        &dir.path().join("1001.json"),
        r#"{"profile": {"explicit_mode": true}}"#,
        Duration::from_secs(5),
    );

    let sync = FileWatchSynchronizer::new(store.clone(), MtimePoller::new(store.clone(), Duration::from_secs(1)))
        .with_notifier(Arc::new(UnreachableMessenger));
    let report = sync.apply(poller.scan().await.unwrap()).await;
    assert_eq!(report.reloaded, vec!["1001".to_string()]);
    assert!(store.get("1001").unwrap().profile.explicit_mode);
}

#[tokio::test]
async fn test_run_loop_picks_up_changes() {
    let dir = tempfile::TempDir::new().unwrap();
    let (store, _poller) = setup(&dir).await;
    store.load_one("1001").await.unwrap();

    let sync = FileWatchSynchronizer::new(store.clone(), MtimePoller::new(store.clone(), Duration::from_millis(50)));
    let handle = tokio::spawn(sync.run());

    external_write(
        &dir.path().join("1001.json"),
        r#"{"profile": {"companion_name": "Ivy"}}"#,
        Duration::from_secs(5),
    );

    let mut seen = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if store.get("1001").map(|r| r.profile.companion_name == "Ivy").unwrap_or(false) {
            seen = true;
            break;
        }
    }
    handle.abort();
    assert!(seen, "synchronizer never reloaded the edit");
}
