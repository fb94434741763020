use crate::store::{user_id_from_path, StoreError, UserRecordStore};
use sienna_core::{Language, OnboardingState, Reminder, Turn};
use std::path::Path;

fn store_in(dir: &tempfile::TempDir) -> UserRecordStore {
    UserRecordStore::new(dir.path(), "Sienna")
}

#[tokio::test]
async fn test_first_touch_creates_default_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);

    let record = store.load_one("1001").await.expect("load_one failed");
    assert_eq!(record.profile.state, OnboardingState::WaitingLanguage);
    assert_eq!(record.profile.companion_name, "Sienna");
    assert!(dir.path().join("1001.json").exists());
    assert!(store.tracked_mtime("1001").is_some());
}

#[tokio::test]
async fn test_load_existing_never_creates_a_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);

    let err = store.load_existing("1001").await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownUser(ref id) if id == "1001"));
    assert!(!dir.path().join("1001.json").exists());
    assert!(!store.contains("1001"));
    assert!(store.tracked_mtime("1001").is_none());

    store.load_one("1001").await.unwrap();
    let reopened = store_in(&dir);
    let record = reopened.load_existing("1001").await.unwrap();
    assert_eq!(record.profile.companion_name, "Sienna");
    assert!(reopened.tracked_mtime("1001").is_some());
}

#[tokio::test]
async fn test_save_then_load_roundtrip() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    store.load_one("1001").await.unwrap();

    store.update("1001", |r| {
        r.profile.language = Some(Language::En);
        r.profile.display_name = Some("Sam".into());
        r.profile.age = Some(17);
        r.profile.state = OnboardingState::WaitingBotName;
        r.profile.traits.set("boldness", 77);
        r.progress.xp = 42;
        r.reminders.push(Reminder {
            id: 1,
            time_of_day: "07:45".into(),
            message: "stretch".into(),
            created_at: sienna_core::timefmt::now_local(),
        });
        r.conversation_log.push(Turn::user("hi"));
        r.conversation_log.push(Turn::assistant("hey you"));
        r.profile
            .extra
            .insert("notifications".into(), serde_json::json!(true));
    });
    let before = store.get("1001").unwrap();
    store.save_one("1001").await.expect("save failed");

    // A second store on the same directory reads from disk.
    let reopened = store_in(&dir);
    let after = reopened.load_one("1001").await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_file_uses_stable_block_keys() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    store.load_one("1001").await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("1001.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for key in ["profile", "progress", "reminders", "conversation_log", "last_save"] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
}

#[tokio::test]
async fn test_load_all_skips_corrupt_files() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("1.json"), r#"{"profile": {"display_name": "A"}}"#).unwrap();
    std::fs::write(dir.path().join("2.json"), "{ not json").unwrap();
    std::fs::write(dir.path().join("3.json"), r#"{"user_data": {"user_name": "C"}}"#).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let store = store_in(&dir);
    let loaded = store.load_all().await.unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(store.user_ids(), vec!["1".to_string(), "3".to_string()]);
    assert_eq!(store.get("3").unwrap().profile.display_name.as_deref(), Some("C"));
    assert!(store.tracked_mtime("2").is_none());
}

#[tokio::test]
async fn test_legacy_writer_shapes_load() {
    let dir = tempfile::TempDir::new().unwrap();
    // Dashboard first visit: null join stamp.
    std::fs::write(
        dir.path().join("2001.json"),
        r#"{"user_data": {"activated": false, "state": "waiting_language", "language": "ar",
            "age": null, "bot_name": "Sienna", "user_name": null, "sex_mode": false,
            "notifications": false, "custom_presets": [], "joined_at": null},
            "user_progress": {"level": 1, "xp": 0, "messages": 0},
            "user_reminders": [], "user_conversation_history": []}"#,
    )
    .unwrap();
    // Older bot save: reminders stored as an empty object.
    std::fs::write(
        dir.path().join("2002.json"),
        r#"{"user_data": {"activated": true, "state": "normal", "language": "en", "user_name": "Kai"},
            "user_progress": {"level": 2, "xp": 5, "messages": 30},
            "user_reminders": {},
            "user_conversation_history": [{"role": "user", "content": "yo", "time": "2025-02-01T09:00:00"}]}"#,
    )
    .unwrap();

    let store = store_in(&dir);
    assert_eq!(store.load_all().await.unwrap(), 2);
    assert!(store.get("2002").unwrap().reminders.is_empty());
    assert_eq!(store.get("2002").unwrap().progress.level, 2);

    let reopened = store_in(&dir);
    let first = reopened.load_one("2001").await.expect("dashboard file must load");
    assert!(first.profile.display_name.is_none());
    assert_eq!(first.profile.extra.get("notifications"), Some(&serde_json::json!(false)));
}

#[tokio::test]
async fn test_load_all_creates_missing_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let nested = dir.path().join("users_data");
    let store = UserRecordStore::new(&nested, "Sienna");
    assert_eq!(store.load_all().await.unwrap(), 0);
    assert!(nested.is_dir());
}

#[tokio::test]
async fn test_load_one_reports_corrupt_file() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("9.json"), "{\"profile\": ").unwrap();
    let store = store_in(&dir);
    let err = store.load_one("9").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
    // The broken file is left for a human to inspect.
    assert!(dir.path().join("9.json").exists());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    store.load_one("1001").await.unwrap();

    store.delete("1001").await.unwrap();
    assert!(!store.contains("1001"));
    assert!(!dir.path().join("1001.json").exists());
    assert!(store.tracked_mtime("1001").is_none());

    store.delete("1001").await.expect("second delete must not fail");
}

#[tokio::test]
async fn test_save_unknown_user_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    let err = store.save_one("404").await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownUser(_)));
}

#[tokio::test]
async fn test_rejects_path_like_user_ids() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    for bad in ["../etc/passwd", "", "a/b", "x.json"] {
        let err = store.load_one(bad).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidUserId(_)), "{bad} accepted");
    }
}

#[tokio::test]
async fn test_save_all_writes_every_record() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    store.insert("1", store.fresh_record());
    store.insert("2", store.fresh_record());
    assert_eq!(store.save_all().await, 2);
    assert!(dir.path().join("1.json").exists());
    assert!(dir.path().join("2.json").exists());
}

#[tokio::test]
async fn test_save_leaves_no_temp_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    store.load_one("1001").await.unwrap();
    for _ in 0..5 {
        store.save_one("1001").await.unwrap();
    }
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["1001.json".to_string()]);
}

#[test]
fn test_user_id_from_path() {
    assert_eq!(user_id_from_path(Path::new("/d/123.json")), Some("123".to_string()));
    assert_eq!(user_id_from_path(Path::new("/d/.123.json.0.tmp")), None);
    assert_eq!(user_id_from_path(Path::new("/d/123.txt")), None);
}
