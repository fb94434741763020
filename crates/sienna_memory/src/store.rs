use serde::Serialize;
use sienna_core::{timefmt, UserRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid user id {0:?}")]
    InvalidUserId(String),
    #[error("no record loaded for user {0}")]
    UnknownUser(String),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt record file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// On-disk envelope: the record's blocks plus a `last_save` stamp.
#[derive(Serialize)]
struct RecordFile<'a> {
    #[serde(flatten)]
    record: &'a UserRecord,
    last_save: String,
}

/// File-backed table of user records, one `<user_id>.json` per user.
///
/// The in-memory table is authoritative for the bot; the files are the
/// synchronization boundary with the dashboard. Locks are never held across
/// an await: mutations happen under the lock, I/O happens on a snapshot.
///
/// Known limitation: a dashboard edit that is on disk but not yet reloaded
/// when a save runs is overwritten by that save. Re-stamping the tracked
/// mtime after each save only prevents the bot from re-detecting its own
/// writes.
pub struct UserRecordStore {
    dir: PathBuf,
    default_companion: String,
    records: RwLock<HashMap<String, UserRecord>>,
    mtimes: Mutex<HashMap<String, SystemTime>>,
    write_seq: AtomicU64,
}

impl UserRecordStore {
    pub fn new<P: AsRef<Path>>(dir: P, default_companion: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            default_companion: default_companion.to_string(),
            records: RwLock::new(HashMap::new()),
            mtimes: Mutex::new(HashMap::new()),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{user_id}.json")))
    }

    /// A default record for a user seen for the first time.
    pub fn fresh_record(&self) -> UserRecord {
        UserRecord::fresh(&self.default_companion)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load every `<user_id>.json` in the data directory into memory.
    ///
    /// A corrupt or unreadable file is logged and skipped; it does not stop
    /// the rest of the load. Returns the number of records loaded.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let mut count = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Stopped listing {}: {}", self.dir.display(), e);
                    break;
                }
            };
            let path = entry.path();
            let Some(user_id) = user_id_from_path(&path) else {
                continue;
            };
            match read_record_file(&path).await {
                Ok((record, mtime)) => {
                    self.write_records().insert(user_id.clone(), record);
                    self.lock_mtimes().insert(user_id, mtime);
                    count += 1;
                }
                Err(e) => tracing::warn!("Skipping record for {}: {}", user_id, e),
            }
        }

        tracing::info!("Loaded {} user records from {}", count, self.dir.display());
        Ok(count)
    }

    /// Return the user's record, reading its file on a cache miss.
    ///
    /// A user with no file gets a fresh default record, which is persisted
    /// immediately.
    pub async fn load_one(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        if let Some(record) = self.cached_or_file(user_id).await? {
            return Ok(record);
        }
        let record = self
            .write_records()
            .entry(user_id.to_string())
            .or_insert_with(|| self.fresh_record())
            .clone();
        tracing::info!("Initialized new record for user {}", user_id);
        self.save_one(user_id).await?;
        Ok(record)
    }

    /// Like [`load_one`](Self::load_one) but never creates anything: a user
    /// with neither an in-memory record nor a file is `UnknownUser`.
    pub async fn load_existing(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        self.cached_or_file(user_id)
            .await?
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))
    }

    async fn cached_or_file(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        if let Some(record) = self.get(user_id) {
            return Ok(Some(record));
        }

        let path = self.path_for(user_id)?;
        match read_record_file(&path).await {
            Ok((record, mtime)) => {
                let record = self
                    .write_records()
                    .entry(user_id.to_string())
                    .or_insert(record)
                    .clone();
                self.lock_mtimes().entry(user_id.to_string()).or_insert(mtime);
                Ok(Some(record))
            }
            Err(StoreError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Re-read a user's file after an out-of-band write and replace the
    /// in-memory record. `observed` is the mtime seen before reading; it only
    /// becomes the tracked value when the read succeeds.
    pub async fn reload(&self, user_id: &str, observed: SystemTime) -> Result<UserRecord, StoreError> {
        let path = self.path_for(user_id)?;
        let (record, _) = read_record_file(&path).await?;
        self.write_records()
            .insert(user_id.to_string(), record.clone());
        self.lock_mtimes().insert(user_id.to_string(), observed);
        Ok(record)
    }

    // ------------------------------------------------------------------
    // In-memory access
    // ------------------------------------------------------------------

    pub fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.read_records().get(user_id).cloned()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.read_records().contains_key(user_id)
    }

    /// Mutate the in-memory record in place. Returns `None` if the user is
    /// not loaded.
    pub fn update<R>(&self, user_id: &str, f: impl FnOnce(&mut UserRecord) -> R) -> Option<R> {
        self.write_records().get_mut(user_id).map(f)
    }

    pub fn insert(&self, user_id: &str, record: UserRecord) {
        self.write_records().insert(user_id.to_string(), record);
    }

    /// All loaded user ids, sorted.
    pub fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read_records().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Clone of every loaded record, sorted by user id.
    pub fn snapshot(&self) -> Vec<(String, UserRecord)> {
        let mut all: Vec<(String, UserRecord)> = self
            .read_records()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn tracked_mtime(&self, user_id: &str) -> Option<SystemTime> {
        self.lock_mtimes().get(user_id).copied()
    }

    /// Remember a file's mtime without reloading it.
    pub fn track_baseline(&self, user_id: &str, mtime: SystemTime) {
        self.lock_mtimes().insert(user_id.to_string(), mtime);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write one user's in-memory record to its file, then track the file's
    /// post-write mtime so the synchronizer does not treat it as external.
    pub async fn save_one(&self, user_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(user_id)?;
        let record = self
            .get(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;

        let body = serde_json::to_vec_pretty(&RecordFile {
            record: &record,
            last_save: timefmt::format(&timefmt::now_local()),
        })
        .map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            source: e,
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(".{user_id}.json.{seq}.tmp"));
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(&path, e));
        }

        let mtime = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| StoreError::io(&path, e))?;
        self.lock_mtimes().insert(user_id.to_string(), mtime);

        tracing::debug!("Saved record for user {}", user_id);
        Ok(())
    }

    /// Persist every loaded record. Failures are logged and counted, never
    /// fatal. Returns the number of records written.
    pub async fn save_all(&self) -> usize {
        let mut saved = 0;
        for user_id in self.user_ids() {
            match self.save_one(&user_id).await {
                Ok(()) => saved += 1,
                Err(e) => tracing::error!("Failed to save record for {}: {}", user_id, e),
            }
        }
        saved
    }

    /// Drop the user's in-memory record and delete its file. Idempotent.
    pub async fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(user_id)?;
        self.write_records().remove(user_id);
        self.lock_mtimes().remove(user_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted record for user {}", user_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    // ------------------------------------------------------------------
    // Lock helpers
    // ------------------------------------------------------------------

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, UserRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_records(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, UserRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_mtimes(&self) -> std::sync::MutexGuard<'_, HashMap<String, SystemTime>> {
        self.mtimes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read and parse one record file. The mtime is taken before the content so
/// a write racing the read is seen again on the next poll.
pub async fn read_record_file(path: &Path) -> Result<(UserRecord, SystemTime), StoreError> {
    let mtime = tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map_err(|e| StoreError::io(path, e))?;
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    let mut record: UserRecord = serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;
    record.normalize();
    Ok((record, mtime))
}

/// `<dir>/<user_id>.json` → `user_id`. Temp files and foreign names yield `None`.
pub fn user_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let user_id = name.strip_suffix(".json")?;
    validate_user_id(user_id).ok()?;
    Some(user_id.to_string())
}

fn validate_user_id(user_id: &str) -> Result<(), StoreError> {
    let ok = !user_id.is_empty()
        && user_id.len() <= 64
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidUserId(user_id.to_string()))
    }
}
