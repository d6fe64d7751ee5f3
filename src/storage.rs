// Storage port and backends

use crate::models::{Task, now_ms};
use eyre::{Context, Result};
use fs2::FileExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Storage key for the serialized task collection
pub const TASKS_KEY: &str = "tasks";
/// Storage key for the filter preference
pub const FILTER_KEY: &str = "tasks_filter";
/// Storage key for the sort preference
pub const SORT_KEY: &str = "tasks_sort";

/// Durable key/value storage the store persists through
///
/// `get` treats any read problem as absence; `set` surfaces write failures
/// so the caller can decide what to do with them (the store logs and keeps
/// going).
pub trait StoragePort {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// File-backed storage: one `<key>.json` file per key under a directory
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open or create file storage at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create storage directory")?;
        Ok(Self { base_path })
    }

    /// Default per-user data directory
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskpad")
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl StoragePort for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        // Exclusive lock for the duration of the write. The lock file keeps
        // the lock valid across the rename below.
        let lock_path = self.base_path.join(".lock");
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .context("Failed to open lock file")?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        // Write to a temp file, then rename over the target.
        let target = self.key_path(key);
        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, value).context("Failed to write temp file")?;
        fs::rename(&tmp, &target).context("Failed to replace storage file")?;

        // Lock is released when `lock` is dropped
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Decode a persisted task collection, tolerating bad data
///
/// A payload that is not a JSON array yields an empty collection. Entries
/// missing a string `id` or `title` are dropped. Missing optional fields
/// take defaults; malformed timestamps are replaced with now rather than
/// rejected.
pub fn decode_tasks(payload: &str) -> Vec<Task> {
    let parsed: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = ?e, "Failed to parse stored tasks, starting empty");
            return Vec::new();
        }
    };

    let Value::Array(entries) = parsed else {
        warn!("Stored tasks payload is not an array, starting empty");
        return Vec::new();
    };

    let mut tasks = Vec::new();
    for entry in entries {
        let Some(id) = entry.get("id").and_then(Value::as_str) else {
            warn!("Dropping stored entry without a string id");
            continue;
        };
        let Some(title) = entry.get("title").and_then(Value::as_str) else {
            warn!(id, "Dropping stored entry without a string title");
            continue;
        };

        let now = now_ms();
        tasks.push(Task {
            id: id.to_string(),
            title: title.to_string(),
            completed: entry.get("completed").and_then(Value::as_bool).unwrap_or(false),
            description: entry
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            created_at: entry.get("createdAt").and_then(Value::as_i64).unwrap_or(now),
            updated_at: entry.get("updatedAt").and_then(Value::as_i64).unwrap_or(now),
        });
    }

    tasks
}
