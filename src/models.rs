// Data models for taskpad

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do item
///
/// Timestamps are epoch milliseconds. The persisted form uses camelCase
/// keys for them (`createdAt`, `updatedAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Create a task with a fresh id and both timestamps set to now.
    ///
    /// The title is stored as given; trimming and duplicate checks are the
    /// store's responsibility.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_task_id(),
            title: title.into(),
            completed: false,
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Which subset of tasks the derived view shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

/// Ordering applied to the derived view; never touches stored order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSort {
    #[default]
    Newest,
    Oldest,
    Alpha,
    AlphaDesc,
}

/// Generate an opaque task id (UUID v7, time-ordered)
pub fn new_task_id() -> String {
    Uuid::now_v7().to_string()
}

/// Current timestamp in milliseconds
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before Unix epoch")
        .as_millis() as i64
}
