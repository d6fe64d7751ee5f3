// taskpad - single-user task list with pluggable local persistence

pub mod models;
pub mod storage;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use models::{Task, TaskFilter, TaskSort, new_task_id, now_ms};
pub use storage::{FILTER_KEY, FileStorage, MemoryStorage, SORT_KEY, StoragePort, TASKS_KEY};
pub use store::TaskStore;
