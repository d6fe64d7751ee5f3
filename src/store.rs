// Task store: authoritative task state over an injected storage port

use crate::models::{Task, TaskFilter, TaskSort, now_ms};
use crate::storage::{FILTER_KEY, SORT_KEY, StoragePort, TASKS_KEY, decode_tasks};
use crate::view;
use tracing::{debug, warn};

/// Owns the task collection and the filter/sort preferences.
///
/// Storage order is insertion order, newest first; sorting only ever
/// happens on the derived view. Every mutating operation ends with an
/// explicit persistence call; write failures are logged and swallowed, so
/// the in-memory state stays authoritative for the session.
pub struct TaskStore<P: StoragePort> {
    tasks: Vec<Task>,
    filter: TaskFilter,
    sort: TaskSort,
    port: P,
}

impl<P: StoragePort> TaskStore<P> {
    /// Load tasks and preferences from the port.
    ///
    /// A missing or unparseable task payload yields an empty collection;
    /// missing or invalid preferences fall back to their defaults.
    pub fn open(port: P) -> Self {
        let tasks = port
            .get(TASKS_KEY)
            .map(|payload| decode_tasks(&payload))
            .unwrap_or_default();
        let filter = port
            .get(FILTER_KEY)
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let sort = port
            .get(SORT_KEY)
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        debug!(count = tasks.len(), ?filter, ?sort, "Opened task store");
        Self {
            tasks,
            filter,
            sort,
            port,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task to the front of the collection.
    ///
    /// The title is trimmed; an empty result or a case-insensitive match
    /// against an existing title rejects the add with no mutation.
    pub fn add(&mut self, title: &str, description: Option<&str>) -> bool {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return false;
        }

        let lowered = trimmed.to_lowercase();
        if self.tasks.iter().any(|t| t.title.to_lowercase() == lowered) {
            debug!(title = trimmed, "Rejected duplicate title");
            return false;
        }

        let task = Task::new(trimmed, description.unwrap_or(""));
        debug!(id = %task.id, title = %task.title, "Added task");
        self.tasks.insert(0, task);
        self.persist_tasks();
        true
    }

    /// Flip completion for the matching task; silent no-op on unknown id.
    pub fn toggle(&mut self, id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = !task.completed;
            task.updated_at = now_ms();
        }
        self.persist_tasks();
    }

    /// Remove the matching task; silent no-op on unknown id.
    pub fn delete(&mut self, id: &str) {
        self.tasks.retain(|t| t.id != id);
        self.persist_tasks();
    }

    /// Rename the matching task.
    ///
    /// The new title is trimmed; an empty result rejects the rename.
    /// Uniqueness is not re-checked here, only on add, so duplicate titles
    /// can exist after a rename.
    pub fn rename(&mut self, id: &str, new_title: &str) -> bool {
        let trimmed = new_title.trim();
        if trimmed.is_empty() {
            return false;
        }

        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.title = trimmed.to_string();
            task.updated_at = now_ms();
        }
        self.persist_tasks();
        true
    }

    /// Overwrite the description (empty allowed); no failure path.
    pub fn set_description(&mut self, id: &str, description: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.description = description.to_string();
            task.updated_at = now_ms();
        }
        self.persist_tasks();
    }

    /// Remove every completed task, keeping the rest in order.
    pub fn clear_completed(&mut self) {
        self.tasks.retain(|t| !t.completed);
        self.persist_tasks();
    }

    /// Update the filter preference and persist it immediately.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
        self.persist_pref(FILTER_KEY, &filter);
    }

    /// Update the sort preference and persist it immediately.
    pub fn set_sort(&mut self, sort: TaskSort) {
        self.sort = sort;
        self.persist_pref(SORT_KEY, &sort);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The derived view: filtered and sorted per the current preferences,
    /// recomputed on every call.
    pub fn visible(&self) -> Vec<Task> {
        view::apply(&self.tasks, self.filter, self.sort)
    }

    /// Raw stored collection in canonical order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn sort(&self) -> TaskSort {
        self.sort
    }

    /// Number of stored tasks, independent of the active filter.
    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of stored completed tasks, independent of the active filter.
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    fn persist_tasks(&mut self) {
        let payload = match serde_json::to_string(&self.tasks) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = ?e, "Failed to serialize tasks, skipping write");
                return;
            }
        };
        if let Err(e) = self.port.set(TASKS_KEY, &payload) {
            warn!(error = ?e, "Failed to persist tasks, continuing in memory");
        }
    }

    fn persist_pref<T: serde::Serialize + std::fmt::Debug>(&mut self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!(key, error = ?e, "Failed to serialize preference, skipping write");
                return;
            }
        };
        if let Err(e) = self.port.set(key, &payload) {
            warn!(key, ?value, error = ?e, "Failed to persist preference, continuing in memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use eyre::eyre;
    use tempfile::TempDir;

    fn store() -> TaskStore<MemoryStorage> {
        TaskStore::open(MemoryStorage::new())
    }

    #[test]
    fn test_add_prepends_with_fresh_timestamps() {
        let mut store = store();

        assert!(store.add("Write report", None));
        assert!(store.add("Send invoice", Some("with the Q3 numbers")));

        let tasks = store.tasks();
        assert_eq!(tasks.len(), 2);
        // Newest physical entry leads the collection
        assert_eq!(tasks[0].title, "Send invoice");
        assert_eq!(tasks[0].description, "with the Q3 numbers");
        assert_eq!(tasks[1].title, "Write report");

        for task in tasks {
            assert!(!task.completed);
            assert_eq!(task.created_at, task.updated_at);
        }
    }

    #[test]
    fn test_add_trims_title() {
        let mut store = store();
        assert!(store.add("  Buy milk  ", None));
        assert_eq!(store.tasks()[0].title, "Buy milk");
    }

    #[test]
    fn test_add_rejects_empty_and_whitespace() {
        let mut store = store();
        assert!(!store.add("", None));
        assert!(!store.add("   ", None));
        assert_eq!(store.total_count(), 0);
    }

    #[test]
    fn test_add_rejects_case_insensitive_duplicate() {
        let mut store = store();
        assert!(store.add("Buy milk", None));
        assert!(!store.add("BUY MILK", None));
        assert!(!store.add("  buy milk ", None));
        assert_eq!(store.total_count(), 1);
    }

    #[test]
    fn test_toggle_flips_and_restores() {
        let mut store = store();
        store.add("Task", None);
        let id = store.tasks()[0].id.clone();

        store.toggle(&id);
        assert!(store.tasks()[0].completed);
        assert!(store.tasks()[0].updated_at >= store.tasks()[0].created_at);

        store.toggle(&id);
        assert!(!store.tasks()[0].completed);
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let mut store = store();
        store.add("Task", None);
        store.toggle("no-such-id");
        assert!(!store.tasks()[0].completed);
        assert_eq!(store.total_count(), 1);
    }

    #[test]
    fn test_delete_removes_only_matching() {
        let mut store = store();
        store.add("Keep", None);
        store.add("Drop", None);
        let drop_id = store.tasks()[0].id.clone();

        store.delete(&drop_id);
        assert_eq!(store.total_count(), 1);
        assert_eq!(store.tasks()[0].title, "Keep");

        // Unknown id is a no-op
        store.delete("no-such-id");
        assert_eq!(store.total_count(), 1);
    }

    #[test]
    fn test_rename_trims_and_rejects_empty() {
        let mut store = store();
        store.add("Old name", None);
        let id = store.tasks()[0].id.clone();

        assert!(!store.rename(&id, ""));
        assert!(!store.rename(&id, "   "));
        assert_eq!(store.tasks()[0].title, "Old name");

        assert!(store.rename(&id, "  New  "));
        assert_eq!(store.tasks()[0].title, "New");
    }

    #[test]
    fn test_rename_allows_duplicate_titles() {
        // Uniqueness is only enforced on add
        let mut store = store();
        store.add("First", None);
        store.add("Second", None);
        let id = store.tasks()[0].id.clone();

        assert!(store.rename(&id, "first"));
        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "First"]);
    }

    #[test]
    fn test_mutations_refresh_updated_at() {
        // Seed through the port with timestamps far in the past so a
        // refreshed updated_at is strictly newer.
        let mut storage = MemoryStorage::new();
        storage
            .set(
                TASKS_KEY,
                r#"[{"id":"t-1","title":"Old","completed":false,"description":"","createdAt":1000,"updatedAt":1000}]"#,
            )
            .unwrap();
        let mut store = TaskStore::open(storage);
        assert_eq!(store.tasks()[0].updated_at, 1000);

        store.toggle("t-1");
        let after_toggle = store.tasks()[0].updated_at;
        assert!(after_toggle > 1000);

        assert!(store.rename("t-1", "New"));
        let after_rename = store.tasks()[0].updated_at;
        assert!(after_rename >= after_toggle);
        assert!(after_rename > 1000);

        store.set_description("t-1", "notes");
        assert!(store.tasks()[0].updated_at > 1000);

        // created_at never moves
        assert_eq!(store.tasks()[0].created_at, 1000);
    }

    #[test]
    fn test_set_description_overwrites_unconditionally() {
        let mut store = store();
        store.add("Task", Some("initial"));
        let id = store.tasks()[0].id.clone();

        store.set_description(&id, "revised");
        assert_eq!(store.tasks()[0].description, "revised");

        store.set_description(&id, "");
        assert_eq!(store.tasks()[0].description, "");
    }

    #[test]
    fn test_clear_completed_preserves_active_order() {
        let mut store = store();
        store.add("a", None);
        store.add("b", None);
        store.add("c", None);
        store.add("d", None);
        // Storage order is now d, c, b, a; complete c and a
        let c_id = store.tasks()[1].id.clone();
        let a_id = store.tasks()[3].id.clone();
        store.toggle(&c_id);
        store.toggle(&a_id);

        store.clear_completed();
        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["d", "b"]);
    }

    #[test]
    fn test_clear_completed_with_none_completed_is_noop() {
        let mut store = store();
        store.add("a", None);
        store.clear_completed();
        assert_eq!(store.total_count(), 1);
    }

    #[test]
    fn test_counts_ignore_active_filter() {
        let mut store = store();
        store.add("a", None);
        store.add("b", None);
        store.add("c", None);
        let id = store.tasks()[0].id.clone();
        store.toggle(&id);

        store.set_filter(TaskFilter::Completed);
        assert_eq!(store.total_count(), 3);
        assert_eq!(store.completed_count(), 1);
        assert_eq!(store.visible().len(), 1);

        store.set_filter(TaskFilter::Active);
        assert_eq!(store.total_count(), 3);
        assert_eq!(store.completed_count(), 1);
        assert_eq!(store.visible().len(), 2);
    }

    #[test]
    fn test_visible_does_not_disturb_storage_order() {
        let mut store = store();
        store.add("apple", None);
        store.add("zebra", None);
        store.set_sort(TaskSort::Alpha);

        let view: Vec<String> = store.visible().into_iter().map(|t| t.title).collect();
        assert_eq!(view, vec!["apple", "zebra"]);

        // Stored order stays newest-first insertion order
        let stored: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(stored, vec!["zebra", "apple"]);
    }

    #[test]
    fn test_preferences_persist_independently() {
        let temp = TempDir::new().unwrap();
        {
            let storage = FileStorage::open(temp.path()).unwrap();
            let mut store = TaskStore::open(storage);
            store.set_filter(TaskFilter::Active);
            store.set_sort(TaskSort::AlphaDesc);
        }

        let storage = FileStorage::open(temp.path()).unwrap();
        let store = TaskStore::open(storage);
        assert_eq!(store.filter(), TaskFilter::Active);
        assert_eq!(store.sort(), TaskSort::AlphaDesc);
        assert_eq!(store.total_count(), 0);
    }

    #[test]
    fn test_invalid_stored_preferences_fall_back_to_defaults() {
        let mut storage = MemoryStorage::new();
        storage.set(FILTER_KEY, "\"sideways\"").unwrap();
        storage.set(SORT_KEY, "not even json").unwrap();

        let store = TaskStore::open(storage);
        assert_eq!(store.filter(), TaskFilter::All);
        assert_eq!(store.sort(), TaskSort::Newest);
    }

    #[test]
    fn test_persistence_roundtrip_preserves_tasks() {
        let temp = TempDir::new().unwrap();
        let (ids, titles) = {
            let storage = FileStorage::open(temp.path()).unwrap();
            let mut store = TaskStore::open(storage);
            store.add("Write report", Some("due Friday"));
            store.add("Send invoice", None);
            let id = store.tasks()[1].id.clone();
            store.toggle(&id);

            let ids: Vec<String> = store.tasks().iter().map(|t| t.id.clone()).collect();
            let titles: Vec<String> = store.tasks().iter().map(|t| t.title.clone()).collect();
            (ids, titles)
        };

        let storage = FileStorage::open(temp.path()).unwrap();
        let store = TaskStore::open(storage);
        assert_eq!(store.total_count(), 2);
        assert_eq!(store.completed_count(), 1);

        let reloaded_ids: Vec<String> = store.tasks().iter().map(|t| t.id.clone()).collect();
        let reloaded_titles: Vec<String> = store.tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(reloaded_ids, ids);
        assert_eq!(reloaded_titles, titles);
        assert_eq!(store.tasks()[1].description, "due Friday");
    }

    /// Port that accepts reads but fails every write.
    struct BrokenStorage;

    impl StoragePort for BrokenStorage {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> eyre::Result<()> {
            Err(eyre!("storage unavailable"))
        }
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        let mut store = TaskStore::open(BrokenStorage);

        // Mutations still report success and take effect in memory
        assert!(store.add("Survives", None));
        assert_eq!(store.total_count(), 1);

        let id = store.tasks()[0].id.clone();
        store.toggle(&id);
        assert!(store.tasks()[0].completed);

        store.set_filter(TaskFilter::Completed);
        assert_eq!(store.filter(), TaskFilter::Completed);
    }

    #[test]
    fn test_full_scenario() {
        let mut store = store();

        assert!(store.add("Write report", None));
        assert!(!store.add("write report", None));
        assert!(store.add("Send invoice", None));
        assert_eq!(store.total_count(), 2);

        let report_id = store
            .tasks()
            .iter()
            .find(|t| t.title == "Write report")
            .unwrap()
            .id
            .clone();
        store.toggle(&report_id);
        assert_eq!(store.completed_count(), 1);

        store.set_filter(TaskFilter::Completed);
        let view = store.visible();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, report_id);

        store.clear_completed();
        assert_eq!(store.total_count(), 1);
        assert_eq!(store.tasks()[0].title, "Send invoice");
    }
}
