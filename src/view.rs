// Derived view: filter + sort as a stateless query

use crate::models::{Task, TaskFilter, TaskSort};
use std::cmp::Ordering;

/// Compute the display projection of a task collection.
///
/// Returns a fresh, filtered, sorted copy; the input order is never
/// touched. Pure function of its arguments, so callers may recompute on
/// every read.
pub fn apply(tasks: &[Task], filter: TaskFilter, sort: TaskSort) -> Vec<Task> {
    let mut view: Vec<Task> = tasks
        .iter()
        .filter(|t| match filter {
            TaskFilter::All => true,
            TaskFilter::Active => !t.completed,
            TaskFilter::Completed => t.completed,
        })
        .cloned()
        .collect();

    // sort_by is stable, so ties keep storage order
    match sort {
        TaskSort::Newest => view.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        TaskSort::Oldest => view.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        TaskSort::Alpha => view.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        TaskSort::AlphaDesc => view.sort_by(|a, b| compare_titles(&b.title, &a.title)),
    }

    view
}

/// Case-aware title ordering: case-insensitive first, raw comparison as
/// tiebreak, so "apple" sorts before "Banana".
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
