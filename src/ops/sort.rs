use std::cmp::Ordering;

use crate::model::task::{Priority, Task, TaskStatus};
use crate::model::view::{SortField, SortSpec};

/// Order of two tasks on `field` alone, ascending. Missing values and
/// unrecognised status or priority sort after every present value.
fn compare_field(a: &Task, b: &Task, field: SortField) -> Ordering {
    fn missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
        match (a, b) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Priority => missing_last(a.priority.map(Priority::rank), b.priority.map(Priority::rank)),
        SortField::Status => missing_last(a.status.map(TaskStatus::rank), b.status.map(TaskStatus::rank)),
        SortField::DueDate => missing_last(a.due_date, b.due_date),
        SortField::CreatedDate => missing_last(a.created, b.created),
    }
}

/// Full comparator: field, then id, reversed as a whole when descending
pub fn compare(a: &Task, b: &Task, spec: SortSpec) -> Ordering {
    let ord = compare_field(a, b, spec.field).then_with(|| a.id.cmp(&b.id));
    if spec.ascending { ord } else { ord.reverse() }
}

/// Sort in place. Priority and status use the same semantic order as
/// grouping, so High sorts before Low when ascending.
pub fn sort_tasks(tasks: &mut [&Task], spec: SortSpec) {
    tasks.sort_by(|a, b| compare(a, b, spec));
}

/// Sort a list of task ids, resolving each through `lookup`.
/// Ids that do not resolve keep their relative order at the end.
pub fn sort_ids<'a, F>(ids: &mut [String], spec: SortSpec, lookup: F)
where
    F: Fn(&str) -> Option<&'a Task>,
{
    ids.sort_by(|a, b| match (lookup(a), lookup(b)) {
        (Some(x), Some(y)) => compare(x, y, spec),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
