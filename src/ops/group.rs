use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::model::task::{Priority, Task, TaskStatus};
use crate::model::view::GroupStrategy;

/// A labeled group of tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<'a> {
    /// Stable key, used to remember expansion across refreshes
    pub key: String,
    pub label: String,
    pub members: Vec<&'a Task>,
    rank: usize,
}

/// Key of the bucket a task falls into when grouping by due date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    ThisMonth,
    Later,
    NoDueDate,
}

impl DueBucket {
    pub const ORDER: [DueBucket; 7] = [
        DueBucket::Overdue,
        DueBucket::Today,
        DueBucket::Tomorrow,
        DueBucket::ThisWeek,
        DueBucket::ThisMonth,
        DueBucket::Later,
        DueBucket::NoDueDate,
    ];

    /// Classify by whole days between the due date and `today`
    pub fn of(task: &Task, today: NaiveDate) -> DueBucket {
        match task.days_until_due(today) {
            None => DueBucket::NoDueDate,
            Some(d) if d < 0 => DueBucket::Overdue,
            Some(0) => DueBucket::Today,
            Some(1) => DueBucket::Tomorrow,
            Some(d) if d <= 7 => DueBucket::ThisWeek,
            Some(d) if d <= 30 => DueBucket::ThisMonth,
            Some(_) => DueBucket::Later,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            DueBucket::Overdue => "overdue",
            DueBucket::Today => "today",
            DueBucket::Tomorrow => "tomorrow",
            DueBucket::ThisWeek => "this-week",
            DueBucket::ThisMonth => "this-month",
            DueBucket::Later => "later",
            DueBucket::NoDueDate => "no-due-date",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DueBucket::Overdue => "Overdue",
            DueBucket::Today => "Today",
            DueBucket::Tomorrow => "Tomorrow",
            DueBucket::ThisWeek => "This week",
            DueBucket::ThisMonth => "This month",
            DueBucket::Later => "Later",
            DueBucket::NoDueDate => "No due date",
        }
    }

    fn rank(self) -> usize {
        DueBucket::ORDER
            .iter()
            .position(|b| *b == self)
            .unwrap_or(DueBucket::ORDER.len())
    }
}

pub const UNKNOWN_KEY: &str = "unknown";
pub const NO_PROJECT_KEY: &str = "no-project";
/// Project bucket keys are this prefix plus the project id (or its name
/// when the listing carried no id)
pub const PROJECT_KEY_PREFIX: &str = "project:";
pub const NO_TAGS_KEY: &str = "no-tags";

pub fn status_key(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in-progress",
        TaskStatus::Completed => "completed",
    }
}

pub fn priority_key(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

/// Bucket placement of one task: (rank, key, label).
///
/// Strategies with a natural order rank by it; Project and Tag rank every
/// named bucket equally (then by label) and put the fallback bucket last.
fn place(task: &Task, strategy: GroupStrategy, today: NaiveDate) -> (usize, String, String) {
    match strategy {
        GroupStrategy::None => (0, "all".into(), "All tasks".into()),
        GroupStrategy::ByStatus => match task.status {
            Some(s) => (s.rank(), status_key(s).into(), s.label().into()),
            None => (TaskStatus::ORDER.len(), UNKNOWN_KEY.into(), "Unknown".into()),
        },
        GroupStrategy::ByPriority => match task.priority {
            Some(p) => (p.rank(), priority_key(p).into(), p.label().into()),
            None => (Priority::ORDER.len(), UNKNOWN_KEY.into(), "Unknown".into()),
        },
        GroupStrategy::ByProject => {
            fn non_blank(v: &Option<String>) -> Option<&str> {
                v.as_deref().filter(|n| !n.trim().is_empty())
            }
            let id = non_blank(&task.project_id);
            match non_blank(&task.project_name).or(id) {
                Some(label) => (
                    0,
                    format!("{PROJECT_KEY_PREFIX}{}", id.unwrap_or(label)),
                    label.to_string(),
                ),
                None => (1, NO_PROJECT_KEY.into(), "No project".into()),
            }
        }
        GroupStrategy::ByTag => match task.first_tag() {
            Some(tag) => (0, format!("tag:{tag}"), format!("#{tag}")),
            None => (1, NO_TAGS_KEY.into(), "No tags".into()),
        },
        GroupStrategy::ByDueDate => {
            let bucket = DueBucket::of(task, today);
            (bucket.rank(), bucket.key().into(), bucket.label().into())
        }
    }
}

/// Partition `tasks` into buckets.
///
/// Members keep their input order. Buckets come out in the strategy's fixed
/// order: Status Pending, InProgress, Completed, unknown; Priority High,
/// Medium, Low, unknown; due date from overdue to no due date. Project and
/// Tag buckets are alphabetical by label with the fallback bucket last.
pub fn group<'a>(tasks: &[&'a Task], strategy: GroupStrategy, today: NaiveDate) -> Vec<Bucket<'a>> {
    let mut buckets: IndexMap<String, Bucket<'a>> = IndexMap::new();
    for &task in tasks {
        let (rank, key, label) = place(task, strategy, today);
        buckets
            .entry(key.clone())
            .or_insert_with(|| Bucket {
                key,
                label,
                members: Vec::new(),
                rank,
            })
            .members
            .push(task);
    }

    let mut out: Vec<Bucket<'a>> = buckets.into_values().collect();
    out.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
    });
    out
}

/// Whether a bucket starts expanded before the user toggles it
pub fn expanded_by_default(strategy: GroupStrategy, key: &str) -> bool {
    match strategy {
        GroupStrategy::ByStatus => {
            key == status_key(TaskStatus::Pending) || key == status_key(TaskStatus::InProgress)
        }
        GroupStrategy::ByPriority => {
            key == priority_key(Priority::High) || key == priority_key(Priority::Medium)
        }
        GroupStrategy::ByDueDate => [DueBucket::Overdue, DueBucket::Today, DueBucket::ThisWeek]
            .iter()
            .any(|b| b.key() == key),
        GroupStrategy::None | GroupStrategy::ByProject | GroupStrategy::ByTag => true,
    }
}
