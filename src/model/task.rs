use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Task status as reported by the task store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Fixed semantic order shared by grouping and sorting
    pub const ORDER: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// Parse a status token: emoji icon, Turkish or English keyword.
    /// Unrecognised tokens yield `None`.
    pub fn from_token(token: &str) -> Option<TaskStatus> {
        match token.trim() {
            "⏳" | "○" => return Some(TaskStatus::Pending),
            "🚀" | "🔄" | "⚡" => return Some(TaskStatus::InProgress),
            "✅" | "✓" => return Some(TaskStatus::Completed),
            _ => {}
        }
        let normalized = token.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "beklemede" | "bekleyen" | "pending" => Some(TaskStatus::Pending),
            "devam_ediyor" | "devam" | "in_progress" => Some(TaskStatus::InProgress),
            "tamamlandi" | "tamamlandı" | "completed" | "done" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    /// Wire value sent to the task store
    pub fn wire_value(self) -> &'static str {
        match self {
            TaskStatus::Pending => "beklemede",
            TaskStatus::InProgress => "devam_ediyor",
            TaskStatus::Completed => "tamamlandi",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Position in [`TaskStatus::ORDER`]
    pub fn rank(self) -> usize {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Completed => 2,
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Fixed semantic order shared by grouping and sorting (most urgent first)
    pub const ORDER: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Parse a priority token: Turkish/English word or the single compact letter.
    pub fn from_token(token: &str) -> Option<Priority> {
        match token.trim().to_lowercase().as_str() {
            "yuksek" | "yüksek" | "high" | "y" => Some(Priority::High),
            "orta" | "medium" | "o" => Some(Priority::Medium),
            "dusuk" | "düşük" | "low" | "d" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn wire_value(self) -> &'static str {
        match self {
            Priority::Low => "dusuk",
            Priority::Medium => "orta",
            Priority::High => "yuksek",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Position in [`Priority::ORDER`]
    pub fn rank(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// One entry of a task's dependency section (`- Title (ID: x) - status`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub target_id: String,
    pub target_title: String,
    pub target_status: Option<TaskStatus>,
}

/// A task record as parsed from the task store.
///
/// Records are immutable snapshots: every fetch rebuilds them. Parent/child
/// structure lives in [`crate::ops::hierarchy::TaskTree`], which derives the
/// children of each task from `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `None` when the store reported a status this client does not know
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Display name of the project, when the listing carried one
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Ordered tag set; grouping by tag keys on the first entry
    #[serde(default)]
    pub tags: IndexSet<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created: Option<NaiveDate>,
    /// Number of tasks this one depends on
    #[serde(default)]
    pub dependency_out: usize,
    /// Of those, how many are not completed
    #[serde(default)]
    pub dependency_unmet: usize,
    /// Number of tasks depending on this one
    #[serde(default)]
    pub dependency_in: usize,
    /// Full dependency list (detail pages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl Task {
    /// Create a task with only the mandatory fields set
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: None,
            priority: None,
            project_id: None,
            project_name: None,
            parent_id: None,
            tags: IndexSet::new(),
            due_date: None,
            created: None,
            dependency_out: 0,
            dependency_unmet: 0,
            dependency_in: 0,
            dependencies: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Some(TaskStatus::Completed)
    }

    pub fn has_dependencies(&self) -> bool {
        self.dependency_out > 0 || !self.dependencies.is_empty()
    }

    /// Whole days from `today` to the due date (negative when overdue)
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }

    /// Overdue: due date in the past and not yet completed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.days_until_due(today).is_some_and(|d| d < 0)
    }

    /// First tag in insertion order
    pub fn first_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tokens() {
        assert_eq!(TaskStatus::from_token("⏳"), Some(TaskStatus::Pending));
        assert_eq!(TaskStatus::from_token("beklemede"), Some(TaskStatus::Pending));
        assert_eq!(TaskStatus::from_token("🔄"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_token("devam ediyor"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_token("Tamamlandı"), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::from_token("archived"), None);
    }

    #[test]
    fn priority_tokens() {
        assert_eq!(Priority::from_token("Y"), Some(Priority::High));
        assert_eq!(Priority::from_token("yüksek"), Some(Priority::High));
        assert_eq!(Priority::from_token("orta"), Some(Priority::Medium));
        assert_eq!(Priority::from_token("düşük"), Some(Priority::Low));
        assert_eq!(Priority::from_token("urgent"), None);
    }

    #[test]
    fn overdue_requires_open_task() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let mut task = Task::new("1", "Ship it");
        task.due_date = NaiveDate::from_ymd_opt(2025, 6, 9);
        task.status = Some(TaskStatus::Pending);
        assert!(task.is_overdue(today));
        assert_eq!(task.days_until_due(today), Some(-1));

        task.status = Some(TaskStatus::Completed);
        assert!(!task.is_overdue(today));
    }
}
