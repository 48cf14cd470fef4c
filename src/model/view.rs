use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::task::{Priority, TaskStatus};

/// Composite filter. Every present field must match (AND).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Case-insensitive substring of title, description or any tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Matches when the task's tags intersect this set; empty means absent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub overdue: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub due_today: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub due_this_week: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_any_tag: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_dependency: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FilterCriteria {
    /// True when no field is present; such criteria keep every task.
    pub fn is_empty(&self) -> bool {
        self.search_text.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.status.is_none()
            && self.priority.is_none()
            && self.project_id.is_none()
            && self.tags.is_empty()
            && !self.overdue
            && !self.due_today
            && !self.due_this_week
            && !self.has_any_tag
            && !self.has_dependency
    }

    /// Overlay the present fields of `other` onto `self`
    pub fn merge(&mut self, other: FilterCriteria) {
        if other.search_text.is_some() {
            self.search_text = other.search_text;
        }
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.project_id.is_some() {
            self.project_id = other.project_id;
        }
        if !other.tags.is_empty() {
            self.tags = other.tags;
        }
        self.overdue |= other.overdue;
        self.due_today |= other.due_today;
        self.due_this_week |= other.due_this_week;
        self.has_any_tag |= other.has_any_tag;
        self.has_dependency |= other.has_dependency;
    }
}

/// How tasks are partitioned into buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupStrategy {
    None,
    #[default]
    ByStatus,
    ByPriority,
    ByProject,
    ByTag,
    ByDueDate,
}

impl GroupStrategy {
    /// Accepts the short names used on the command line and in config files
    pub fn from_name(name: &str) -> Option<GroupStrategy> {
        match name.trim().to_lowercase().as_str() {
            "none" => Some(GroupStrategy::None),
            "status" | "by-status" => Some(GroupStrategy::ByStatus),
            "priority" | "by-priority" => Some(GroupStrategy::ByPriority),
            "project" | "by-project" => Some(GroupStrategy::ByProject),
            "tag" | "by-tag" => Some(GroupStrategy::ByTag),
            "due" | "due-date" | "by-due-date" => Some(GroupStrategy::ByDueDate),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GroupStrategy::None => "none",
            GroupStrategy::ByStatus => "status",
            GroupStrategy::ByPriority => "priority",
            GroupStrategy::ByProject => "project",
            GroupStrategy::ByTag => "tag",
            GroupStrategy::ByDueDate => "due-date",
        }
    }
}

/// Field a task list is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortField {
    Title,
    #[default]
    Priority,
    Status,
    DueDate,
    CreatedDate,
}

impl SortField {
    pub fn from_name(name: &str) -> Option<SortField> {
        match name.trim().to_lowercase().as_str() {
            "title" => Some(SortField::Title),
            "priority" => Some(SortField::Priority),
            "status" => Some(SortField::Status),
            "due" | "due-date" => Some(SortField::DueDate),
            "created" | "created-date" => Some(SortField::CreatedDate),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Priority => "priority",
            SortField::Status => "status",
            SortField::DueDate => "due-date",
            SortField::CreatedDate => "created-date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub ascending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            field: SortField::Priority,
            ascending: true,
        }
    }
}

/// Which relatives of a matching task stay visible when filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HierarchyMode {
    /// Only direct matches, rendered without nesting
    Flat,
    /// Matches plus their ancestors
    MatchPath,
    /// Matches, their ancestors and their full subtrees
    #[default]
    MatchPathAndSubtree,
}

impl HierarchyMode {
    pub fn from_name(name: &str) -> Option<HierarchyMode> {
        match name.trim().to_lowercase().as_str() {
            "flat" => Some(HierarchyMode::Flat),
            "path" | "match-path" => Some(HierarchyMode::MatchPath),
            "subtree" | "match-path-and-subtree" => Some(HierarchyMode::MatchPathAndSubtree),
            _ => None,
        }
    }

    pub fn keeps_hierarchy(self) -> bool {
        self != HierarchyMode::Flat
    }
}

/// View preferences reapplied to every freshly fetched task set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPrefs {
    #[serde(default)]
    pub filter: FilterCriteria,
    #[serde(default)]
    pub grouping: GroupStrategy,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub hierarchy: HierarchyMode,
    /// Drop completed tasks from the view altogether
    #[serde(default)]
    pub hide_completed: bool,
    /// Group keys whose expansion the user toggled away from the default
    #[serde(default)]
    pub toggled_groups: HashSet<String>,
    /// Task ids the user collapsed
    #[serde(default)]
    pub collapsed_tasks: HashSet<String>,
}

impl ViewPrefs {
    /// Switching strategy resets group toggles; keys of one strategy mean
    /// nothing under another.
    pub fn set_grouping(&mut self, grouping: GroupStrategy) {
        if self.grouping != grouping {
            self.grouping = grouping;
            self.toggled_groups.clear();
        }
    }

    pub fn toggle_group(&mut self, key: &str) {
        if !self.toggled_groups.remove(key) {
            self.toggled_groups.insert(key.to_string());
        }
    }

    pub fn toggle_task(&mut self, id: &str) {
        if !self.collapsed_tasks.remove(id) {
            self.collapsed_tasks.insert(id.to_string());
        }
    }
}
