use serde::{Deserialize, Serialize};

/// A project as listed by the task store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// At most one project is active at a time
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub task_count: usize,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Project {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            is_active: false,
            task_count: 0,
        }
    }
}

/// Mark the project with `active_id` active and every other one inactive.
pub fn mark_active(projects: &mut [Project], active_id: Option<&str>) {
    for project in projects.iter_mut() {
        project.is_active = active_id == Some(project.id.as_str());
    }
}

/// Workspace-wide counters from the summary page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub total_projects: usize,
    /// `None` when the store reports no active project
    pub active_project: Option<String>,
}

/// Subtree progress as reported by the hierarchy page of a single task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyProgress {
    pub total_subtasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    /// Percentage as printed by the store (0–100)
    pub percent: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_active_keeps_single_active_project() {
        let mut projects = vec![Project::new("a", "Alpha"), Project::new("b", "Beta")];
        projects[0].is_active = true;
        mark_active(&mut projects, Some("b"));
        assert!(!projects[0].is_active);
        assert!(projects[1].is_active);

        mark_active(&mut projects, None);
        assert!(projects.iter().all(|p| !p.is_active));
    }
}
