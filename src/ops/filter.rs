use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::trace;

use crate::model::task::Task;
use crate::model::view::{FilterCriteria, HierarchyMode};
use crate::ops::hierarchy::TaskTree;

/// Result of filtering a tree.
///
/// `matched` holds the tasks that satisfy the criteria themselves;
/// `visible` additionally holds relatives kept for hierarchy context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    pub visible: HashSet<String>,
    pub matched: HashSet<String>,
}

impl Visibility {
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.contains(id)
    }

    /// Visible only to keep a match reachable or in context
    pub fn is_context(&self, id: &str) -> bool {
        self.visible.contains(id) && !self.matched.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Remove completed tasks entirely, matches and context alike
    pub fn hide_completed(&mut self, tree: &TaskTree) {
        let completed: Vec<String> = self
            .visible
            .iter()
            .filter(|id| tree.get(id).is_some_and(Task::is_completed))
            .cloned()
            .collect();
        for id in completed {
            self.visible.remove(&id);
            self.matched.remove(&id);
        }
    }
}

/// Evaluate every present criterion against one task (AND).
///
/// Date flags are computed against `today` on every call.
pub fn matches(task: &Task, criteria: &FilterCriteria, today: NaiveDate) -> bool {
    if let Some(query) = criteria.search_text.as_deref().map(str::trim)
        && !query.is_empty()
    {
        let query = query.to_lowercase();
        let hit = task.title.to_lowercase().contains(&query)
            || task.description.to_lowercase().contains(&query)
            || task.tags.iter().any(|t| t.to_lowercase().contains(&query));
        if !hit {
            return false;
        }
    }
    if criteria.status.is_some() && task.status != criteria.status {
        return false;
    }
    if criteria.priority.is_some() && task.priority != criteria.priority {
        return false;
    }
    if let Some(project) = &criteria.project_id
        && task.project_id.as_ref() != Some(project)
    {
        return false;
    }
    if !criteria.tags.is_empty() && !criteria.tags.iter().any(|t| task.tags.contains(t)) {
        return false;
    }

    let days = task.days_until_due(today);
    if criteria.overdue && !task.is_overdue(today) {
        return false;
    }
    if criteria.due_today && days != Some(0) {
        return false;
    }
    if criteria.due_this_week && !days.is_some_and(|d| (0..7).contains(&d)) {
        return false;
    }
    if criteria.has_any_tag && task.tags.is_empty() {
        return false;
    }
    if criteria.has_dependency && !task.has_dependencies() {
        return false;
    }
    true
}

/// Filter a tree.
///
/// With empty criteria every task is matched. Otherwise direct matches are
/// kept and, depending on `mode`, their ancestors (so the path stays
/// reachable) and their descendants. Siblings of a match are never pulled
/// in on its behalf.
pub fn apply(
    tree: &TaskTree,
    criteria: &FilterCriteria,
    mode: HierarchyMode,
    today: NaiveDate,
) -> Visibility {
    if criteria.is_empty() {
        let all: HashSet<String> = tree.tasks().map(|t| t.id.clone()).collect();
        return Visibility {
            visible: all.clone(),
            matched: all,
        };
    }

    let matched: HashSet<String> = tree
        .tasks()
        .filter(|t| matches(t, criteria, today))
        .map(|t| t.id.clone())
        .collect();
    let mut visible = matched.clone();

    if mode.keeps_hierarchy() {
        for id in &matched {
            for ancestor in tree.ancestors(id) {
                if !visible.insert(ancestor.to_string()) {
                    break;
                }
            }
        }
        if mode == HierarchyMode::MatchPathAndSubtree {
            for id in &matched {
                visible.extend(tree.descendants(id).into_iter().map(str::to_string));
            }
        }
    }

    trace!(matched = matched.len(), visible = visible.len(), "filter applied");
    Visibility { visible, matched }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Priority, TaskStatus};
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn task(id: &str, parent: Option<&str>) -> Task {
        let mut t = Task::new(id, format!("Task {id}"));
        t.parent_id = parent.map(str::to_string);
        t.status = Some(TaskStatus::Pending);
        t.priority = Some(Priority::Medium);
        t
    }

    fn with_tags(mut t: Task, tags: &[&str]) -> Task {
        t.tags = tags.iter().map(|s| s.to_string()).collect();
        t
    }

    fn due_in(mut t: Task, days: i64) -> Task {
        t.due_date = Some(today() + chrono::Duration::days(days));
        t
    }

    fn sorted(set: &HashSet<String>) -> Vec<&str> {
        let mut v: Vec<&str> = set.iter().map(String::as_str).collect();
        v.sort();
        v
    }

    fn family() -> TaskTree {
        TaskTree::build(vec![
            task("root", None),
            with_tags(task("a", Some("root")), &["hit"]),
            task("a1", Some("a")),
            task("b", Some("root")),
            task("other", None),
        ])
    }

    #[test]
    fn empty_criteria_is_identity() {
        let tree = family();
        let vis = apply(&tree, &FilterCriteria::default(), HierarchyMode::Flat, today());
        assert_eq!(vis.visible.len(), tree.len());
        assert_eq!(vis.matched, vis.visible);
    }

    #[test]
    fn tag_filter_intersects() {
        let criteria = FilterCriteria {
            tags: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        assert!(matches(&with_tags(task("1", None), &["b", "c"]), &criteria, today()));
        assert!(!matches(&with_tags(task("2", None), &["c", "d"]), &criteria, today()));
    }

    #[test]
    fn search_covers_title_description_and_tags() {
        let mut t = with_tags(task("1", None), &["Backend"]);
        t.description = "Needs a migration".into();
        let search = |q: &str| FilterCriteria {
            search_text: Some(q.into()),
            ..Default::default()
        };
        assert!(matches(&t, &search("task 1"), today()));
        assert!(matches(&t, &search("MIGRATION"), today()));
        assert!(matches(&t, &search("backend"), today()));
        assert!(!matches(&t, &search("frontend"), today()));
    }

    #[test]
    fn date_flags_use_evaluation_date() {
        let overdue = FilterCriteria {
            overdue: true,
            ..Default::default()
        };
        let due_today = FilterCriteria {
            due_today: true,
            ..Default::default()
        };
        let this_week = FilterCriteria {
            due_this_week: true,
            ..Default::default()
        };
        let late = due_in(task("late", None), -2);
        assert!(matches(&late, &overdue, today()));
        assert!(!matches(&late, &this_week, today()));

        let now = due_in(task("now", None), 0);
        assert!(matches(&now, &due_today, today()));
        assert!(matches(&now, &this_week, today()));
        assert!(!matches(&now, &due_today, today() + chrono::Duration::days(1)));

        assert!(matches(&due_in(task("w", None), 6), &this_week, today()));
        assert!(!matches(&due_in(task("w", None), 7), &this_week, today()));
        assert!(!matches(&task("none", None), &this_week, today()));
    }

    #[test]
    fn all_present_fields_must_match() {
        let criteria = FilterCriteria {
            status: Some(TaskStatus::Pending),
            priority: Some(Priority::High),
            ..Default::default()
        };
        let mut t = task("1", None);
        assert!(!matches(&t, &criteria, today()));
        t.priority = Some(Priority::High);
        assert!(matches(&t, &criteria, today()));
        t.status = None;
        assert!(!matches(&t, &criteria, today()));
    }

    #[test]
    fn dependency_and_project_flags() {
        let mut t = task("1", None);
        let deps = FilterCriteria {
            has_dependency: true,
            ..Default::default()
        };
        assert!(!matches(&t, &deps, today()));
        t.dependency_out = 1;
        assert!(matches(&t, &deps, today()));

        let project = FilterCriteria {
            project_id: Some("p1".into()),
            ..Default::default()
        };
        assert!(!matches(&t, &project, today()));
        t.project_id = Some("p1".into());
        assert!(matches(&t, &project, today()));
    }

    #[test]
    fn flat_mode_keeps_only_matches() {
        let criteria = FilterCriteria {
            tags: vec!["hit".into()],
            ..Default::default()
        };
        let vis = apply(&family(), &criteria, HierarchyMode::Flat, today());
        assert_eq!(sorted(&vis.visible), vec!["a"]);
    }

    #[test]
    fn match_path_keeps_ancestors_not_siblings() {
        let criteria = FilterCriteria {
            tags: vec!["hit".into()],
            ..Default::default()
        };
        let vis = apply(&family(), &criteria, HierarchyMode::MatchPath, today());
        assert_eq!(sorted(&vis.visible), vec!["a", "root"]);
        assert!(vis.is_context("root"));
        assert!(!vis.is_context("a"));
    }

    #[test]
    fn subtree_mode_adds_descendants() {
        let criteria = FilterCriteria {
            tags: vec!["hit".into()],
            ..Default::default()
        };
        let vis = apply(&family(), &criteria, HierarchyMode::MatchPathAndSubtree, today());
        assert_eq!(sorted(&vis.visible), vec!["a", "a1", "root"]);
        assert!(vis.is_context("a1"));
    }

    #[test]
    fn hide_completed_drops_done_tasks() {
        let mut done = task("done", None);
        done.status = Some(TaskStatus::Completed);
        let tree = TaskTree::build(vec![done, task("open", None)]);
        let mut vis = apply(&tree, &FilterCriteria::default(), HierarchyMode::Flat, today());
        vis.hide_completed(&tree);
        assert_eq!(sorted(&vis.visible), vec!["open"]);
    }
}
