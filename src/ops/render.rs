use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::model::task::{Priority, Task, TaskStatus};
use crate::model::view::{GroupStrategy, ViewPrefs};
use crate::ops::filter::{self, Visibility};
use crate::ops::group::{self, Bucket};
use crate::ops::hierarchy::TaskTree;
use crate::ops::selection::Selection;
use crate::ops::sort;

/// Expand/collapse state of a task node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expansion {
    /// No visible children
    Leaf,
    Expanded,
    Collapsed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupNode {
    pub key: String,
    pub label: String,
    pub description: String,
    pub expanded: bool,
    pub children: Vec<ViewNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskNode {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    pub expansion: Expansion,
    pub selected: bool,
    /// Shown only to keep a matching relative in its hierarchy
    pub context: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewNode>,
}

/// Presentation-only node, rebuilt on every render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewNode {
    Group(GroupNode),
    Task(TaskNode),
}

/// The full output of the view pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedView {
    pub nodes: Vec<ViewNode>,
    /// Task ids in visual order, descending only into expanded nodes
    pub order: Vec<String>,
    /// Set when nothing is visible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RenderedView {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

struct Ctx<'a> {
    tree: &'a TaskTree,
    prefs: &'a ViewPrefs,
    selection: &'a Selection,
    visibility: &'a Visibility,
    today: NaiveDate,
}

/// Run filter, group and sort over `tree` and build the node tree.
pub fn render(
    tree: &TaskTree,
    prefs: &ViewPrefs,
    selection: &Selection,
    today: NaiveDate,
) -> RenderedView {
    let mut visibility = filter::apply(tree, &prefs.filter, prefs.hierarchy, today);
    if prefs.hide_completed {
        visibility.hide_completed(tree);
    }

    if visibility.is_empty() {
        return RenderedView {
            message: Some(empty_message(tree, prefs)),
            ..Default::default()
        };
    }

    let ctx = Ctx {
        tree,
        prefs,
        selection,
        visibility: &visibility,
        today,
    };

    // Units are what gets grouped and sorted at the top level: visible
    // forest roots when nesting, every visible task when flat.
    let mut units: Vec<&Task> = tree
        .tasks()
        .filter(|t| visibility.is_visible(&t.id))
        .filter(|t| {
            !prefs.hierarchy.keeps_hierarchy()
                || tree.parent(&t.id).is_none_or(|p| !visibility.is_visible(p))
        })
        .collect();
    sort::sort_tasks(&mut units, prefs.sort);

    let nodes: Vec<ViewNode> = if prefs.grouping == GroupStrategy::None {
        units.iter().map(|t| build_task(&ctx, t)).collect()
    } else {
        group::group(&units, prefs.grouping, today)
            .into_iter()
            .map(|bucket| build_group(&ctx, bucket))
            .collect()
    };

    let mut order = Vec::new();
    collect_order(&nodes, &mut order);
    debug!(
        nodes = nodes.len(),
        visible = visibility.visible.len(),
        "rendered view"
    );
    RenderedView {
        nodes,
        order,
        message: None,
    }
}

fn empty_message(tree: &TaskTree, prefs: &ViewPrefs) -> String {
    if tree.is_empty() {
        return "No tasks yet.".to_string();
    }
    match prefs.filter.search_text.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => format!("No results for \"{query}\"."),
        _ => "No tasks match the active filters.".to_string(),
    }
}

fn build_group<'t>(ctx: &Ctx<'t>, bucket: Bucket<'t>) -> ViewNode {
    let total = bucket.members.len();
    let completed = bucket.members.iter().filter(|t| t.is_completed()).count();
    let default_open = group::expanded_by_default(ctx.prefs.grouping, &bucket.key);
    let expanded = default_open != ctx.prefs.toggled_groups.contains(&bucket.key);

    ViewNode::Group(GroupNode {
        description: group_description(total, completed),
        expanded,
        children: bucket.members.iter().map(|t| build_task(ctx, t)).collect(),
        key: bucket.key,
        label: bucket.label,
    })
}

fn group_description(total: usize, completed: usize) -> String {
    let noun = if total == 1 { "task" } else { "tasks" };
    format!("[{completed}/{total}] {total} {noun}")
}

/// Visible children of `id`, sorted; none when flat
fn visible_children(ctx: &Ctx, id: &str) -> Vec<String> {
    if !ctx.prefs.hierarchy.keeps_hierarchy() {
        return Vec::new();
    }
    let mut children: Vec<String> = ctx
        .tree
        .children(id)
        .iter()
        .filter(|c| ctx.visibility.is_visible(c))
        .cloned()
        .collect();
    sort::sort_ids(&mut children, ctx.prefs.sort, |c| ctx.tree.get(c));
    children
}

/// Build a task node and its visible subtree without recursion
fn build_task<'t>(ctx: &Ctx<'t>, root: &'t Task) -> ViewNode {
    struct Frame<'t> {
        task: &'t Task,
        pending: std::vec::IntoIter<String>,
        built: Vec<ViewNode>,
    }

    fn frame<'t>(ctx: &Ctx<'t>, task: &'t Task) -> Frame<'t> {
        Frame {
            task,
            pending: visible_children(ctx, &task.id).into_iter(),
            built: Vec::new(),
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(root.id.as_str());
    let mut stack = vec![frame(ctx, root)];

    while let Some(top) = stack.last_mut() {
        if let Some(next) = top.pending.next() {
            if let Some(child) = ctx.tree.get(&next)
                && seen.insert(child.id.as_str())
            {
                stack.push(frame(ctx, child));
            }
            continue;
        }

        let done = stack.pop().map(|f| task_node(ctx, f.task, f.built));
        match (stack.last_mut(), done) {
            (Some(parent), Some(node)) => parent.built.push(node),
            (None, Some(node)) => return node,
            (_, None) => break,
        }
    }
    task_node(ctx, root, Vec::new())
}

fn task_node(ctx: &Ctx, task: &Task, children: Vec<ViewNode>) -> ViewNode {
    let expansion = if children.is_empty() {
        Expansion::Leaf
    } else if ctx.prefs.collapsed_tasks.contains(&task.id) {
        Expansion::Collapsed
    } else {
        Expansion::Expanded
    };
    ViewNode::Task(TaskNode {
        id: task.id.clone(),
        label: task.title.clone(),
        description: task_description(ctx, task),
        status: task.status,
        priority: task.priority,
        expansion,
        selected: ctx.selection.contains(&task.id),
        context: ctx.visibility.is_context(&task.id),
        children,
    })
}

/// Parts joined by ` • `: due marker, status, priority, tags, dependency
/// badges, subtask progress.
fn task_description(ctx: &Ctx, task: &Task) -> String {
    let mut parts: Vec<String> = Vec::new();

    if task.is_overdue(ctx.today) {
        parts.push("⚠️ Overdue".into());
    } else if task.days_until_due(ctx.today) == Some(0) {
        parts.push("📅 Today".into());
    }
    if let Some(status) = task.status {
        parts.push(status.label().into());
    }
    if let Some(priority) = task.priority {
        parts.push(format!("{} priority", priority.label()));
    }
    if !task.tags.is_empty() {
        let tags: Vec<String> = task.tags.iter().map(|t| format!("#{t}")).collect();
        parts.push(tags.join(" "));
    }
    if task.dependency_unmet > 0 {
        parts.push(format!("🔒{}", task.dependency_unmet));
    } else if task.has_dependencies() {
        parts.push("✅🔗".into());
    }
    if task.dependency_in > 0 {
        parts.push(format!("⬅{}", task.dependency_in));
    }
    let progress = ctx.tree.progress(&task.id);
    if progress.total > 0 {
        parts.push(format!("📁 {}/{}", progress.completed, progress.total));
    }
    parts.join(" • ")
}

fn collect_order(nodes: &[ViewNode], order: &mut Vec<String>) {
    let mut stack: Vec<&ViewNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        match node {
            ViewNode::Group(g) => {
                if g.expanded {
                    stack.extend(g.children.iter().rev());
                }
            }
            ViewNode::Task(t) => {
                order.push(t.id.clone());
                if t.expansion == Expansion::Expanded {
                    stack.extend(t.children.iter().rev());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::view::{FilterCriteria, HierarchyMode, SortField, SortSpec};
    use crate::ops::selection::ClickMods;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn task(id: &str, parent: Option<&str>, status: TaskStatus, priority: Priority) -> Task {
        let mut t = Task::new(id, format!("Task {id}"));
        t.parent_id = parent.map(str::to_string);
        t.status = Some(status);
        t.priority = Some(priority);
        t
    }

    fn sample() -> TaskTree {
        use Priority::*;
        use TaskStatus::*;
        TaskTree::build(vec![
            task("p", None, InProgress, High),
            task("p1", Some("p"), Completed, Low),
            task("p2", Some("p"), Pending, High),
            task("q", None, Pending, Low),
            task("r", None, Completed, Medium),
        ])
    }

    fn prefs(grouping: GroupStrategy) -> ViewPrefs {
        ViewPrefs {
            grouping,
            sort: SortSpec {
                field: SortField::Priority,
                ascending: true,
            },
            ..Default::default()
        }
    }

    fn group_keys(view: &RenderedView) -> Vec<(&str, bool)> {
        view.nodes
            .iter()
            .filter_map(|n| match n {
                ViewNode::Group(g) => Some((g.key.as_str(), g.expanded)),
                ViewNode::Task(_) => None,
            })
            .collect()
    }

    #[test]
    fn ungrouped_hierarchy_order() {
        let view = render(&sample(), &prefs(GroupStrategy::None), &Selection::new(), today());
        assert_eq!(view.order, vec!["p", "p2", "p1", "r", "q"]);
        let ViewNode::Task(p) = &view.nodes[0] else {
            panic!("expected task node");
        };
        assert_eq!(p.expansion, Expansion::Expanded);
        assert_eq!(
            p.description,
            "In progress • High priority • 📁 1/2"
        );
    }

    #[test]
    fn grouped_by_status_with_default_expansion() {
        let view = render(&sample(), &prefs(GroupStrategy::ByStatus), &Selection::new(), today());
        assert_eq!(
            group_keys(&view),
            vec![("pending", true), ("in-progress", true), ("completed", false)]
        );
        // Completed group is collapsed, so r is not in the visual order
        assert_eq!(view.order, vec!["q", "p", "p2", "p1"]);
    }

    #[test]
    fn toggled_group_and_collapsed_task() {
        let mut prefs = prefs(GroupStrategy::ByStatus);
        prefs.toggle_group("completed");
        prefs.toggle_task("p");
        let view = render(&sample(), &prefs, &Selection::new(), today());
        assert_eq!(view.order, vec!["q", "p", "r"]);
    }

    #[test]
    fn flat_mode_lists_every_visible_task() {
        let mut prefs = prefs(GroupStrategy::None);
        prefs.hierarchy = HierarchyMode::Flat;
        let view = render(&sample(), &prefs, &Selection::new(), today());
        assert_eq!(view.order, vec!["p", "p2", "r", "p1", "q"]);
        assert!(view.nodes.iter().all(|n| matches!(
            n,
            ViewNode::Task(TaskNode {
                expansion: Expansion::Leaf,
                ..
            })
        )));
    }

    #[test]
    fn filtered_parent_is_context() {
        let mut prefs = prefs(GroupStrategy::None);
        prefs.filter = FilterCriteria {
            status: Some(TaskStatus::Pending),
            ..Default::default()
        };
        prefs.hierarchy = HierarchyMode::MatchPath;
        let view = render(&sample(), &prefs, &Selection::new(), today());
        assert_eq!(view.order, vec!["p", "p2", "q"]);
        let ViewNode::Task(p) = &view.nodes[0] else {
            panic!("expected task node");
        };
        assert!(p.context);
    }

    #[test]
    fn selection_flags_follow_ids() {
        let mut selection = Selection::new();
        selection.select("p2", ClickMods::default(), &[]);
        let view = render(&sample(), &prefs(GroupStrategy::None), &selection, today());
        let ViewNode::Task(p) = &view.nodes[0] else {
            panic!("expected task node");
        };
        let ViewNode::Task(p2) = &p.children[0] else {
            panic!("expected task node");
        };
        assert!(p2.selected);
        assert!(!p.selected);
    }

    #[test]
    fn empty_messages() {
        let empty = render(&TaskTree::default(), &ViewPrefs::default(), &Selection::new(), today());
        assert_eq!(empty.message.as_deref(), Some("No tasks yet."));

        let mut prefs = prefs(GroupStrategy::None);
        prefs.filter.search_text = Some("zebra".into());
        let view = render(&sample(), &prefs, &Selection::new(), today());
        assert_eq!(view.message.as_deref(), Some("No results for \"zebra\"."));
        assert!(view.is_empty());

        prefs.filter.search_text = None;
        prefs.filter.has_dependency = true;
        let view = render(&sample(), &prefs, &Selection::new(), today());
        assert_eq!(view.message.as_deref(), Some("No tasks match the active filters."));
    }

    #[test]
    fn description_badges() {
        let mut t = Task::new("d", "Deps");
        t.due_date = Some(today());
        t.tags = ["a", "b"].iter().map(|s| s.to_string()).collect();
        t.dependency_out = 2;
        t.dependency_unmet = 1;
        t.dependency_in = 3;
        let tree = TaskTree::build(vec![t]);
        let view = render(&tree, &prefs(GroupStrategy::None), &Selection::new(), today());
        let ViewNode::Task(node) = &view.nodes[0] else {
            panic!("expected task node");
        };
        assert_eq!(node.description, "📅 Today • #a #b • 🔒1 • ⬅3");
    }

    #[test]
    fn group_description_counts_completed() {
        assert_eq!(group_description(3, 1), "[1/3] 3 tasks");
        assert_eq!(group_description(1, 0), "[0/1] 1 task");
    }
}
