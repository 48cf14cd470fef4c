use serde::Serialize;

use crate::model::project::{HierarchyProgress, Project, Summary};
use crate::model::task::Task;
use crate::model::template::Template;
use crate::model::view::FilterCriteria;
use crate::ops::reparent::DragState;
use crate::ops::render::{Expansion, GroupNode, RenderedView, TaskNode, ViewNode};
use crate::session::{BulkOutcome, Notice};
use crate::util::unicode::{pad_to_width, truncate_to_width};

/// Widest a task label may render before it is cut
const LABEL_CELLS: usize = 48;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskDetailJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<&'a HierarchyProgress>,
}

#[derive(Serialize)]
pub struct ProfileJson<'a> {
    pub name: &'a str,
    pub filter: &'a FilterCriteria,
}

#[derive(Serialize)]
pub struct BulkJson<'a> {
    pub succeeded: &'a [String],
    pub failed: Vec<FailureJson<'a>>,
}

#[derive(Serialize)]
pub struct FailureJson<'a> {
    pub id: &'a str,
    pub message: String,
}

pub fn bulk_to_json(outcome: &BulkOutcome) -> BulkJson<'_> {
    BulkJson {
        succeeded: &outcome.succeeded,
        failed: outcome
            .failed
            .iter()
            .map(|(id, message)| FailureJson {
                id,
                message: message.clone(),
            })
            .collect(),
    }
}

pub fn drag_to_json(state: &DragState) -> BulkJson<'_> {
    match state {
        DragState::Applied(outcome) | DragState::Rejected(outcome) => BulkJson {
            succeeded: &outcome.applied,
            failed: outcome
                .rejected
                .iter()
                .map(|(id, kind)| FailureJson {
                    id,
                    message: kind.user_message(),
                })
                .collect(),
        },
        _ => BulkJson {
            succeeded: &[],
            failed: Vec::new(),
        },
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn expansion_char(expansion: Expansion) -> char {
    match expansion {
        Expansion::Leaf => '•',
        Expansion::Expanded => '▾',
        Expansion::Collapsed => '▸',
    }
}

fn format_group_line(group: &GroupNode) -> String {
    let marker = if group.expanded { '▾' } else { '▸' };
    format!("{} {}  ({})", marker, group.label, group.description)
}

/// One task row: selection mark, expander, label, ID, description.
/// Rows shown only for hierarchy context have their label in parentheses.
fn format_task_line(task: &TaskNode, depth: usize) -> String {
    let mark = if task.selected { '*' } else { ' ' };
    let label = if task.context {
        format!("({})", task.label)
    } else {
        task.label.clone()
    };
    let head = format!(
        "{}{}{} {} [{}]",
        "  ".repeat(depth),
        mark,
        expansion_char(task.expansion),
        truncate_to_width(&label, LABEL_CELLS),
        task.id
    );
    if task.description.is_empty() {
        head
    } else {
        format!("{}  {}", pad_to_width(&head, LABEL_CELLS + 12), task.description)
    }
}

/// Format the rendered view, descending only into expanded nodes
pub fn format_view(view: &RenderedView) -> Vec<String> {
    if let Some(message) = &view.message {
        return vec![message.clone()];
    }
    let mut lines = Vec::new();
    let mut stack: Vec<(&ViewNode, usize)> = view.nodes.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        match node {
            ViewNode::Group(group) => {
                lines.push(format_group_line(group));
                if group.expanded {
                    stack.extend(group.children.iter().rev().map(|n| (n, depth + 1)));
                }
            }
            ViewNode::Task(task) => {
                lines.push(format_task_line(task, depth));
                if task.expansion == Expansion::Expanded {
                    stack.extend(task.children.iter().rev().map(|n| (n, depth + 1)));
                }
            }
        }
    }
    lines
}

/// Format detailed task view
pub fn format_task_detail(task: &Task, progress: Option<&HierarchyProgress>) -> Vec<String> {
    let mut lines = vec![format!("{} [{}]", task.title, task.id)];

    let mut facts = Vec::new();
    if let Some(status) = task.status {
        facts.push(format!("status: {}", status.label()));
    }
    if let Some(priority) = task.priority {
        facts.push(format!("priority: {}", priority.label()));
    }
    if !facts.is_empty() {
        lines.push(facts.join("  "));
    }
    match (&task.project_name, &task.project_id) {
        (Some(name), Some(id)) => lines.push(format!("project: {name} ({id})")),
        (Some(name), None) => lines.push(format!("project: {name}")),
        (None, Some(id)) => lines.push(format!("project: {id}")),
        (None, None) => {}
    }
    if let Some(parent) = &task.parent_id {
        lines.push(format!("parent: {parent}"));
    }
    if let Some(due) = task.due_date {
        lines.push(format!("due: {due}"));
    }
    if let Some(created) = task.created {
        lines.push(format!("created: {created}"));
    }
    if !task.tags.is_empty() {
        let tags: Vec<String> = task.tags.iter().map(|t| format!("#{t}")).collect();
        lines.push(format!("tags: {}", tags.join(" ")));
    }

    if !task.description.is_empty() {
        lines.push(String::new());
        lines.extend(task.description.lines().map(str::to_string));
    }

    if !task.dependencies.is_empty() {
        lines.push(String::new());
        lines.push("depends on:".to_string());
        for dep in &task.dependencies {
            let status = dep.target_status.map_or("?", |s| s.label());
            lines.push(format!("  {} [{}] {}", dep.target_title, dep.target_id, status));
        }
    }
    if task.dependency_in > 0 {
        lines.push(format!("depended on by: {}", task.dependency_in));
    }

    if let Some(p) = progress.filter(|p| p.total_subtasks > 0) {
        lines.push(String::new());
        let percent = p.percent.map(|v| format!(" ({v}%)")).unwrap_or_default();
        lines.push(format!(
            "subtasks: {}/{} completed{}, {} in progress, {} pending",
            p.completed, p.total_subtasks, percent, p.in_progress, p.pending
        ));
    }
    lines
}

pub fn format_project_line(project: &Project) -> String {
    let active = if project.is_active { " ★" } else { "" };
    format!("  {} [{}] {} tasks{}", project.name, project.id, project.task_count, active)
}

pub fn format_templates(templates: &[Template]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut category: Option<&str> = None;
    for template in templates {
        if category != Some(template.category.as_str()) {
            if category.is_some() {
                lines.push(String::new());
            }
            lines.push(format!("== {} ==", template.category));
            category = Some(template.category.as_str());
        }
        lines.push(format!("  {} [{}]", template.name, template.id));
        let required: Vec<&str> = template.required_fields().map(|f| f.name.as_str()).collect();
        if !required.is_empty() {
            lines.push(format!("    required: {}", required.join(", ")));
        }
    }
    lines
}

pub fn format_summary(summary: &Summary) -> Vec<String> {
    vec![
        format!(
            "tasks: {}  ({} completed, {} in progress, {} pending)",
            summary.total_tasks, summary.completed, summary.in_progress, summary.pending
        ),
        format!("projects: {}", summary.total_projects),
        format!(
            "active project: {}",
            summary.active_project.as_deref().unwrap_or("none")
        ),
    ]
}

pub fn format_bulk(outcome: &BulkOutcome) -> Vec<String> {
    let mut lines: Vec<String> = outcome.succeeded.iter().map(|id| format!("ok    {id}")).collect();
    lines.extend(
        outcome
            .failed
            .iter()
            .map(|(id, message)| format!("fail  {id}: {message}")),
    );
    lines
}

pub fn format_drag(state: &DragState) -> Vec<String> {
    match state {
        DragState::Applied(outcome) | DragState::Rejected(outcome) => {
            let mut lines: Vec<String> =
                outcome.applied.iter().map(|id| format!("moved {id}")).collect();
            lines.extend(
                outcome
                    .rejected
                    .iter()
                    .map(|(id, kind)| format!("fail  {id}: {}", kind.user_message())),
            );
            lines
        }
        _ => vec!["nothing to move".to_string()],
    }
}

pub fn format_profile(name: &str, filter: &FilterCriteria) -> String {
    let mut parts = Vec::new();
    if let Some(search) = &filter.search_text {
        parts.push(format!("search=\"{search}\""));
    }
    if let Some(status) = filter.status {
        parts.push(format!("status={}", status.label()));
    }
    if let Some(priority) = filter.priority {
        parts.push(format!("priority={}", priority.label()));
    }
    if let Some(project) = &filter.project_id {
        parts.push(format!("project={project}"));
    }
    if !filter.tags.is_empty() {
        parts.push(format!("tags={}", filter.tags.join(",")));
    }
    for (on, flag) in [
        (filter.overdue, "overdue"),
        (filter.due_today, "due-today"),
        (filter.due_this_week, "due-this-week"),
        (filter.has_any_tag, "tagged"),
        (filter.has_dependency, "has-deps"),
    ] {
        if on {
            parts.push(flag.to_string());
        }
    }
    if parts.is_empty() {
        parts.push("(no filters)".to_string());
    }
    format!("  {}: {}", name, parts.join(" "))
}

/// Notices go to stderr so they never mix with JSON on stdout
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("{notice}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Priority, TaskStatus};
    use crate::model::view::{GroupStrategy, ViewPrefs};
    use crate::ops::hierarchy::TaskTree;
    use crate::ops::render::render;
    use crate::ops::selection::{ClickMods, Selection};
    use chrono::NaiveDate;

    fn sample_view(grouping: GroupStrategy) -> RenderedView {
        let mut parent = Task::new("g1", "Ship release");
        parent.status = Some(TaskStatus::InProgress);
        parent.priority = Some(Priority::High);
        let mut child = Task::new("g2", "Write notes");
        child.parent_id = Some("g1".into());
        child.status = Some(TaskStatus::Completed);
        child.priority = Some(Priority::Low);
        let mut other = Task::new("g3", "Triage bugs");
        other.status = Some(TaskStatus::Pending);
        other.priority = Some(Priority::Medium);
        other.tags = ["bug".to_string()].into_iter().collect();

        let tree = TaskTree::build(vec![parent, child, other]);
        let prefs = ViewPrefs {
            grouping,
            ..Default::default()
        };
        let mut selection = Selection::new();
        selection.select("g3", ClickMods::default(), &[]);
        render(&tree, &prefs, &selection, NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())
    }

    #[test]
    fn tree_text_grouped_by_status() {
        let text = format_view(&sample_view(GroupStrategy::ByStatus)).join("\n");
        insta::assert_snapshot!(text, @r"
        ▾ Pending  ([0/1] 1 task)
          *• Triage bugs [g3]                                         Pending • Medium priority • #bug
        ▾ In progress  ([0/1] 1 task)
           ▾ Ship release [g1]                                        In progress • High priority • 📁 1/1
             • Write notes [g2]                                       Completed • Low priority
        ");
    }

    #[test]
    fn tree_text_ungrouped() {
        let text = format_view(&sample_view(GroupStrategy::None)).join("\n");
        insta::assert_snapshot!(text, @r"
         ▾ Ship release [g1]                                          In progress • High priority • 📁 1/1
           • Write notes [g2]                                         Completed • Low priority
        *• Triage bugs [g3]                                           Pending • Medium priority • #bug
        ");
    }

    #[test]
    fn empty_view_prints_message() {
        let view = RenderedView {
            message: Some("No tasks yet.".into()),
            ..Default::default()
        };
        assert_eq!(format_view(&view), vec!["No tasks yet."]);
    }

    #[test]
    fn profile_line_lists_flags() {
        let filter = FilterCriteria {
            priority: Some(Priority::High),
            overdue: true,
            ..Default::default()
        };
        assert_eq!(format_profile("urgent", &filter), "  urgent: priority=High overdue");
        assert_eq!(
            format_profile("all", &FilterCriteria::default()),
            "  all: (no filters)"
        );
    }
}
