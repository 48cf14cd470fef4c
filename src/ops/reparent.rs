use tracing::debug;

use crate::model::task::{Priority, Task, TaskStatus};
use crate::model::view::GroupStrategy;
use crate::ops::group::{NO_PROJECT_KEY, PROJECT_KEY_PREFIX, priority_key, status_key};

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    Single(Task),
    /// Ordered, without duplicates
    Multi(Vec<Task>),
}

impl DragPayload {
    /// One task becomes `Single`, several become `Multi`; duplicates are
    /// dropped keeping the first. `None` for an empty list.
    pub fn from_tasks(tasks: Vec<Task>) -> Option<DragPayload> {
        let mut unique: Vec<Task> = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !unique.iter().any(|t| t.id == task.id) {
                unique.push(task);
            }
        }
        match unique.len() {
            0 => None,
            1 => unique.pop().map(DragPayload::Single),
            _ => Some(DragPayload::Multi(unique)),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        match self {
            DragPayload::Single(task) => std::slice::from_ref(task),
            DragPayload::Multi(tasks) => tasks,
        }
    }
}

/// Where the payload was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Onto a task node: it becomes the new parent
    Task(String),
    /// Onto empty space: promote to root
    Canvas,
    /// Onto a group header of the view grouped by `strategy`
    Group { strategy: GroupStrategy, key: String },
}

/// The change a drop asks the store to make to one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropChange {
    /// `None` makes the task a root
    Parent(Option<String>),
    Status(TaskStatus),
    Priority(Priority),
    /// `None` takes the task out of its project
    Project(Option<String>),
}

impl DropChange {
    /// The change a group header stands for. Only status, priority and
    /// project groups accept drops; fallback buckets such as "unknown" don't.
    pub fn for_group(strategy: GroupStrategy, key: &str) -> Option<DropChange> {
        match strategy {
            GroupStrategy::ByStatus => TaskStatus::ORDER
                .into_iter()
                .find(|s| status_key(*s) == key)
                .map(DropChange::Status),
            GroupStrategy::ByPriority => Priority::ORDER
                .into_iter()
                .find(|p| priority_key(*p) == key)
                .map(DropChange::Priority),
            GroupStrategy::ByProject if key == NO_PROJECT_KEY => Some(DropChange::Project(None)),
            GroupStrategy::ByProject => key
                .strip_prefix(PROJECT_KEY_PREFIX)
                .map(|id| DropChange::Project(Some(id.to_string()))),
            GroupStrategy::None | GroupStrategy::ByTag | GroupStrategy::ByDueDate => None,
        }
    }

    /// True when `task` already has what this change would set
    fn already_applies_to(&self, task: &Task) -> bool {
        match self {
            DropChange::Parent(None) => task.parent_id.is_none(),
            // Sent even when unchanged; the store decides
            DropChange::Parent(Some(_)) => false,
            DropChange::Status(status) => task.status == Some(*status),
            DropChange::Priority(priority) => task.priority == Some(*priority),
            DropChange::Project(project) => {
                task.project_id.as_deref().filter(|p| !p.is_empty()) == project.as_deref()
            }
        }
    }
}

/// One store call to issue for a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRequest {
    pub task_id: String,
    pub change: DropChange,
}

/// Translate a drop into per-task requests.
///
/// Tasks that already satisfy the change are skipped without a call or a
/// report: a root dropped on the canvas, or a task dropped on the group it
/// is already in. A group that accepts no drops yields nothing. Every other
/// rule (cycles, project boundaries) is left to the store.
pub fn plan_drop(payload: &DragPayload, target: &DropTarget) -> Vec<DropRequest> {
    let change = match target {
        DropTarget::Task(parent) => DropChange::Parent(Some(parent.clone())),
        DropTarget::Canvas => DropChange::Parent(None),
        DropTarget::Group { strategy, key } => match DropChange::for_group(*strategy, key) {
            Some(change) => change,
            None => {
                debug!(?strategy, key = %key, "group does not accept drops");
                return Vec::new();
            }
        },
    };
    payload
        .tasks()
        .iter()
        .filter_map(|task| {
            if change.already_applies_to(task) {
                debug!(id = %task.id, ?change, "drop changes nothing for task; ignored");
                return None;
            }
            Some(DropRequest {
                task_id: task.id.clone(),
                change: change.clone(),
            })
        })
        .collect()
}

/// Why the store refused a drop
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionKind {
    #[error("A task cannot be moved under itself or one of its own subtasks.")]
    CircularDependency,
    #[error("A subtask must stay in the same project as its parent.")]
    ProjectMismatch,
    #[error("The task no longer exists. Refresh the view and try again.")]
    NotFound,
    /// Unclassified; shown verbatim
    #[error("{0}")]
    Other(String),
}

impl RejectionKind {
    /// Classify a free-text rejection from the store by substring
    pub fn classify(message: &str) -> RejectionKind {
        let lowered = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));

        if has(&["circular", "dairesel", "cycle", "döngü"]) {
            RejectionKind::CircularDependency
        } else if has(&["same project", "aynı projede", "different project", "farklı proje"]) {
            RejectionKind::ProjectMismatch
        } else if has(&["not found", "bulunamadı"]) {
            RejectionKind::NotFound
        } else {
            RejectionKind::Other(message.trim().to_string())
        }
    }

    /// Fixed, non-technical text for the user
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Per-task results of a resolved drop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropOutcome {
    pub applied: Vec<String>,
    pub rejected: Vec<(String, RejectionKind)>,
}

/// State of one drag gesture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragPayload),
    AwaitingServerDecision(Vec<DropRequest>),
    /// Every request succeeded
    Applied(DropOutcome),
    /// At least one request was refused; `applied` lists the ones that went through
    Rejected(DropOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GestureError {
    #[error("a drag is already in progress")]
    Busy,
    #[error("nothing is being dragged")]
    NotDragging,
    #[error("no drop is awaiting a decision")]
    NotAwaiting,
}

/// Drives a single drag gesture through its states
#[derive(Debug, Clone, Default)]
pub struct DragGesture {
    state: DragState,
}

impl DragGesture {
    pub fn new() -> Self {
        DragGesture::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Idle (or a finished gesture) → Dragging
    pub fn start(&mut self, payload: DragPayload) -> Result<(), GestureError> {
        match self.state {
            DragState::Dragging(_) | DragState::AwaitingServerDecision(_) => Err(GestureError::Busy),
            _ => {
                self.state = DragState::Dragging(payload);
                Ok(())
            }
        }
    }

    /// Dragging → AwaitingServerDecision, returning the calls to make.
    /// A drop that produces no calls returns the gesture to Idle.
    pub fn drop_on(&mut self, target: &DropTarget) -> Result<Vec<DropRequest>, GestureError> {
        let DragState::Dragging(payload) = &self.state else {
            return Err(GestureError::NotDragging);
        };
        let requests = plan_drop(payload, target);
        self.state = if requests.is_empty() {
            DragState::Idle
        } else {
            DragState::AwaitingServerDecision(requests.clone())
        };
        Ok(requests)
    }

    /// AwaitingServerDecision → Applied or Rejected
    pub fn resolve(
        &mut self,
        results: Vec<(String, Result<(), RejectionKind>)>,
    ) -> Result<&DragState, GestureError> {
        if !matches!(self.state, DragState::AwaitingServerDecision(_)) {
            return Err(GestureError::NotAwaiting);
        }
        let mut outcome = DropOutcome::default();
        for (id, result) in results {
            match result {
                Ok(()) => outcome.applied.push(id),
                Err(kind) => outcome.rejected.push((id, kind)),
            }
        }
        self.state = if outcome.rejected.is_empty() {
            DragState::Applied(outcome)
        } else {
            DragState::Rejected(outcome)
        };
        Ok(&self.state)
    }

    /// Abandon the gesture; a late server decision is then ignored
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
