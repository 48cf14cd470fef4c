//! The controller that owns one view of the task store.
//!
//! A [`Session`] holds the last-known-good task tree, the view preferences,
//! the selection, saved filter profiles and the set of tasks with a mutation
//! on the wire. Every method takes `&self`: state lives in cells that are
//! never borrowed across an `.await`, so refreshes and mutations issued
//! from the same task may overlap.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::io::state::UiState;
use crate::model::task::{Task, TaskStatus};
use crate::model::view::{FilterCriteria, ViewPrefs};
use crate::ops::hierarchy::TaskTree;
use crate::ops::render::{self, RenderedView};
use crate::ops::reparent::{
    DragGesture, DragPayload, DragState, DropChange, DropRequest, DropTarget, GestureError,
    RejectionKind,
};
use crate::ops::selection::{ClickMods, Selection};
use crate::remote::{ListQuery, RefreshSequencer, TaskEdit, TaskStore, ToolClient, ToolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message produced by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "{prefix}: {}", self.message)
    }
}

/// A precondition that failed before anything was sent to the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Select at least one task first.")]
    EmptySelection,
    #[error("Task {0} is not in the current view. Refresh and try again.")]
    UnknownTask(String),
    #[error("Task {0} is still being updated. Wait for the previous change to finish.")]
    MutationInFlight(String),
    #[error("{0}")]
    Gesture(#[from] GestureError),
}

/// Per-task results of a bulk status change or delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    /// Task id and the store's message
    pub failed: Vec<(String, String)>,
}

/// Marks tasks as having a mutation on the wire until dropped
struct InFlight<'s> {
    set: &'s RefCell<HashSet<String>>,
    ids: Vec<String>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.borrow_mut();
        for id in &self.ids {
            set.remove(id);
        }
    }
}

pub struct Session<C> {
    store: TaskStore<C>,
    tree: RefCell<TaskTree>,
    loaded: Cell<bool>,
    prefs: RefCell<ViewPrefs>,
    selection: RefCell<Selection>,
    profiles: RefCell<IndexMap<String, FilterCriteria>>,
    gesture: RefCell<DragGesture>,
    in_flight: RefCell<HashSet<String>>,
    notices: RefCell<Vec<Notice>>,
    sequencer: RefreshSequencer,
}

impl<C: ToolClient> Session<C> {
    pub fn new(client: C) -> Self {
        Session::from_state(client, UiState::default())
    }

    /// Start from persisted preferences, selection and profiles
    pub fn from_state(client: C, state: UiState) -> Self {
        Session {
            store: TaskStore::new(client),
            tree: RefCell::new(TaskTree::default()),
            loaded: Cell::new(false),
            prefs: RefCell::new(state.prefs),
            selection: RefCell::new(state.selection),
            profiles: RefCell::new(state.profiles),
            gesture: RefCell::new(DragGesture::new()),
            in_flight: RefCell::new(HashSet::new()),
            notices: RefCell::new(Vec::new()),
            sequencer: RefreshSequencer::new(),
        }
    }

    /// Everything the host should persist between runs
    pub fn to_state(&self) -> UiState {
        UiState {
            prefs: self.prefs.borrow().clone(),
            selection: self.selection.borrow().clone(),
            profiles: self.profiles.borrow().clone(),
        }
    }

    pub fn store(&self) -> &TaskStore<C> {
        &self.store
    }

    pub fn tree(&self) -> Ref<'_, TaskTree> {
        self.tree.borrow()
    }

    pub fn prefs(&self) -> Ref<'_, ViewPrefs> {
        self.prefs.borrow()
    }

    pub fn selection(&self) -> Ref<'_, Selection> {
        self.selection.borrow()
    }

    pub fn drag_state(&self) -> DragState {
        self.gesture.borrow().state().clone()
    }

    /// True once any refresh has been applied
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn update_prefs(&self, f: impl FnOnce(&mut ViewPrefs)) {
        f(&mut self.prefs.borrow_mut());
    }

    /// Take every notice produced since the last call
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.borrow_mut())
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.borrow_mut().push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Surface a failed precondition as a warning
    fn surface<T>(&self, result: Result<T, ValidationError>) -> Result<T, ValidationError> {
        if let Err(err) = &result {
            debug!(error = %err, "operation rejected before any remote call");
            self.notify(NoticeLevel::Warning, err.to_string());
        }
        result
    }

    fn title_of(&self, id: &str) -> String {
        self.tree
            .borrow()
            .get(id)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| id.to_string())
    }

    // -----------------------------------------------------------------------
    // Refresh and rendering
    // -----------------------------------------------------------------------

    /// Fetch the task list and rebuild the tree.
    ///
    /// Returns true when this response was applied. A response that arrives
    /// after a newer one is dropped, and so is a failure that arrives after a
    /// newer success. Otherwise a failed fetch keeps the previous tree and
    /// produces an error notice.
    pub async fn refresh(&self) -> bool {
        let ticket = self.sequencer.issue();
        match self.store.list_tasks(&ListQuery::default()).await {
            Ok(events) => {
                if !self.sequencer.accept(ticket) {
                    return false;
                }
                let tree = TaskTree::from_events(events);
                info!(tasks = tree.len(), roots = tree.roots().len(), "task tree refreshed");
                self.selection.borrow_mut().retain_live(&tree);
                *self.tree.borrow_mut() = tree;
                self.loaded.set(true);
                true
            }
            Err(err) if self.sequencer.is_superseded(ticket) => {
                debug!(error = %err, "stale refresh failed after a newer one was applied");
                false
            }
            Err(err) => {
                warn!(error = %err, "refresh failed; keeping last known tasks");
                self.notify(NoticeLevel::Error, format!("Could not load tasks: {err}"));
                false
            }
        }
    }

    pub fn render(&self, today: NaiveDate) -> RenderedView {
        render::render(
            &self.tree.borrow(),
            &self.prefs.borrow(),
            &self.selection.borrow(),
            today,
        )
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Apply a click to the selection. Range clicks span the order the view
    /// currently renders for `today`.
    pub fn select(&self, id: &str, mods: ClickMods, today: NaiveDate) -> Result<(), ValidationError> {
        if !self.tree.borrow().contains(id) {
            return self.surface(Err(ValidationError::UnknownTask(id.to_string())));
        }
        let order = self.render(today).order;
        self.selection.borrow_mut().select(id, mods, &order);
        Ok(())
    }

    pub fn clear_selection(&self) {
        self.selection.borrow_mut().clear();
    }

    // -----------------------------------------------------------------------
    // Filter profiles
    // -----------------------------------------------------------------------

    /// Save the active filter under `name`, replacing a profile of that name
    pub fn save_profile(&self, name: &str) {
        let criteria = self.prefs.borrow().filter.clone();
        info!(profile = name, "filter profile saved");
        self.profiles.borrow_mut().insert(name.trim().to_string(), criteria);
    }

    /// Make the named profile the active filter
    pub fn apply_profile(&self, name: &str) -> bool {
        let found = self.profiles.borrow().get(name.trim()).cloned();
        match found {
            Some(criteria) => {
                self.prefs.borrow_mut().filter = criteria;
                true
            }
            None => {
                self.notify(NoticeLevel::Warning, format!("No saved filter named \"{name}\"."));
                false
            }
        }
    }

    pub fn delete_profile(&self, name: &str) -> bool {
        self.profiles.borrow_mut().shift_remove(name.trim()).is_some()
    }

    pub fn profiles(&self) -> Vec<(String, FilterCriteria)> {
        self.profiles
            .borrow()
            .iter()
            .map(|(name, criteria)| (name.clone(), criteria.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    fn begin_mutation(&self, ids: Vec<String>) -> Result<InFlight<'_>, ValidationError> {
        let mut set = self.in_flight.borrow_mut();
        if let Some(busy) = ids.iter().find(|id| set.contains(id.as_str())) {
            return Err(ValidationError::MutationInFlight(busy.clone()));
        }
        set.extend(ids.iter().cloned());
        Ok(InFlight {
            set: &self.in_flight,
            ids,
        })
    }

    fn ensure_idle(&self, ids: &[String]) -> Result<(), ValidationError> {
        let set = self.in_flight.borrow();
        match ids.iter().find(|id| set.contains(id.as_str())) {
            Some(busy) => Err(ValidationError::MutationInFlight(busy.clone())),
            None => Ok(()),
        }
    }

    fn live_tasks(&self, ids: &[String]) -> Result<Vec<Task>, ValidationError> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        let tree = self.tree.borrow();
        ids.iter()
            .map(|id| {
                tree.get(id)
                    .cloned()
                    .ok_or_else(|| ValidationError::UnknownTask(id.clone()))
            })
            .collect()
    }

    /// Selected ids that still resolve to live tasks
    fn selected_live_ids(&self) -> Result<Vec<String>, ValidationError> {
        let tree = self.tree.borrow();
        let ids: Vec<String> = self
            .selection
            .borrow()
            .resolve(&tree)
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(ids)
    }

    /// Begin dragging the given tasks
    pub fn start_drag(&self, ids: &[String]) -> Result<(), ValidationError> {
        let result = self.live_tasks(ids).and_then(|tasks| {
            self.ensure_idle(ids)?;
            let payload = DragPayload::from_tasks(tasks).ok_or(ValidationError::EmptySelection)?;
            let mut gesture = self.gesture.borrow_mut();
            let abandoned = match gesture.state() {
                DragState::AwaitingServerDecision(requests) => {
                    let in_flight = self.in_flight.borrow();
                    !requests.iter().any(|r| in_flight.contains(&r.task_id))
                }
                _ => false,
            };
            if abandoned {
                // The previous drop lost its future before the answer arrived
                gesture.cancel();
            }
            gesture.start(payload)?;
            Ok(())
        });
        self.surface(result)
    }

    pub fn cancel_drag(&self) {
        self.gesture.borrow_mut().cancel();
    }

    /// Drop the dragged tasks on `target` and wait for the store's decision.
    ///
    /// A task or the canvas changes parents; a status, priority or project
    /// group header changes that field. Requests go out one at a time. The tree is refreshed afterwards
    /// whether or not every request succeeded, and a notice is produced for
    /// each rejected task only.
    pub async fn drop_on(&self, target: DropTarget) -> Result<DragState, ValidationError> {
        if let DropTarget::Task(id) = &target
            && !self.tree.borrow().contains(id)
        {
            return self.surface(Err(ValidationError::UnknownTask(id.clone())));
        }
        let requests = self.gesture.borrow_mut().drop_on(&target);
        let requests = self.surface(requests.map_err(ValidationError::from))?;
        if requests.is_empty() {
            debug!("drop produced no changes");
            return Ok(DragState::Idle);
        }

        let ids: Vec<String> = requests.iter().map(|r| r.task_id.clone()).collect();
        let guard = match self.begin_mutation(ids) {
            Ok(guard) => guard,
            Err(err) => {
                self.gesture.borrow_mut().cancel();
                return self.surface(Err(err));
            }
        };

        let mut results = Vec::with_capacity(requests.len());
        for request in &requests {
            let outcome = self.apply_drop(request).await.map_err(|err| rejection_of(&err));
            match &outcome {
                Ok(()) => info!(task = %request.task_id, change = ?request.change, "drop applied"),
                Err(kind) => warn!(task = %request.task_id, reason = ?kind, "drop rejected"),
            }
            results.push((request.task_id.clone(), outcome));
        }
        drop(guard);

        let resolved = self.gesture.borrow_mut().resolve(results).map(DragState::clone);
        let state = match resolved {
            Ok(state) => {
                self.report_drop(&state);
                state
            }
            Err(_) => {
                // Cancelled while waiting: the answer is discarded
                debug!("drop resolved after the gesture was cancelled");
                DragState::Idle
            }
        };
        self.refresh().await;
        Ok(state)
    }

    async fn apply_drop(&self, request: &DropRequest) -> Result<(), ToolError> {
        let id = request.task_id.as_str();
        match &request.change {
            DropChange::Parent(parent) => self.store.change_parent(id, parent.as_deref()).await,
            DropChange::Status(status) => self.store.update_status(id, *status).await,
            DropChange::Priority(priority) => {
                let edit = TaskEdit {
                    priority: Some(*priority),
                    ..Default::default()
                };
                self.store.edit_task(id, &edit).await
            }
            DropChange::Project(project) => {
                let edit = TaskEdit {
                    project_id: Some(project.clone().unwrap_or_default()),
                    ..Default::default()
                };
                self.store.edit_task(id, &edit).await
            }
        }
    }

    /// Start a drag of `ids` and drop it on `target` in one step
    pub async fn move_tasks(&self, ids: &[String], target: DropTarget) -> Result<DragState, ValidationError> {
        self.start_drag(ids)?;
        let result = self.drop_on(target).await;
        if result.is_err() {
            self.cancel_drag();
        }
        result
    }

    fn report_drop(&self, state: &DragState) {
        let outcome = match state {
            DragState::Applied(outcome) | DragState::Rejected(outcome) => outcome,
            _ => return,
        };
        if !outcome.applied.is_empty() {
            self.notify(NoticeLevel::Info, format!("Moved {}.", count(outcome.applied.len())));
        }
        for (id, kind) in &outcome.rejected {
            let title = self.title_of(id);
            self.notify(
                NoticeLevel::Error,
                format!("Could not move \"{title}\": {}", kind.user_message()),
            );
        }
    }

    /// Set the status of every selected task
    pub async fn bulk_set_status(&self, status: TaskStatus) -> Result<BulkOutcome, ValidationError> {
        let ids = self.surface(self.selected_live_ids())?;
        let guard = self.surface(self.begin_mutation(ids.clone()))?;

        let mut outcome = BulkOutcome::default();
        for id in &ids {
            match self.store.update_status(id, status).await {
                Ok(()) => outcome.succeeded.push(id.clone()),
                Err(err) => {
                    warn!(task = %id, error = %err, "status change failed");
                    outcome.failed.push((id.clone(), err.to_string()));
                }
            }
        }
        drop(guard);

        self.report_bulk(&outcome, "Updated", "update");
        self.refresh().await;
        Ok(outcome)
    }

    /// Delete every selected task
    pub async fn bulk_delete(&self) -> Result<BulkOutcome, ValidationError> {
        let ids = self.surface(self.selected_live_ids())?;
        let guard = self.surface(self.begin_mutation(ids.clone()))?;

        let mut outcome = BulkOutcome::default();
        for id in &ids {
            match self.store.delete_task(id).await {
                Ok(()) => outcome.succeeded.push(id.clone()),
                Err(err) => {
                    warn!(task = %id, error = %err, "delete failed");
                    outcome.failed.push((id.clone(), err.to_string()));
                }
            }
        }
        drop(guard);

        self.report_bulk(&outcome, "Deleted", "delete");
        self.refresh().await;
        Ok(outcome)
    }

    fn report_bulk(&self, outcome: &BulkOutcome, done: &str, verb: &str) {
        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk {verb} finished"
        );
        if !outcome.succeeded.is_empty() {
            self.notify(
                NoticeLevel::Info,
                format!("{done} {}.", count(outcome.succeeded.len())),
            );
        }
        for (id, message) in &outcome.failed {
            let title = self.title_of(id);
            self.notify(
                NoticeLevel::Error,
                format!("Could not {verb} \"{title}\": {message}"),
            );
        }
    }
}

fn count(n: usize) -> String {
    if n == 1 {
        "1 task".to_string()
    } else {
        format!("{n} tasks")
    }
}

/// Store errors during a reparent become a classified rejection
fn rejection_of(err: &ToolError) -> RejectionKind {
    match err {
        ToolError::Rejected { message } => RejectionKind::classify(message),
        other => RejectionKind::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejection_classification_from_tool_errors() {
        assert_eq!(
            rejection_of(&ToolError::Rejected {
                message: "circular dependency".into()
            }),
            RejectionKind::CircularDependency
        );
        assert_eq!(
            rejection_of(&ToolError::Transport("broken pipe".into())),
            RejectionKind::Other("task store unreachable: broken pipe".into())
        );
    }

    #[test]
    fn notice_display() {
        let notice = Notice {
            level: NoticeLevel::Warning,
            message: "Select at least one task first.".into(),
        };
        assert_eq!(notice.to_string(), "warning: Select at least one task first.");
    }

    #[test]
    fn counts() {
        assert_eq!(count(1), "1 task");
        assert_eq!(count(3), "3 tasks");
    }
}
