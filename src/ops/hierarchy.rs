use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::model::task::Task;
use crate::parse::TaskEvent;

/// Completed and total descendants of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Assign `parent_id` from the nesting depth of each event.
///
/// A stack holds the most recent task seen at each shallower depth; a task
/// at depth 0 is always a root. Tasks keep their order of appearance.
pub fn link_by_depth(events: Vec<TaskEvent>) -> Vec<Task> {
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut tasks = Vec::with_capacity(events.len());

    for TaskEvent { depth, mut task } in events {
        while stack.last().is_some_and(|(d, _)| *d >= depth) {
            stack.pop();
        }
        task.parent_id = match stack.last() {
            Some((_, parent)) if depth > 0 => Some(parent.clone()),
            _ => None,
        };
        stack.push((depth, task.id.clone()));
        tasks.push(task);
    }
    tasks
}

/// Arena of tasks keyed by id, with derived parent/child links.
///
/// Children are id lists recomputed on every build, never back-pointers.
/// A `parent_id` that is missing from the set, points at the task itself or
/// closes a cycle is not followed: that task becomes a root.
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    tasks: IndexMap<String, Task>,
    parents: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
    progress: HashMap<String, Progress>,
}

impl TaskTree {
    /// Build from a listing whose nesting is expressed by depth
    pub fn from_events(events: Vec<TaskEvent>) -> TaskTree {
        TaskTree::build(link_by_depth(events))
    }

    /// Build from tasks whose `parent_id` is already set
    pub fn build(input: Vec<Task>) -> TaskTree {
        let mut tasks: IndexMap<String, Task> = IndexMap::with_capacity(input.len());
        for task in input {
            if tasks.contains_key(&task.id) {
                debug!(id = %task.id, "ignoring duplicate task");
                continue;
            }
            tasks.insert(task.id.clone(), task);
        }

        let parents = resolve_parents(&tasks);

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut roots = Vec::new();
        for id in tasks.keys() {
            match parents.get(id) {
                Some(parent) => children.entry(parent.clone()).or_default().push(id.clone()),
                None => roots.push(id.clone()),
            }
        }

        let mut tree = TaskTree {
            tasks,
            parents,
            children,
            roots,
            progress: HashMap::new(),
        };
        tree.progress = tree.compute_progress();
        tree
    }

    /// Iterative post-order over the forest. The visited set guarantees
    /// termination even if the links were somehow inconsistent.
    fn compute_progress(&self) -> HashMap<String, Progress> {
        let mut progress: HashMap<String, Progress> = HashMap::with_capacity(self.tasks.len());
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.tasks.len());
        let mut stack: Vec<(&str, bool)> = self.roots.iter().rev().map(|r| (r.as_str(), false)).collect();

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                let mut sum = Progress::default();
                for child in self.children(id) {
                    let below = progress.get(child.as_str()).copied().unwrap_or_default();
                    let done = self.tasks.get(child).is_some_and(Task::is_completed);
                    sum.total += 1 + below.total;
                    sum.completed += usize::from(done) + below.completed;
                }
                progress.insert(id.to_string(), sum);
                continue;
            }
            if !visited.insert(id) {
                warn!(id, "task reached twice during progress pass");
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).iter().rev() {
                stack.push((child.as_str(), false));
            }
        }
        progress
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All tasks in source order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Children of `id` in source order
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map_or(&[], Vec::as_slice)
    }

    /// Effective parent, after dangling and cyclic links were cut
    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    pub fn progress(&self, id: &str) -> Progress {
        self.progress.get(id).copied().unwrap_or_default()
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        std::iter::successors(self.parent(id), move |p| self.parent(p))
    }

    /// All descendants of `id` in depth-first source order
    pub fn descendants(&self, id: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self.children(id).iter().rev().map(String::as_str).collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().map(String::as_str));
        }
        out
    }
}

/// Resolve each task's effective parent.
///
/// Walks up from every task, remembering the current path. Re-entering the
/// path means a cycle: the task where the walk re-entered is cut loose and
/// becomes a root. Resolved tasks are never walked again.
fn resolve_parents(tasks: &IndexMap<String, Task>) -> HashMap<String, String> {
    let mut parents: HashMap<String, String> = HashMap::new();
    let mut resolved: HashSet<&str> = HashSet::with_capacity(tasks.len());

    for start in tasks.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut cursor = start.as_str();

        loop {
            if resolved.contains(cursor) {
                break;
            }
            if !on_path.insert(cursor) {
                warn!(id = cursor, "parent cycle detected; treating task as root");
                parents.remove(cursor);
                break;
            }
            path.push(cursor);

            let declared = tasks.get(cursor).and_then(|t| t.parent_id.as_deref());
            match declared {
                Some(parent) if parent != cursor && tasks.contains_key(parent) => {
                    parents.insert(cursor.to_string(), parent.to_string());
                    cursor = parent;
                }
                Some(parent) => {
                    debug!(id = cursor, parent, "parent link not followed; treating task as root");
                    break;
                }
                None => break,
            }
        }
        resolved.extend(path);
    }
    parents
}
