use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::model::task::Task;
use crate::ops::hierarchy::TaskTree;

/// Selected task ids plus the anchor used for range selection.
///
/// Independent of tree shape: it survives refreshes and is re-resolved
/// against the new task set by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    selected: IndexSet<String>,
    #[serde(default)]
    anchor: Option<String>,
}

/// Modifier state of a click
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickMods {
    /// ctrl/cmd: toggle membership
    pub additive: bool,
    /// shift: extend from the anchor
    pub range: bool,
}

impl Selection {
    pub fn new() -> Self {
        Selection::default()
    }

    /// Apply a click on `id`.
    ///
    /// `order` is the currently rendered task order; range selection spans
    /// it, not the raw tree. A range click without a usable anchor acts as a
    /// plain click.
    pub fn select(&mut self, id: &str, mods: ClickMods, order: &[String]) {
        if mods.range
            && let Some(span) = self.span_to(id, order)
        {
            if !mods.additive {
                self.selected.clear();
            }
            self.selected.extend(span);
            return;
        }

        if mods.additive {
            if !self.selected.shift_remove(id) {
                self.selected.insert(id.to_string());
            }
            if self.anchor.is_none() {
                self.anchor = Some(id.to_string());
            }
            return;
        }

        self.selected.clear();
        self.selected.insert(id.to_string());
        self.anchor = Some(id.to_string());
    }

    /// Ids from the anchor to `id` inclusive, in rendered order
    fn span_to(&self, id: &str, order: &[String]) -> Option<Vec<String>> {
        let anchor = self.anchor.as_deref()?;
        let from = order.iter().position(|o| o == anchor)?;
        let to = order.iter().position(|o| o == id)?;
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        Some(order[lo..=hi].to_vec())
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Selected ids in selection order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Forget ids that are no longer in `tree`
    pub fn retain_live(&mut self, tree: &TaskTree) {
        self.selected.retain(|id| tree.contains(id));
        if self.anchor.as_deref().is_some_and(|a| !tree.contains(a)) {
            self.anchor = None;
        }
    }

    /// Resolve the selection to live task records
    pub fn resolve<'a>(&self, tree: &'a TaskTree) -> Vec<&'a Task> {
        self.selected.iter().filter_map(|id| tree.get(id)).collect()
    }
}
