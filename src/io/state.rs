use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::view::{FilterCriteria, ViewPrefs};
use crate::ops::selection::Selection;

pub const STATE_FILE: &str = ".state.json";

/// Persisted view state (written to .state.json)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    /// Filter, grouping, sort and expansion choices
    #[serde(default)]
    pub prefs: ViewPrefs,
    /// Selected ids and the range anchor
    #[serde(default)]
    pub selection: Selection,
    /// Saved filter profiles, in creation order
    #[serde(default)]
    pub profiles: IndexMap<String, FilterCriteria>,
}

pub fn state_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILE)
}

/// Read .state.json from the state directory. Missing or malformed files
/// read as `None` so the caller falls back to defaults.
pub fn read_ui_state(state_dir: &Path) -> Option<UiState> {
    let content = fs::read_to_string(state_path(state_dir)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write .state.json to the state directory, creating it if needed
pub fn write_ui_state(state_dir: &Path, state: &UiState) -> io::Result<()> {
    fs::create_dir_all(state_dir)?;
    let content = serde_json::to_string_pretty(state)?;
    atomic_write(&state_path(state_dir), content.as_bytes())
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskStatus;
    use crate::model::view::GroupStrategy;
    use crate::ops::selection::ClickMods;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut state = UiState::default();
        state.prefs.set_grouping(GroupStrategy::ByPriority);
        state.prefs.toggle_group("low");
        state.prefs.toggle_task("t-9");
        state.prefs.filter.search_text = Some("deploy".into());
        state.selection.select("t-1", ClickMods::default(), &[]);
        state.profiles.insert(
            "open work".into(),
            FilterCriteria {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        );

        write_ui_state(dir.path(), &state).unwrap();
        let loaded = read_ui_state(dir.path()).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.selection.anchor(), Some("t-1"));
    }

    #[test]
    fn creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        write_ui_state(&nested, &UiState::default()).unwrap();
        assert!(state_path(&nested).exists());
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STATE_FILE), "not json {{{").unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn serde_defaults_on_minimal_object() {
        let state: UiState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, UiState::default());

        let state: UiState =
            serde_json::from_str(r#"{"prefs":{"grouping":"by-tag"}}"#).unwrap();
        assert_eq!(state.prefs.grouping, GroupStrategy::ByTag);
        assert!(state.profiles.is_empty());
    }
}
