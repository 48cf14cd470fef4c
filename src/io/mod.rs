pub mod config_io;
pub mod state;

use std::path::{Path, PathBuf};

/// Default state directory, relative to the working directory
pub const DEFAULT_STATE_DIR: &str = ".gorev-tree";

/// The directory holding gorev-tree.toml and .state.json
pub fn resolve_state_dir(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(DEFAULT_STATE_DIR),
    }
}
