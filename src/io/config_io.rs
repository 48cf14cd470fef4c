use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::io::state::atomic_write;
use crate::model::config::Config;
use crate::model::view::ViewPrefs;

pub const CONFIG_FILE: &str = "gorev-tree.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {CONFIG_FILE}: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit {CONFIG_FILE}: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
}

pub fn config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE)
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing. A missing file yields
/// defaults and an empty document.
pub fn read_config(state_dir: &Path) -> Result<(Config, toml_edit::DocumentMut), ConfigError> {
    let path = config_path(state_dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(source) => return Err(ConfigError::ReadError { path, source }),
    };
    let config: Config = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(state_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    fs::create_dir_all(state_dir)?;
    atomic_write(&config_path(state_dir), doc.to_string().as_bytes())?;
    Ok(())
}

/// Store the grouping, sort and hierarchy choices of `prefs` as the
/// `[view]` defaults. Other keys and comments are left untouched.
pub fn set_view_defaults(doc: &mut toml_edit::DocumentMut, prefs: &ViewPrefs) {
    if !doc.contains_key("view") {
        doc["view"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    if let Some(name) = serde_name(&prefs.grouping) {
        doc["view"]["grouping"] = toml_edit::value(name);
    }
    if let Some(name) = serde_name(&prefs.sort.field) {
        doc["view"]["sort"] = toml_edit::value(name);
    }
    doc["view"]["ascending"] = toml_edit::value(prefs.sort.ascending);
    if let Some(name) = serde_name(&prefs.hierarchy) {
        doc["view"]["hierarchy"] = toml_edit::value(name);
    }
}

/// The name a unit enum variant serializes to
fn serde_name<T: Serialize>(value: &T) -> Option<String> {
    toml::Value::try_from(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
}
