use serde::{Deserialize, Serialize};

use crate::model::view::{GroupStrategy, HierarchyMode, SortField, SortSpec};

/// Configuration from gorev-tree.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

/// How to launch the task store's tool server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Per-request timeout of the transport
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            command: default_command(),
            args: default_args(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_command() -> String {
    "gorev".to_string()
}

fn default_args() -> Vec<String> {
    vec!["serve".to_string()]
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "gorev_tree=debug"
    #[serde(default)]
    pub level: Option<String>,
}

/// Defaults for a fresh view, before any preference was remembered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub grouping: GroupStrategy,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default = "default_true")]
    pub ascending: bool,
    #[serde(default)]
    pub hierarchy: HierarchyMode,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            grouping: GroupStrategy::default(),
            sort: SortField::default(),
            ascending: true,
            hierarchy: HierarchyMode::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl ViewConfig {
    pub fn sort_spec(&self) -> SortSpec {
        SortSpec {
            field: self.sort,
            ascending: self.ascending,
        }
    }
}
