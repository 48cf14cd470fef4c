//! Boundary to the remote task store.
//!
//! The store is reached through a call-and-response tool interface: a tool
//! name plus a JSON argument map in, opaque text (or a typed error) out.

pub mod mcp;
pub mod refresh;
pub mod store;

use serde_json::Value;

pub use mcp::McpClient;
pub use refresh::{RefreshSequencer, Ticket};
pub use store::{ListQuery, NewTask, TaskEdit, TaskStore};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// The store could not be reached: spawn failure, closed pipe, timeout
    #[error("task store unreachable: {0}")]
    Transport(String),
    /// The store answered with an error for this call
    #[error("{message}")]
    Rejected { message: String },
    /// The store answered with something that is not a valid frame
    #[error("malformed response from task store: {0}")]
    Protocol(String),
}

impl ToolError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ToolError::Transport(_))
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Protocol(err.to_string())
    }
}

/// A tool-call connection to the task store.
///
/// Implementations must tolerate overlapping calls from one task; the
/// session issues refreshes concurrently and relies on sequencing, not on
/// the transport, to discard stale answers.
#[allow(async_fn_in_trait)]
pub trait ToolClient {
    async fn call_tool(&self, name: &str, args: Value) -> Result<String, ToolError>;
}
