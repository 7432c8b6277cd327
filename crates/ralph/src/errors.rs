use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that can occur while executing a tool. These are never raised to
/// the model-calling loop; their Display form is returned as the tool result
/// string so the model can observe the failure and react to it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Workdir not found")]
    MissingWorkdir,

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Fatal configuration failures, raised before any loop iteration begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing required credential: {0}")]
    MissingCredential(String),
}
