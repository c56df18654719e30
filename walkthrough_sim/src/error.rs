//! Error types for the walkthrough simulator.

use thiserror::Error;
use walkthrough_core::GraphError;
use walkthrough_env::EnvError;

/// Errors that can stop a simulation run before it produces a result.
#[derive(Debug, Error)]
pub enum SimError {
    /// Reading a graph/options file or writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph input could not be loaded
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The recording rig rejected a pose
    #[error(transparent)]
    Env(#[from] EnvError),

    /// Options file or export (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
