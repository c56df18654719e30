//! Error types for the walkthrough host abstraction.

use thiserror::Error;

/// Errors that can occur at the host/engine boundary.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The host tried to place the camera with NaN or infinite values
    #[error("Invalid pose: {0}")]
    InvalidPose(String),
}

impl EnvError {
    /// Creates an invalid-pose error.
    pub fn invalid_pose(msg: impl Into<String>) -> Self {
        Self::InvalidPose(msg.into())
    }
}
