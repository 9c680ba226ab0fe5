//! Error types for the control library
use thiserror::Error;

/// Control library errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Standard IO error (socket bind, send, file access)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/Deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid domain model value (MAC, channel)
    #[error(transparent)]
    ModelError(#[from] wizflow_core::ModelError),

    /// Bulb store failure
    #[error("store error: {0}")]
    StoreError(String),

    /// Bridge engine failure
    #[error("bridge error: {0}")]
    BridgeError(String),

    /// Supervisor failure
    #[error("supervisor error: {0}")]
    SupervisorError(String),
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
