//! # EAI Error Types
//!
//! All errors that can occur at the EAI surface.

use thiserror::Error;

use eai_core::FieldError;

/// Errors that can occur in the EAI layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EaiError {
    /// A field access failed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The named field is missing or cannot receive events.
    #[error("invalid eventIn: {0}")]
    InvalidEventIn(String),

    /// The named field is missing or cannot send events.
    #[error("invalid eventOut: {0}")]
    InvalidEventOut(String),

    /// No node is registered under this name.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A dispatcher worker thread could not be started.
    #[error("failed to spawn dispatcher thread: {0}")]
    ThreadSpawn(String),

    /// The session has been disposed.
    #[error("EAI session has been disposed")]
    Disposed,
}

/// Result type for EAI operations.
pub type EaiResult<T> = Result<T, EaiError>;
