//! Error types for lockorder-analysis
//!
//! Provides unified error handling across the crate. A detected deadlock is
//! an analysis outcome, not an error; see `DetectionStatus`.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for lock-order analysis
#[derive(Debug, Error)]
pub enum LockOrderError {
    /// A lockset entry has no number in the lock table
    #[error("Lock '{0}' is not registered in the lock table")]
    UnknownLock(String),

    /// Section id out of range for the analysis context
    #[error("Critical section #{0} does not exist")]
    UnknownSection(usize),

    /// Group id out of range for the analysis context
    #[error("Critical section group #{0} does not exist")]
    UnknownGroup(usize),

    /// Context violates a data model invariant
    #[error("Invalid analysis context: {0}")]
    InvalidContext(String),

    /// Program model references something that was never declared
    #[error("Invalid program model: {0}")]
    InvalidModel(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LockOrderError {
    /// Create an invalid context error
    pub fn invalid_context(msg: impl Into<String>) -> Self {
        LockOrderError::InvalidContext(msg.into())
    }

    /// Create an invalid model error
    pub fn invalid_model(msg: impl Into<String>) -> Self {
        LockOrderError::InvalidModel(msg.into())
    }
}

/// Result type alias for lock-order operations
pub type Result<T> = std::result::Result<T, LockOrderError>;
