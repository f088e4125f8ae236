//! Error types for taskbox
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad import payload, unknown entity)
//! - 4: Operation failed (I/O, flush, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskbox CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskbox operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Import payload rejected: {0}")]
    ParseFailure(String),

    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: &'static str, id: String },

    // Operation failures (exit code 4)
    #[error("Collection '{0}' is not open")]
    NotInitialized(String),

    #[error("Record '{key}' could not be decoded: {reason}")]
    DecodeFailure { key: String, reason: String },

    #[error("Flush failed for collection '{collection}': {reason}")]
    FlushFailure { collection: String, reason: String },

    #[error("Auto-save scheduler unavailable: {0}")]
    SchedulerUnavailable(String),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::ParseFailure(_)
            | Error::EntityNotFound { .. } => exit_codes::USER_ERROR,

            Error::NotInitialized(_)
            | Error::DecodeFailure { .. }
            | Error::FlushFailure { .. }
            | Error::SchedulerUnavailable(_)
            | Error::LockFailed(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the variant carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::EntityNotFound { kind, id } => {
                Some(serde_json::json!({ "kind": kind, "id": id }))
            }
            Error::DecodeFailure { key, .. } => Some(serde_json::json!({ "key": key })),
            Error::FlushFailure { collection, .. } => {
                Some(serde_json::json!({ "collection": collection }))
            }
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for taskbox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
