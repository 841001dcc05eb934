//! Error types for questlog
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown quest, key not claimable)
//! - 4: Operation failed (io, corrupt store)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the questlog CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for questlog operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store not initialized at {0} (run `questlog init`)")]
    StoreNotFound(PathBuf),

    #[error("Unknown quest or claim key: {0}")]
    UnknownClaimKey(String),

    #[error("Not claimable: {key} ({reason})")]
    NotClaimable { key: String, reason: String },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::StoreNotFound(_)
            | Error::UnknownClaimKey(_)
            | Error::NotClaimable { .. } => exit_codes::USER_ERROR,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured detail payload for JSON error output, when one exists.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotClaimable { key, reason } => Some(serde_json::json!({
                "key": key,
                "reason": reason,
            })),
            _ => None,
        }
    }
}

/// Result type alias for questlog operations
pub type Result<T> = std::result::Result<T, Error>;
