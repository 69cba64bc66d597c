//! Error handling for tabsync.
//!
//! This module provides:
//! - [`SyncError`]: The main error enum for all tabsync operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Serializable error for robot mode output

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for tabsync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("No remote configured for table: {0}")]
    UnknownTable(String),

    #[error("Invalid remote locator: {0}")]
    InvalidLocator(String),

    #[error("Remote request failed: {0}")]
    Http(String),

    #[error("Remote rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Remote rejected request ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),
}

impl SyncError {
    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::TableExists(_) => ErrorCode::TableExists,
            Self::TableNotFound(_) => ErrorCode::TableNotFound,
            Self::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            Self::UnknownTable(_) => ErrorCode::UnknownTable,
            Self::InvalidLocator(_) => ErrorCode::LocatorInvalid,
            Self::Http(_) => ErrorCode::NetworkUnreachable,
            Self::RateLimited(_) => ErrorCode::RateLimited,
            Self::Remote { status: 401 | 403, .. } | Self::Credentials(_) => ErrorCode::AuthFailed,
            Self::Remote { .. } => ErrorCode::RemoteRejected,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::TableExists(table) | Self::TableNotFound(table) | Self::UnknownTable(table) => {
                Some(serde_json::json!({ "table": table }))
            }
            Self::InvalidIdentifier { name, reason } => {
                Some(serde_json::json!({ "name": name, "reason": reason }))
            }
            Self::Remote { status, .. } => Some(serde_json::json!({ "status": status })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_sync_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "RATE_LIMITED")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 504)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    pub recoverable: bool,

    /// Error category (e.g., "table", "config", "remote")
    pub category: String,
}

impl StructuredError {
    #[must_use]
    pub fn from_sync_error(err: &SyncError) -> Self {
        let code = err.code();
        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion: code.suggestion().to_string(),
            context: err.context(),
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&SyncError> for StructuredError {
    fn from(err: &SyncError) -> Self {
        Self::from_sync_error(err)
    }
}

/// Result type alias using SyncError.
pub type Result<T> = std::result::Result<T, SyncError>;
