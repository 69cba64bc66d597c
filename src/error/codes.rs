//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Table errors
//! - 3xx: Config errors
//! - 5xx: Remote errors
//! - 6xx: Storage errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `TableExists` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Table errors (1xx)
    // ========================================
    /// E101: Local table already exists
    TableExists,
    /// E102: Local table does not exist
    TableNotFound,
    /// E103: Table or column name cannot be used as an identifier
    InvalidIdentifier,
    /// E104: Table name has no configured remote locator
    UnknownTable,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,
    /// E305: Remote locator cannot be parsed
    LocatorInvalid,

    // ========================================
    // Remote errors (5xx)
    // ========================================
    /// E501: Cannot reach the remote document store
    NetworkUnreachable,
    /// E503: Authentication with the remote store failed
    AuthFailed,
    /// E504: Remote store rejected the request rate
    RateLimited,
    /// E505: Remote store answered with an error status
    RemoteRejected,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E601: SQLite reported an error
    DatabaseError,
    /// E602: Filesystem error
    IoError,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Serialization or deserialization failed
    SerializationError,
}

impl ErrorCode {
    /// Numeric form of the code.
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::TableExists => 101,
            Self::TableNotFound => 102,
            Self::InvalidIdentifier => 103,
            Self::UnknownTable => 104,
            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,
            Self::LocatorInvalid => 305,
            Self::NetworkUnreachable => 501,
            Self::AuthFailed => 503,
            Self::RateLimited => 504,
            Self::RemoteRejected => 505,
            Self::DatabaseError => 601,
            Self::IoError => 602,
            Self::SerializationError => 901,
        }
    }

    /// Code as printed in messages, e.g. `E504`.
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Short recovery hint.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::TableExists => "Use `refresh` to repopulate it, or `reset` to rebuild the schema",
            Self::TableNotFound => "Run `init` for this table first",
            Self::InvalidIdentifier => "Rename the offending header cell in the spreadsheet",
            Self::UnknownTable => "Add a [tables.<name>] section with a locator to the config",
            Self::ConfigInvalid => "Check the config file syntax",
            Self::ConfigMissingRequired => "Add the missing value to the config file",
            Self::LocatorInvalid => "Use the full spreadsheet URL or its bare document id",
            Self::NetworkUnreachable => "Check network connectivity and the remote base_url",
            Self::AuthFailed => "Refresh the access token referenced by [remote].credentials",
            Self::RateLimited => "Wait for the quota window to reset, or raise the pacing interval",
            Self::RemoteRejected => "Inspect the remote error message; the document may be protected",
            Self::DatabaseError => "Check the database path and that no other process holds a lock",
            Self::IoError => "Check file permissions",
            Self::SerializationError => "The remote answered with an unexpected payload",
        }
    }

    /// Whether retrying later (or fixing input) can resolve the error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DatabaseError | Self::SerializationError)
    }

    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "table",
            3 => "config",
            5 => "remote",
            6 => "storage",
            _ => "internal",
        }
    }

    /// Every code, in numeric order.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::TableExists,
            Self::TableNotFound,
            Self::InvalidIdentifier,
            Self::UnknownTable,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::LocatorInvalid,
            Self::NetworkUnreachable,
            Self::AuthFailed,
            Self::RateLimited,
            Self::RemoteRejected,
            Self::DatabaseError,
            Self::IoError,
            Self::SerializationError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
