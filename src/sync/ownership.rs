//! Per-column authority.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reference to a column by header name or by zero-based position in the
/// local table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Position(usize),
    Name(String),
}

impl ColumnRef {
    #[must_use]
    pub fn matches(&self, position: usize, name: &str) -> bool {
        match self {
            Self::Position(p) => *p == position,
            Self::Name(n) => n == name,
        }
    }
}

/// `#3` is a position, anything else is a name.
impl FromStr for ColumnRef {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.strip_prefix('#') {
            Some(position) => position.parse().map(Self::Position),
            None => Ok(Self::Name(value.to_string())),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "#{p}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

/// Decides which side is authoritative for a column.
pub trait OwnershipPolicy {
    /// `true` when the remote value wins for this column.
    fn is_remote_owned(&self, position: usize, name: &str) -> bool;
}

/// The set of remote-authoritative columns for one sync call. Every column
/// not listed is bot-authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnOwnership {
    remote: Vec<ColumnRef>,
}

impl ColumnOwnership {
    /// Full bot authority.
    #[must_use]
    pub const fn bot_only() -> Self {
        Self { remote: Vec::new() }
    }

    #[must_use]
    pub fn remote<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Self {
            remote: columns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remote.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnRef] {
        &self.remote
    }
}

impl OwnershipPolicy for ColumnOwnership {
    fn is_remote_owned(&self, position: usize, name: &str) -> bool {
        self.remote.iter().any(|c| c.matches(position, name))
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<usize> for ColumnRef {
    fn from(value: usize) -> Self {
        Self::Position(value)
    }
}
