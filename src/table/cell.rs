//! Typed cell values.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell value.
///
/// Text whose content is `true`/`false` (any casing) folds to [`Cell::Bool`];
/// everything else stays [`Cell::Text`] untouched. There is no numeric
/// coercion, so `"1"` and `"1.0"` remain distinct text values.
///
/// Serializes untagged: booleans as JSON booleans, text as JSON strings, which
/// is the shape the spreadsheet values API expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Text(String),
}

impl Cell {
    /// Normalize raw cell text.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        fold_bool(raw).map_or_else(|| Self::Text(raw.to_string()), Self::Bool)
    }

    /// Normalize raw cell text, reusing the allocation for text values.
    #[must_use]
    pub fn from_raw_owned(raw: String) -> Self {
        match fold_bool(&raw) {
            Some(value) => Self::Bool(value),
            None => Self::Text(raw),
        }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self::Text(String::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    /// Text form as the spreadsheet renders it (`TRUE` / `FALSE` for booleans).
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Bool(true) => Cow::Borrowed("TRUE"),
            Self::Bool(false) => Cow::Borrowed("FALSE"),
            Self::Text(text) => Cow::Borrowed(text.as_str()),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::from_raw(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::from_raw_owned(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn fold_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
