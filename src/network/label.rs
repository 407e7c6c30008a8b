//! Index labels identifying tensor dimensions across factors.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A single index label.
///
/// Integer labels carry the NCON sign convention: negative values mark free
/// dimensions, positive values mark contracted pairs. Named labels are opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexLabel {
    /// An integer label.
    Int(i64),
    /// A named label.
    Name(String),
}

impl IndexLabel {
    /// Creates a named label.
    pub fn name(name: impl Into<String>) -> Self {
        IndexLabel::Name(name.into())
    }

    /// Returns the integer value if this is an integer label.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            IndexLabel::Int(v) => Some(*v),
            IndexLabel::Name(_) => None,
        }
    }

    /// Returns the primed version of this label (`a` becomes `a′`).
    ///
    /// Priming an integer label turns it into a named label, so primed labels
    /// never take part in the NCON convention.
    pub fn prime(&self) -> IndexLabel {
        match self {
            IndexLabel::Int(v) => IndexLabel::Name(format!("{v}′")),
            IndexLabel::Name(n) => IndexLabel::Name(format!("{n}′")),
        }
    }
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexLabel::Int(v) => write!(f, "{v}"),
            IndexLabel::Name(n) => write!(f, "{n}"),
        }
    }
}

impl From<i64> for IndexLabel {
    fn from(value: i64) -> Self {
        IndexLabel::Int(value)
    }
}

impl From<i32> for IndexLabel {
    fn from(value: i32) -> Self {
        IndexLabel::Int(value as i64)
    }
}

impl From<char> for IndexLabel {
    fn from(value: char) -> Self {
        IndexLabel::Name(value.to_string())
    }
}

impl From<&str> for IndexLabel {
    fn from(value: &str) -> Self {
        IndexLabel::Name(value.to_string())
    }
}

impl From<String> for IndexLabel {
    fn from(value: String) -> Self {
        IndexLabel::Name(value)
    }
}

/// Converts a sequence of label-like values into labels.
pub fn labels<L: Into<IndexLabel>>(items: impl IntoIterator<Item = L>) -> Vec<IndexLabel> {
    items.into_iter().map(Into::into).collect()
}
