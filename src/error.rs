//! Error types for planning and executing tensor contractions.

use crate::network::IndexLabel;

/// Errors that can occur while building, planning or executing a contraction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    /// A label occurs an invalid number of times, or the output is inconsistent with the factors.
    #[error("malformed network: label {label} occurs {count} times ({reason})")]
    MalformedNetwork {
        label: IndexLabel,
        count: usize,
        reason: String,
    },

    /// A network needs at least one factor.
    #[error("a contraction network needs at least one factor")]
    EmptyNetwork,

    /// Two occurrences of one label have different extents.
    #[error("dimension mismatch for label {label}: expected {expected}, got {got}")]
    DimensionMismatch {
        label: IndexLabel,
        expected: usize,
        got: usize,
    },

    /// Two costs use different scaling variables and cannot be ordered or combined.
    #[error("incomparable costs: {left} vs {right}")]
    IncomparableCost { left: String, right: String },

    /// An explicit contraction order does not match the network.
    #[error("invalid contraction order: {message}")]
    InvalidOrder { message: String },

    /// The exhaustive optimizer was asked to handle too many factors.
    #[error("optimal contraction search supports at most {max} factors, got {count}")]
    TooManyFactors { count: usize, max: usize },

    /// Number of buffers handed to an execution does not match the plan.
    #[error("plan expects {expected} input buffers, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// A buffer has a different number of dimensions than its factor has labels.
    #[error("factor {factor} has {expected} labels but its buffer has {got} dimensions")]
    RankMismatch {
        factor: usize,
        expected: usize,
        got: usize,
    },

    /// Failure reported by a backend primitive.
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl ContractError {
    pub fn malformed(label: IndexLabel, count: usize, reason: impl Into<String>) -> Self {
        Self::MalformedNetwork {
            label,
            count,
            reason: reason.into(),
        }
    }

    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::InvalidOrder {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Result type for contraction operations.
pub type ContractResult<T> = core::result::Result<T, ContractError>;
