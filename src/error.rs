//! Error types for linop.

use thiserror::Error;

use crate::linop::{NodeId, NodeState, OperatorType};

/// Error type for building and ingesting operator trees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinOpError {
    /// Wrong number of operands for the operator kind.
    #[error("{kind:?} expects {expected} operand(s), got {got}")]
    ArityMismatch {
        kind: OperatorType,
        expected: &'static str,
        got: usize,
    },

    /// Shape of a node is inconsistent with its operands or data.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Sparse triplet arrays of unequal length.
    #[error("COO arrays differ in length: {values} values, {rows} row indices, {cols} column indices")]
    LengthMismatch {
        values: usize,
        rows: usize,
        cols: usize,
    },

    /// Dense buffer length does not match `rows * cols`.
    #[error("Dense buffer holds {got} values, expected {rows}x{cols}")]
    InvalidBufferSize { rows: usize, cols: usize, got: usize },

    /// An index or slice bound lies outside the logical extent.
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Wire code that does not name an operator kind.
    #[error("Unsupported operator type code {0}")]
    UnsupportedOperatorType(i32),

    /// Reference to a node that does not exist (or is not yet allowed).
    #[error("Unknown node reference {0:?}")]
    UnknownNode(NodeId),

    /// Payload and data sub-tree attached to the same node.
    #[error("Node {0:?} already carries a different coefficient source")]
    ConflictingData(NodeId),

    /// Data attached to a node kind that does not take it, or missing at seal.
    #[error("Invalid data for {kind:?} node: {reason}")]
    InvalidData {
        kind: OperatorType,
        reason: String,
    },

    /// Attempt to store dense data in a payload that already holds sparse data.
    #[error("Payload is sparse and cannot revert to dense")]
    SparseLocked,

    /// Second parent reference while structural sharing is disabled.
    #[error("Node {0:?} is already referenced by another parent")]
    SharedNode(NodeId),

    /// Mutation of a node that was sealed.
    #[error("Node {0:?} is immutable")]
    Immutable(NodeId),

    /// Lifecycle step taken out of order.
    #[error("Node {id:?} is {state:?}, cannot {action}")]
    InvalidState {
        id: NodeId,
        state: NodeState,
        action: &'static str,
    },
}

impl LinOpError {
    pub(crate) fn shape(expected: impl ToString, got: impl ToString) -> Self {
        LinOpError::ShapeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub(crate) fn invalid(kind: OperatorType, reason: impl Into<String>) -> Self {
        LinOpError::InvalidData {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for linop operations.
pub type Result<T> = std::result::Result<T, LinOpError>;
