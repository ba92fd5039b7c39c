//! # linop
//!
//! Operator trees for canonicalizing convex optimization problems.
//!
//! A modeling front-end describes an affine expression as a tree of
//! operator nodes: variables and parameters at the leaves, constant
//! coefficients attached as dense or sparse matrices, and affine operators
//! (sums, products, stacking, indexing, ...) in between. A canonicalizer
//! then walks the sealed tree to assemble the problem's system matrix.
//!
//! ## Quick Start
//!
//! ```
//! use linop::prelude::*;
//!
//! # fn main() -> linop::Result<()> {
//! let mut tree = LinOpTree::new();
//!
//! // A @ x with A = [[1, 3], [2, 4]] given in column-major order
//! let x = tree.variable(LeafId(0), 2)?;
//! let a = tree.dense_const(&[1.0, 2.0, 3.0, 4.0], 2, 2)?;
//! let ax = tree.push(OperatorType::Mul, 2, &[x])?;
//! tree.attach_data_subtree(ax, a)?;
//!
//! tree.seal(ax)?;
//! assert!(tree.node(ax)?.is_sealed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Lifecycle
//!
//! Each node moves through `Typed -> Shaped -> DataBound -> Immutable`.
//! Arity, shapes, buffer lengths and slice bounds are checked when data is
//! attached; every violation is returned as a [`LinOpError`].
//!
//! ## Sharing
//!
//! Nodes live in an arena and refer to their operands by [`NodeId`]. A node
//! may be used by several parents, which lets a large constant or a
//! repeated parameter appear once. A sealed tree is read-only and can be
//! traversed from several threads at once.

pub mod error;
pub mod leaf_map;
pub mod linop;
pub mod sparse;

#[cfg(test)]
mod proptests;

/// Prelude module for convenient imports.
///
/// ```
/// use linop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::linop::{
        Arity, CoefficientPayload, LeafId, LinOpTree, NodeData, NodeId, NodeState,
        OperatorNode, OperatorType, PayloadData, Settings, Shape, Slice, SliceSpec,
    };

    pub use crate::leaf_map::LeafMap;

    // Errors
    pub use crate::error::{LinOpError, Result};
}

// Re-export main types at crate root
pub use error::{LinOpError, Result};
pub use linop::{CoefficientPayload, LinOpTree, NodeId, OperatorNode, OperatorType, SliceSpec};
