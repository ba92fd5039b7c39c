//! Operator-tree data model.
//!
//! This module provides the types a front-end uses to describe an affine
//! expression node by node:
//! - `OperatorType` - The closed set of operator kinds and their arity
//! - `OperatorNode` - One node: kind, shape, children and attached data
//! - `CoefficientPayload` - Dense or sparse numeric data of constant leaves
//! - `SliceSpec` - Per-axis selection of index nodes
//! - `LinOpTree` - The arena that owns nodes and enforces their contracts

pub mod kind;
pub mod node;
pub mod payload;
pub mod shape;
pub mod slice;
pub mod tree;

// Re-export main types
pub use kind::{Arity, OperatorType};
pub use node::{LeafId, NodeData, NodeId, NodeState, OperatorNode};
pub use payload::{CoefficientPayload, PayloadData};
pub use shape::Shape;
pub use slice::{Slice, SliceSpec};
pub use tree::{LinOpTree, Settings};
