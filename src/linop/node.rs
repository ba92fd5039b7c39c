//! Operator nodes.
//!
//! A node describes one step of an affine transformation. Nodes live in a
//! [`LinOpTree`](super::LinOpTree) arena and refer to their operands by
//! [`NodeId`], so a node may appear under several parents.

use super::kind::OperatorType;
use super::payload::CoefficientPayload;
use super::shape::Shape;
use super::slice::SliceSpec;

/// Stable index of a node inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identifier of a variable or parameter assigned by the modeling front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafId(pub u64);

/// Lifecycle stage of a node. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeState {
    /// Kind fixed, no shape or children yet.
    Typed,
    /// Shape and children attached.
    Shaped,
    /// Payload, data sub-tree, slice or leaf id attached.
    DataBound,
    /// Sealed; read-only from here on.
    Immutable,
}

/// Data attached to a node. At most one source per node.
#[derive(Debug, Clone, Default)]
pub enum NodeData {
    #[default]
    None,
    /// Numeric coefficient of a constant leaf.
    Payload(CoefficientPayload),
    /// Coefficient given as another operator tree.
    Subtree(NodeId),
    /// Axis selection of an index node.
    Slice(SliceSpec),
    /// Front-end id of a variable or parameter.
    Leaf(LeafId),
}

/// One node of an operator tree.
#[derive(Debug, Clone)]
pub struct OperatorNode {
    pub(crate) kind: OperatorType,
    pub(crate) size: Shape,
    pub(crate) args: Vec<NodeId>,
    pub(crate) data: NodeData,
    pub(crate) state: NodeState,
}

impl OperatorNode {
    pub(crate) fn new(kind: OperatorType) -> Self {
        OperatorNode {
            kind,
            size: Shape::scalar(),
            args: Vec::new(),
            data: NodeData::None,
            state: NodeState::Typed,
        }
    }

    /// Operator kind.
    pub fn kind(&self) -> OperatorType {
        self.kind
    }

    /// Output shape.
    pub fn size(&self) -> &Shape {
        &self.size
    }

    /// Ordered children.
    pub fn args(&self) -> &[NodeId] {
        &self.args
    }

    /// Lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Bound data, if any.
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Check if this node is a scalar, dense or sparse constant.
    pub fn has_constant_type(&self) -> bool {
        self.kind.is_constant()
    }

    /// Coefficient of a constant leaf.
    pub fn payload(&self) -> Option<&CoefficientPayload> {
        match &self.data {
            NodeData::Payload(p) => Some(p),
            _ => None,
        }
    }

    /// Root of the data sub-tree standing in for a coefficient.
    pub fn data_subtree(&self) -> Option<NodeId> {
        match self.data {
            NodeData::Subtree(id) => Some(id),
            _ => None,
        }
    }

    /// Selection of an index node.
    pub fn slice(&self) -> Option<&SliceSpec> {
        match &self.data {
            NodeData::Slice(s) => Some(s),
            _ => None,
        }
    }

    /// Front-end id of a variable or parameter.
    pub fn leaf_id(&self) -> Option<LeafId> {
        match self.data {
            NodeData::Leaf(id) => Some(id),
            _ => None,
        }
    }

    /// Rank of the payload; 0 when the node carries none.
    pub fn data_ndim(&self) -> usize {
        self.payload().map_or(0, CoefficientPayload::data_ndim)
    }

    /// Check if the payload is sparse.
    pub fn is_sparse(&self) -> bool {
        self.payload().is_some_and(CoefficientPayload::is_sparse)
    }

    /// Children followed by the data sub-tree, if any.
    pub fn operands(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.args.iter().copied().chain(self.data_subtree())
    }

    /// Check if the node has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.state == NodeState::Immutable
    }
}
