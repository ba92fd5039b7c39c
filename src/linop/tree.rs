//! Arena of operator nodes.
//!
//! The tree is built by a single producer through `&mut LinOpTree`:
//! - `add_node` fixes the kind of a node
//! - `set_shape` attaches its output shape and children
//! - `attach_payload`, `attach_data_subtree`, `attach_slice` or
//!   `attach_leaf_id` bind its data
//! - `seal` checks every node reachable from a root and freezes it
//!
//! Children must already exist when they are referenced, so node indices
//! are a topological order and every tree is acyclic. Once sealed, a tree
//! is plain data and can be shared across threads behind an `Arc`.

use super::kind::OperatorType;
use super::node::{LeafId, NodeData, NodeId, NodeState, OperatorNode};
use super::payload::CoefficientPayload;
use super::shape::Shape;
use super::slice::SliceSpec;
use crate::error::{LinOpError, Result};

/// Tree construction settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Check operand shapes against the node's shape when attaching.
    pub validate_shapes: bool,
    /// Allow a node to be referenced by more than one parent.
    pub allow_shared_nodes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            validate_shapes: true,
            allow_shared_nodes: true,
        }
    }
}

/// Arena owning every node of one or more operator trees.
#[derive(Debug, Clone, Default)]
pub struct LinOpTree {
    nodes: Vec<OperatorNode>,
    parent_refs: Vec<usize>,
    settings: Settings,
}

impl LinOpTree {
    /// Create an empty arena with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty arena with the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        LinOpTree {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&OperatorNode> {
        self.nodes.get(id.0).ok_or(LinOpError::UnknownNode(id))
    }

    /// Iterate over all nodes with their ids, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &OperatorNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Number of parents (and data-owning nodes) referencing `id`.
    pub fn parent_count(&self, id: NodeId) -> usize {
        self.parent_refs.get(id.0).copied().unwrap_or(0)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create a node of the given kind.
    pub fn add_node(&mut self, kind: OperatorType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(OperatorNode::new(kind));
        self.parent_refs.push(0);
        id
    }

    /// Create a node from a wire code.
    pub fn add_node_code(&mut self, code: i32) -> Result<NodeId> {
        let kind = OperatorType::try_from(code)?;
        Ok(self.add_node(kind))
    }

    /// Attach the output shape and ordered children of a node.
    pub fn set_shape(&mut self, id: NodeId, size: impl Into<Shape>, args: &[NodeId]) -> Result<()> {
        let size = size.into();
        let node = self.node(id)?;
        let kind = node.kind;
        expect_state(id, node.state, NodeState::Typed, "attach shape and children")?;
        if size.checked_numel().is_none() {
            return Err(LinOpError::shape("an element count that fits in usize", &size));
        }

        let arity = kind.arity();
        if !arity.accepts_children(args.len()) {
            return Err(LinOpError::ArityMismatch {
                kind,
                expected: arity.describe(),
                got: args.len(),
            });
        }
        for (i, &child) in args.iter().enumerate() {
            self.check_reference(id, child)?;
            if !self.settings.allow_shared_nodes && args[..i].contains(&child) {
                return Err(LinOpError::SharedNode(child));
            }
        }

        if self.settings.validate_shapes {
            let children: Vec<&Shape> = args.iter().map(|&c| &self.nodes[c.0].size).collect();
            check_operand_shapes(kind, &size, &children)?;
        }

        for &child in args {
            self.parent_refs[child.0] += 1;
        }
        let node = &mut self.nodes[id.0];
        node.size = size;
        node.args = args.to_vec();
        node.state = NodeState::Shaped;
        Ok(())
    }

    /// Attach a numeric coefficient to a constant leaf.
    ///
    /// A dense payload may be replaced; a sparse one may not revert to dense.
    pub fn attach_payload(&mut self, id: NodeId, payload: CoefficientPayload) -> Result<()> {
        let node = self.bindable(id, "attach a payload")?;
        let kind = node.kind;
        if !kind.is_constant() {
            return Err(LinOpError::invalid(kind, "only constant leaves carry a payload"));
        }
        if payload.is_empty() {
            return Err(LinOpError::invalid(kind, "payload is empty"));
        }
        match &node.data {
            NodeData::None => {}
            NodeData::Payload(existing) => {
                if existing.is_sparse() && !payload.is_sparse() {
                    return Err(LinOpError::SparseLocked);
                }
            }
            _ => return Err(LinOpError::ConflictingData(id)),
        }

        let data_shape = payload.shape();
        match kind {
            OperatorType::SparseConst if !payload.is_sparse() => {
                return Err(LinOpError::invalid(kind, "expected sparse data"));
            }
            OperatorType::DenseConst if payload.is_sparse() => {
                return Err(LinOpError::invalid(kind, "expected dense data"));
            }
            OperatorType::ScalarConst if data_shape.numel() != 1 => {
                return Err(LinOpError::shape("1x1 scalar data", &data_shape));
            }
            _ => {}
        }
        if self.settings.validate_shapes && data_shape.numel() != node.size.numel() {
            return Err(LinOpError::shape(&node.size, &data_shape));
        }

        let node = &mut self.nodes[id.0];
        node.data = NodeData::Payload(payload);
        node.state = NodeState::DataBound;
        Ok(())
    }

    /// Ingest a column-major dense buffer into a constant leaf.
    pub fn set_dense(&mut self, id: NodeId, buffer: &[f64], rows: usize, cols: usize) -> Result<()> {
        let mut payload = self.node(id)?.payload().cloned().unwrap_or_default();
        payload.set_dense(buffer, rows, cols)?;
        self.attach_payload(id, payload)
    }

    /// Ingest COO triplets into a constant leaf.
    pub fn set_sparse(
        &mut self,
        id: NodeId,
        values: &[f64],
        row_idx: &[f64],
        col_idx: &[f64],
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        let mut payload = self.node(id)?.payload().cloned().unwrap_or_default();
        payload.set_sparse(values, row_idx, col_idx, rows, cols)?;
        self.attach_payload(id, payload)
    }

    /// Use another operator tree as the coefficient operand of `id`.
    pub fn attach_data_subtree(&mut self, id: NodeId, subtree: NodeId) -> Result<()> {
        let node = self.bindable(id, "attach a data sub-tree")?;
        let kind = node.kind;
        let arity = kind.arity();
        if !arity.takes_subtree() {
            return Err(LinOpError::invalid(kind, "operator takes no data sub-tree"));
        }
        if !matches!(node.data, NodeData::None) {
            return Err(LinOpError::ConflictingData(id));
        }
        if node.args.len() != 1 {
            return Err(LinOpError::ArityMismatch {
                kind,
                expected: arity.describe(),
                got: node.args.len() + 1,
            });
        }
        self.check_reference(id, subtree)?;

        if self.settings.validate_shapes && matches!(kind, OperatorType::MulElem | OperatorType::Div)
        {
            let node = &self.nodes[id.0];
            check_broadcast(&node.size, &self.nodes[subtree.0].size)?;
        }

        self.parent_refs[subtree.0] += 1;
        let node = &mut self.nodes[id.0];
        node.data = NodeData::Subtree(subtree);
        node.state = NodeState::DataBound;
        Ok(())
    }

    /// Attach the per-axis selection of an index node.
    pub fn attach_slice(&mut self, id: NodeId, spec: SliceSpec) -> Result<()> {
        let node = self.bindable(id, "attach a slice")?;
        let kind = node.kind;
        if kind != OperatorType::Index {
            return Err(LinOpError::invalid(kind, "only index nodes carry a slice"));
        }
        if !matches!(node.data, NodeData::None) {
            return Err(LinOpError::ConflictingData(id));
        }

        let child = &self.nodes[node.args[0].0].size;
        spec.validate(child)?;
        if self.settings.validate_shapes {
            let selected = spec.selection_shape();
            if selected.numel() != node.size.numel() {
                return Err(LinOpError::shape(&selected, &node.size));
            }
        }

        let node = &mut self.nodes[id.0];
        node.data = NodeData::Slice(spec);
        node.state = NodeState::DataBound;
        Ok(())
    }

    /// Record the front-end id of a variable or parameter leaf.
    pub fn attach_leaf_id(&mut self, id: NodeId, leaf: LeafId) -> Result<()> {
        let node = self.bindable(id, "attach a leaf id")?;
        let kind = node.kind;
        if !kind.is_symbolic_leaf() {
            return Err(LinOpError::invalid(kind, "only variables and parameters carry a leaf id"));
        }
        if !matches!(node.data, NodeData::None) {
            return Err(LinOpError::ConflictingData(id));
        }

        let node = &mut self.nodes[id.0];
        node.data = NodeData::Leaf(leaf);
        node.state = NodeState::DataBound;
        Ok(())
    }

    // ========================================================================
    // Convenience builders
    // ========================================================================

    /// Create a shaped node in one step.
    pub fn push(&mut self, kind: OperatorType, size: impl Into<Shape>, args: &[NodeId]) -> Result<NodeId> {
        let id = self.add_node(kind);
        self.set_shape(id, size, args)?;
        Ok(id)
    }

    /// Create a variable leaf.
    pub fn variable(&mut self, leaf: LeafId, size: impl Into<Shape>) -> Result<NodeId> {
        let id = self.push(OperatorType::Variable, size, &[])?;
        self.attach_leaf_id(id, leaf)?;
        Ok(id)
    }

    /// Create a parameter leaf.
    pub fn parameter(&mut self, leaf: LeafId, size: impl Into<Shape>) -> Result<NodeId> {
        let id = self.push(OperatorType::Param, size, &[])?;
        self.attach_leaf_id(id, leaf)?;
        Ok(id)
    }

    /// Create a scalar constant leaf.
    pub fn scalar_const(&mut self, value: f64) -> Result<NodeId> {
        let id = self.push(OperatorType::ScalarConst, Shape::scalar(), &[])?;
        self.attach_payload(id, CoefficientPayload::scalar(value))?;
        Ok(id)
    }

    /// Create a dense constant leaf from a column-major buffer.
    pub fn dense_const(&mut self, buffer: &[f64], rows: usize, cols: usize) -> Result<NodeId> {
        let id = self.push(OperatorType::DenseConst, Shape::matrix(rows, cols), &[])?;
        self.set_dense(id, buffer, rows, cols)?;
        Ok(id)
    }

    /// Create a sparse constant leaf from COO triplets.
    pub fn sparse_const(
        &mut self,
        values: &[f64],
        row_idx: &[f64],
        col_idx: &[f64],
        rows: usize,
        cols: usize,
    ) -> Result<NodeId> {
        let id = self.push(OperatorType::SparseConst, Shape::matrix(rows, cols), &[])?;
        self.set_sparse(id, values, row_idx, col_idx, rows, cols)?;
        Ok(id)
    }

    /// Create an index node selecting `spec` from `child`.
    pub fn index(&mut self, child: NodeId, spec: SliceSpec) -> Result<NodeId> {
        spec.validate(&self.shaped(child, "be indexed")?.size)?;
        let size = spec.selection_shape();
        let id = self.push(OperatorType::Index, size, &[child])?;
        self.attach_slice(id, spec)?;
        Ok(id)
    }

    // ========================================================================
    // Sealing and traversal
    // ========================================================================

    /// Check every node reachable from `root` and make it immutable.
    ///
    /// Nothing is sealed unless every reachable node is complete. Returns the
    /// number of nodes newly sealed.
    pub fn seal(&mut self, root: NodeId) -> Result<usize> {
        let order = self.postorder(root)?;
        for &id in &order {
            self.check_complete(id)?;
        }

        let mut sealed = 0;
        for &id in &order {
            let node = &mut self.nodes[id.0];
            if node.state != NodeState::Immutable {
                node.state = NodeState::Immutable;
                sealed += 1;
            }
        }
        tracing::debug!(root = root.0, reachable = order.len(), sealed, "sealed operator tree");
        Ok(sealed)
    }

    /// Nodes reachable from `root` through children and data sub-trees.
    ///
    /// Operands always precede the nodes that use them; shared nodes appear
    /// once.
    pub fn postorder(&self, root: NodeId) -> Result<Vec<NodeId>> {
        self.node(root)?;
        let mut seen = vec![false; root.0 + 1];
        let mut stack = vec![root];
        seen[root.0] = true;
        while let Some(id) = stack.pop() {
            for operand in self.nodes[id.0].operands() {
                if !seen[operand.0] {
                    seen[operand.0] = true;
                    stack.push(operand);
                }
            }
        }
        Ok(seen
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s)
            .map(|(i, _)| NodeId(i))
            .collect())
    }

    /// Distinct variable ids reachable from `root`, sorted.
    pub fn variables(&self, root: NodeId) -> Result<Vec<LeafId>> {
        self.leaves(root, OperatorType::Variable)
    }

    /// Distinct parameter ids reachable from `root`, sorted.
    pub fn parameters(&self, root: NodeId) -> Result<Vec<LeafId>> {
        self.leaves(root, OperatorType::Param)
    }

    fn leaves(&self, root: NodeId, kind: OperatorType) -> Result<Vec<LeafId>> {
        let mut ids: Vec<LeafId> = self
            .postorder(root)?
            .into_iter()
            .map(|id| &self.nodes[id.0])
            .filter(|n| n.kind == kind)
            .filter_map(OperatorNode::leaf_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    // ========================================================================
    // Checks
    // ========================================================================

    /// A referenced node must exist, be older than its user and have a shape.
    fn check_reference(&self, user: NodeId, operand: NodeId) -> Result<()> {
        if operand.0 >= user.0 {
            return Err(LinOpError::UnknownNode(operand));
        }
        self.shaped(operand, "be used as an operand")?;
        if !self.settings.allow_shared_nodes && self.parent_refs[operand.0] > 0 {
            return Err(LinOpError::SharedNode(operand));
        }
        Ok(())
    }

    /// Node whose shape is final.
    fn shaped(&self, id: NodeId, action: &'static str) -> Result<&OperatorNode> {
        let node = self.node(id)?;
        if node.state == NodeState::Typed {
            return Err(LinOpError::InvalidState {
                id,
                state: node.state,
                action,
            });
        }
        Ok(node)
    }

    /// Node that may receive data: shaped and not sealed.
    fn bindable(&self, id: NodeId, action: &'static str) -> Result<&OperatorNode> {
        let node = self.node(id)?;
        match node.state {
            NodeState::Immutable => Err(LinOpError::Immutable(id)),
            NodeState::Typed => Err(LinOpError::InvalidState {
                id,
                state: node.state,
                action,
            }),
            NodeState::Shaped | NodeState::DataBound => Ok(node),
        }
    }

    fn check_complete(&self, id: NodeId) -> Result<()> {
        let node = &self.nodes[id.0];
        let kind = node.kind;
        if node.state == NodeState::Typed {
            return Err(LinOpError::InvalidState {
                id,
                state: node.state,
                action: "be sealed without a shape",
            });
        }

        let arity = kind.arity();
        let has_subtree = node.data_subtree().is_some();
        if !arity.is_complete(node.args.len(), has_subtree) {
            return Err(LinOpError::ArityMismatch {
                kind,
                expected: arity.describe(),
                got: node.args.len() + usize::from(has_subtree),
            });
        }

        let missing = if kind.is_constant() && node.payload().is_none() {
            Some("constant leaf has no payload")
        } else if kind == OperatorType::Index && node.slice().is_none() {
            Some("index node has no slice")
        } else if kind.is_symbolic_leaf() && node.leaf_id().is_none() {
            Some("leaf has no id")
        } else {
            None
        };
        match missing {
            Some(reason) => Err(LinOpError::invalid(kind, reason)),
            None => Ok(()),
        }
    }
}

fn expect_state(id: NodeId, state: NodeState, expected: NodeState, action: &'static str) -> Result<()> {
    if state == NodeState::Immutable {
        return Err(LinOpError::Immutable(id));
    }
    if state != expected {
        return Err(LinOpError::InvalidState { id, state, action });
    }
    Ok(())
}

/// An operand broadcasts to `out` if it has the same element count or is scalar.
fn check_broadcast(out: &Shape, operand: &Shape) -> Result<()> {
    let n = operand.numel();
    if n == out.numel() || n == 1 {
        Ok(())
    } else {
        Err(LinOpError::shape(out, operand))
    }
}

fn check_operand_shapes(kind: OperatorType, size: &Shape, children: &[&Shape]) -> Result<()> {
    let first = match children.first() {
        Some(c) => *c,
        None => return Ok(()),
    };

    match kind {
        OperatorType::Neg if first != size => Err(LinOpError::shape(first, size)),
        OperatorType::Promote if first.numel() != 1 => Err(LinOpError::shape("scalar operand", first)),
        OperatorType::Transpose if first.transpose() != *size => {
            Err(LinOpError::shape(first.transpose(), size))
        }
        OperatorType::Reshape if first.numel() != size.numel() => {
            Err(LinOpError::shape(format!("{} elements", first.numel()), size))
        }
        OperatorType::SumEntries => {
            let (n, m) = (first.numel(), size.numel());
            if (m == 0 && n != 0) || (m != 0 && n % m != 0) {
                Err(LinOpError::shape(format!("a divisor of {} elements", n), size))
            } else {
                Ok(())
            }
        }
        OperatorType::Trace => {
            if !first.is_square() {
                Err(LinOpError::shape("square matrix operand", first))
            } else if size.numel() != 1 {
                Err(LinOpError::shape(Shape::scalar(), size))
            } else {
                Ok(())
            }
        }
        OperatorType::DiagVec => {
            let k = first.numel();
            if *size != Shape::matrix(k, k) {
                Err(LinOpError::shape(Shape::matrix(k, k), size))
            } else {
                Ok(())
            }
        }
        OperatorType::DiagMat | OperatorType::UpperTri => {
            if !first.is_square() {
                return Err(LinOpError::shape("square matrix operand", first));
            }
            let k = first.rows();
            let expected = if kind == OperatorType::DiagMat {
                k
            } else {
                k * k.saturating_sub(1) / 2
            };
            if size.numel() != expected {
                Err(LinOpError::shape(format!("{} elements", expected), size))
            } else {
                Ok(())
            }
        }
        OperatorType::Sum | OperatorType::MulElem | OperatorType::Div => {
            children.iter().try_for_each(|c| check_broadcast(size, c))
        }
        OperatorType::VStack | OperatorType::HStack => check_stack(kind, size, children),
        _ => Ok(()),
    }
}

fn check_stack(kind: OperatorType, size: &Shape, children: &[&Shape]) -> Result<()> {
    let total = children
        .iter()
        .try_fold(0usize, |acc, c| acc.checked_add(c.numel()))
        .ok_or_else(|| LinOpError::shape(size, "stacked element count overflows usize"))?;
    if total != size.numel() {
        return Err(LinOpError::shape(size, format!("{} stacked elements", total)));
    }
    if size.is_matrix() {
        for child in children.iter().filter(|c| c.is_matrix()) {
            let mismatch = match kind {
                OperatorType::VStack => child.cols() != size.cols(),
                _ => child.rows() != size.rows(),
            };
            if mismatch {
                return Err(LinOpError::shape(size, child));
            }
        }
    }
    Ok(())
}
