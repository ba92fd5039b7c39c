//! Column offsets of variable and parameter leaves.
//!
//! The assembly pass stacks every variable (or parameter) reachable from a
//! root into one flat vector, each leaf flattened in column-major order.
//! `LeafMap` records where each leaf starts in that vector.

use std::collections::HashMap;

use crate::error::{LinOpError, Result};
use crate::linop::{LeafId, LinOpTree, NodeId, OperatorType, Shape};

/// Mapping from leaf ids to column ranges of the stacked vector.
#[derive(Debug, Clone, Default)]
pub struct LeafMap {
    /// Map from leaf id to (start_col, size).
    pub id_to_col: HashMap<LeafId, (usize, usize)>,
    /// Shape of each leaf.
    pub shapes: HashMap<LeafId, Shape>,
    /// Total length of the stacked vector.
    pub total: usize,
}

impl LeafMap {
    /// Offsets of the variables reachable from `root`, ordered by id.
    pub fn variables(tree: &LinOpTree, root: NodeId) -> Result<Self> {
        Self::collect(tree, root, OperatorType::Variable)
    }

    /// Offsets of the parameters reachable from `root`, ordered by id.
    pub fn parameters(tree: &LinOpTree, root: NodeId) -> Result<Self> {
        Self::collect(tree, root, OperatorType::Param)
    }

    fn collect(tree: &LinOpTree, root: NodeId, kind: OperatorType) -> Result<Self> {
        let mut shapes: HashMap<LeafId, Shape> = HashMap::new();
        for id in tree.postorder(root)? {
            let node = tree.node(id)?;
            if node.kind() != kind {
                continue;
            }
            let Some(leaf) = node.leaf_id() else {
                continue;
            };
            match shapes.get(&leaf) {
                Some(seen) if seen != node.size() => {
                    return Err(LinOpError::shape(seen, node.size()));
                }
                Some(_) => {}
                None => {
                    shapes.insert(leaf, node.size().clone());
                }
            }
        }

        let mut ids: Vec<LeafId> = shapes.keys().copied().collect();
        ids.sort();

        let mut id_to_col = HashMap::new();
        let mut offset: usize = 0;
        for leaf in ids {
            let size = shapes[&leaf].numel();
            id_to_col.insert(leaf, (offset, size));
            offset = offset
                .checked_add(size)
                .ok_or_else(|| LinOpError::shape("a column count that fits in usize", &shapes[&leaf]))?;
        }

        Ok(LeafMap {
            id_to_col,
            shapes,
            total: offset,
        })
    }

    /// Get the column range for a leaf.
    pub fn get(&self, leaf: LeafId) -> Option<(usize, usize)> {
        self.id_to_col.get(&leaf).copied()
    }

    pub fn len(&self) -> usize {
        self.id_to_col.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_col.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_sorted_by_id() {
        let mut tree = LinOpTree::new();
        let y = tree.variable(LeafId(7), (2, 2)).unwrap();
        let x = tree.variable(LeafId(3), 3).unwrap();
        let p = tree.parameter(LeafId(1), ()).unwrap();
        let rx = tree.push(OperatorType::Reshape, (2, 2), &[x]);
        assert!(rx.is_err());

        let vy = tree.push(OperatorType::Reshape, 4, &[y]).unwrap();
        let sx = tree.push(OperatorType::SumEntries, (), &[x]).unwrap();
        let root = tree.push(OperatorType::VStack, 6, &[vy, sx, p]).unwrap();

        let vars = LeafMap::variables(&tree, root).unwrap();
        assert_eq!(vars.get(LeafId(3)), Some((0, 3)));
        assert_eq!(vars.get(LeafId(7)), Some((3, 4)));
        assert_eq!(vars.total, 7);

        let params = LeafMap::parameters(&tree, root).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get(LeafId(1)), Some((0, 1)));
    }

    #[test]
    fn test_total_columns_overflow() {
        let mut tree = LinOpTree::new();
        let half = usize::MAX / 2 + 1;
        let a = tree.variable(LeafId(0), (half, 1)).unwrap();
        let b = tree.variable(LeafId(1), (half, 1)).unwrap();
        let sum = tree.push(OperatorType::Sum, (half, 1), &[a, b]).unwrap();
        assert!(matches!(
            LeafMap::variables(&tree, sum),
            Err(LinOpError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_repeated_leaf_counted_once() {
        let mut tree = LinOpTree::new();
        let a = tree.variable(LeafId(0), 2).unwrap();
        let b = tree.variable(LeafId(0), 2).unwrap();
        let root = tree.push(OperatorType::Sum, 2, &[a, b]).unwrap();
        let vars = LeafMap::variables(&tree, root).unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.total, 2);
    }

    #[test]
    fn test_conflicting_leaf_shapes() {
        let mut tree = LinOpTree::new();
        let a = tree.variable(LeafId(0), 2).unwrap();
        let b = tree.variable(LeafId(0), (1, 2)).unwrap();
        let root = tree.push(OperatorType::Sum, 2, &[a, b]).unwrap();
        assert!(matches!(
            LeafMap::variables(&tree, root),
            Err(LinOpError::ShapeMismatch { .. })
        ));
    }
}
