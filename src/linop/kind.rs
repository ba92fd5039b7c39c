//! Operator kinds and their arity contracts.

use crate::error::LinOpError;

/// Kind of an operator node.
///
/// The discriminant is the wire code used by front-ends that hand over the
/// kind as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum OperatorType {
    // ========== Leaves ==========
    /// A decision variable.
    Variable = 0,
    /// A parameter whose value is supplied after canonicalization.
    Param = 1,

    // ========== Affine operators ==========
    /// Broadcast a scalar to the node's shape.
    Promote = 2,
    /// Left multiplication by a coefficient: A @ x.
    Mul = 3,
    /// Right multiplication by a coefficient: x @ A.
    RMul = 4,
    /// Elementwise multiplication.
    MulElem = 5,
    /// Elementwise division by a constant.
    Div = 6,
    /// Sum of operands.
    Sum = 7,
    /// Negation.
    Neg = 8,
    /// Indexing / slicing.
    Index = 9,
    /// Transpose.
    Transpose = 10,
    /// Sum of all entries (or along an axis).
    SumEntries = 11,
    /// Matrix trace.
    Trace = 12,
    /// Reshape in column-major order.
    Reshape = 13,
    /// Vector to diagonal matrix.
    DiagVec = 14,
    /// Diagonal of a matrix as a vector.
    DiagMat = 15,
    /// Strict upper triangle of a matrix as a vector.
    UpperTri = 16,
    /// 1-D convolution.
    Conv = 17,
    /// Horizontal stack.
    HStack = 18,
    /// Vertical stack.
    VStack = 19,

    // ========== Constant leaves ==========
    /// Scalar constant.
    ScalarConst = 20,
    /// Dense matrix constant.
    DenseConst = 21,
    /// Sparse matrix constant.
    SparseConst = 22,

    /// Placeholder with no operands and no data.
    NoOp = 23,
    /// Kronecker product.
    Kron = 24,
}

/// Number of operands an operator kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No children.
    Leaf,
    /// Exactly one child.
    Unary,
    /// Two operands: two children, or one child plus the data sub-tree.
    Binary,
    /// One child (optionally with a data sub-tree) or two children.
    UnaryOrBinary,
    /// One or more children.
    Variadic,
}

impl Arity {
    /// Whether `n` children are acceptable before any data sub-tree is attached.
    pub fn accepts_children(&self, n: usize) -> bool {
        match self {
            Arity::Leaf => n == 0,
            Arity::Unary => n == 1,
            Arity::Binary | Arity::UnaryOrBinary => n == 1 || n == 2,
            Arity::Variadic => n >= 1,
        }
    }

    /// Whether the operand count is complete, counting a data sub-tree as an operand.
    pub fn is_complete(&self, children: usize, has_subtree: bool) -> bool {
        let operands = children + usize::from(has_subtree);
        match self {
            Arity::Leaf => children == 0 && !has_subtree,
            Arity::Unary => children == 1 && !has_subtree,
            Arity::Binary => operands == 2 && children >= 1,
            Arity::UnaryOrBinary => children == 1 || (children == 2 && !has_subtree),
            Arity::Variadic => children >= 1 && !has_subtree,
        }
    }

    /// Whether a data sub-tree may take an operand slot.
    pub fn takes_subtree(&self) -> bool {
        matches!(self, Arity::Binary | Arity::UnaryOrBinary)
    }

    /// Human-readable description of the expected operand count.
    pub fn describe(&self) -> &'static str {
        match self {
            Arity::Leaf => "0",
            Arity::Unary => "1",
            Arity::Binary => "2",
            Arity::UnaryOrBinary => "1 or 2",
            Arity::Variadic => "at least 1",
        }
    }
}

impl OperatorType {
    /// Every operator kind, in wire-code order.
    pub const ALL: [OperatorType; 25] = [
        OperatorType::Variable,
        OperatorType::Param,
        OperatorType::Promote,
        OperatorType::Mul,
        OperatorType::RMul,
        OperatorType::MulElem,
        OperatorType::Div,
        OperatorType::Sum,
        OperatorType::Neg,
        OperatorType::Index,
        OperatorType::Transpose,
        OperatorType::SumEntries,
        OperatorType::Trace,
        OperatorType::Reshape,
        OperatorType::DiagVec,
        OperatorType::DiagMat,
        OperatorType::UpperTri,
        OperatorType::Conv,
        OperatorType::HStack,
        OperatorType::VStack,
        OperatorType::ScalarConst,
        OperatorType::DenseConst,
        OperatorType::SparseConst,
        OperatorType::NoOp,
        OperatorType::Kron,
    ];

    /// Check if this kind is one of the constant leaves.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            OperatorType::ScalarConst | OperatorType::DenseConst | OperatorType::SparseConst
        )
    }

    /// Check if this kind is a variable or parameter leaf.
    pub fn is_symbolic_leaf(&self) -> bool {
        matches!(self, OperatorType::Variable | OperatorType::Param)
    }

    /// Arity contract for this kind.
    pub fn arity(&self) -> Arity {
        match self {
            OperatorType::Variable
            | OperatorType::Param
            | OperatorType::ScalarConst
            | OperatorType::DenseConst
            | OperatorType::SparseConst
            | OperatorType::NoOp => Arity::Leaf,

            OperatorType::Promote
            | OperatorType::Neg
            | OperatorType::Index
            | OperatorType::Transpose
            | OperatorType::SumEntries
            | OperatorType::Trace
            | OperatorType::Reshape
            | OperatorType::DiagVec
            | OperatorType::DiagMat
            | OperatorType::UpperTri => Arity::Unary,

            OperatorType::Mul
            | OperatorType::RMul
            | OperatorType::MulElem
            | OperatorType::Div
            | OperatorType::Conv => Arity::Binary,

            OperatorType::Kron => Arity::UnaryOrBinary,

            OperatorType::Sum | OperatorType::HStack | OperatorType::VStack => Arity::Variadic,
        }
    }

    /// Wire code of this kind.
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl TryFrom<i32> for OperatorType {
    type Error = LinOpError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|i| OperatorType::ALL.get(i).copied())
            .ok_or(LinOpError::UnsupportedOperatorType(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes_round_trip() {
        for (i, kind) in OperatorType::ALL.iter().enumerate() {
            assert_eq!(kind.code(), i as i32);
            assert_eq!(OperatorType::try_from(i as i32), Ok(*kind));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            OperatorType::try_from(25),
            Err(LinOpError::UnsupportedOperatorType(25))
        );
        assert_eq!(
            OperatorType::try_from(-1),
            Err(LinOpError::UnsupportedOperatorType(-1))
        );
    }

    #[test]
    fn test_constant_kinds() {
        let constants: Vec<_> = OperatorType::ALL
            .iter()
            .filter(|k| k.is_constant())
            .collect();
        assert_eq!(
            constants,
            vec![
                &OperatorType::ScalarConst,
                &OperatorType::DenseConst,
                &OperatorType::SparseConst
            ]
        );
        assert!(constants.iter().all(|k| k.arity() == Arity::Leaf));
    }

    #[test]
    fn test_binary_completion() {
        let a = Arity::Binary;
        assert!(a.is_complete(2, false));
        assert!(a.is_complete(1, true));
        assert!(!a.is_complete(1, false));
        assert!(!a.is_complete(2, true));
        assert!(!a.is_complete(0, true));
    }

    #[test]
    fn test_kron_forms() {
        let a = OperatorType::Kron.arity();
        assert!(a.is_complete(1, false));
        assert!(a.is_complete(1, true));
        assert!(a.is_complete(2, false));
        assert!(!a.is_complete(2, true));
    }

    #[test]
    fn test_variadic() {
        let a = OperatorType::VStack.arity();
        assert!(!a.accepts_children(0));
        assert!(a.accepts_children(5));
    }
}
