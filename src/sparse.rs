//! Sparse matrix utilities.
//!
//! Helper functions for working with nalgebra-sparse matrices.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::{LinOpError, Result};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together. Every index must lie inside the shape.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> Result<CscMatrix<f64>> {
    if rows.is_empty() {
        return Ok(CscMatrix::zeros(nrows, ncols));
    }

    let coo = CooMatrix::try_from_triplets(nrows, ncols, rows, cols, vals)
        .map_err(|e| LinOpError::IndexOutOfRange(e.to_string()))?;

    Ok(CscMatrix::from(&coo))
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

/// Count triplets that share a position with an earlier triplet.
pub fn duplicate_count(rows: &[usize], cols: &[usize]) -> usize {
    let mut positions: Vec<(usize, usize)> = rows.iter().copied().zip(cols.iter().copied()).collect();
    positions.sort_unstable();
    positions.windows(2).filter(|w| w[0] == w[1]).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csc_from_triplets() {
        let m = csc_from_triplets(3, 3, vec![0, 1, 2], vec![0, 1, 2], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m.nnz(), 3);
    }

    #[test]
    fn test_csc_from_triplets_sums_duplicates() {
        let m = csc_from_triplets(2, 2, vec![1, 1, 0], vec![0, 0, 1], vec![1.5, 2.5, 4.0]).unwrap();
        let d = csc_to_dense(&m);
        assert_eq!(d[(1, 0)], 4.0);
        assert_eq!(d[(0, 1)], 4.0);
        assert_eq!(m.nnz(), 2);
    }

    #[test]
    fn test_csc_from_triplets_out_of_bounds() {
        let err = csc_from_triplets(2, 2, vec![2], vec![0], vec![1.0]).unwrap_err();
        assert!(matches!(err, LinOpError::IndexOutOfRange(_)));
    }

    #[test]
    fn test_csc_from_empty_triplets() {
        let m = csc_from_triplets(4, 2, vec![], vec![], vec![]).unwrap();
        assert_eq!(m.nnz(), 0);
        assert_eq!(m.nrows(), 4);
    }

    #[test]
    fn test_csc_to_dense() {
        let m = csc_from_triplets(2, 2, vec![0, 1], vec![0, 1], vec![1.0, 3.0]).unwrap();
        let expected = DMatrix::from_column_slice(2, 2, &[1.0, 0.0, 0.0, 3.0]);
        assert_eq!(csc_to_dense(&m), expected);
    }

    #[test]
    fn test_duplicate_count() {
        assert_eq!(duplicate_count(&[0, 1, 0, 0], &[0, 1, 0, 0]), 2);
        assert_eq!(duplicate_count(&[0, 1], &[1, 0]), 0);
    }
}
