//! Numeric coefficient data attached to constant leaves.
//!
//! A payload is ingested from caller-owned buffers and copied into its own
//! storage. Dense buffers arrive in column-major order; sparse data arrives
//! as COO triplets whose indices are encoded as doubles.

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use super::shape::Shape;
use crate::error::{LinOpError, Result};
use crate::sparse::{csc_from_triplets, csc_to_dense, duplicate_count};

/// Storage of a payload.
#[derive(Debug, Clone, Default)]
pub enum PayloadData {
    /// Nothing ingested yet.
    #[default]
    Empty,
    /// Dense matrix storage.
    Dense(DMatrix<f64>),
    /// Compressed sparse column storage.
    Sparse(CscMatrix<f64>),
}

/// Dense or sparse coefficient of a constant node.
#[derive(Debug, Clone, Default)]
pub struct CoefficientPayload {
    data: PayloadData,
    data_ndim: usize,
}

impl CoefficientPayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a payload from a column-major dense buffer.
    pub fn dense(buffer: &[f64], rows: usize, cols: usize) -> Result<Self> {
        let mut payload = Self::new();
        payload.set_dense(buffer, rows, cols)?;
        Ok(payload)
    }

    /// Create a payload from COO triplets.
    pub fn sparse(
        values: &[f64],
        row_idx: &[f64],
        col_idx: &[f64],
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        let mut payload = Self::new();
        payload.set_sparse(values, row_idx, col_idx, rows, cols)?;
        Ok(payload)
    }

    /// Create a 1x1 payload of rank 0.
    pub fn scalar(value: f64) -> Self {
        CoefficientPayload {
            data: PayloadData::Dense(DMatrix::from_element(1, 1, value)),
            data_ndim: 0,
        }
    }

    /// Ingest `rows * cols` values laid out in column-major order.
    ///
    /// The buffer is copied. Fails with `InvalidBufferSize` if its length
    /// differs from `rows * cols`, and with `SparseLocked` if the payload
    /// already holds sparse data.
    pub fn set_dense(&mut self, buffer: &[f64], rows: usize, cols: usize) -> Result<()> {
        if self.is_sparse() {
            return Err(LinOpError::SparseLocked);
        }
        let expected = rows.checked_mul(cols);
        if expected != Some(buffer.len()) {
            return Err(LinOpError::InvalidBufferSize {
                rows,
                cols,
                got: buffer.len(),
            });
        }

        tracing::trace!(rows, cols, "ingesting dense payload");
        self.data = PayloadData::Dense(DMatrix::from_column_slice(rows, cols, buffer));
        self.data_ndim = 2;
        Ok(())
    }

    /// Ingest COO triplets `(values[i], row_idx[i], col_idx[i])` into a
    /// `rows x cols` sparse matrix.
    ///
    /// Indices are truncated toward zero. Repeated positions are summed.
    pub fn set_sparse(
        &mut self,
        values: &[f64],
        row_idx: &[f64],
        col_idx: &[f64],
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        if row_idx.len() != values.len() || col_idx.len() != values.len() {
            return Err(LinOpError::LengthMismatch {
                values: values.len(),
                rows: row_idx.len(),
                cols: col_idx.len(),
            });
        }

        let row_indices = truncate_indices(row_idx, rows, "row")?;
        let col_indices = truncate_indices(col_idx, cols, "column")?;

        let duplicates = duplicate_count(&row_indices, &col_indices);
        if duplicates > 0 {
            tracing::warn!(duplicates, "summing repeated COO positions");
        }
        tracing::trace!(rows, cols, nnz = values.len(), "ingesting sparse payload");

        let matrix = csc_from_triplets(rows, cols, row_indices, col_indices, values.to_vec())?;
        self.data = PayloadData::Sparse(matrix);
        self.data_ndim = 2;
        Ok(())
    }

    /// Declare the broadcasting rank of the payload.
    ///
    /// Rank 0 needs a 1x1 matrix, rank 1 a single row or column.
    pub fn with_ndim(mut self, ndim: usize) -> Result<Self> {
        let shape = self.shape();
        let ok = match ndim {
            0 => shape.rows() == 1 && shape.cols() == 1,
            1 => shape.rows() == 1 || shape.cols() == 1,
            2 => true,
            _ => false,
        };
        if !ok || self.is_empty() {
            return Err(LinOpError::shape(format!("payload of rank {}", ndim), shape));
        }
        self.data_ndim = ndim;
        Ok(self)
    }

    /// Check if sparse data was ingested.
    pub fn is_sparse(&self) -> bool {
        matches!(self.data, PayloadData::Sparse(_))
    }

    /// Check if nothing was ingested.
    pub fn is_empty(&self) -> bool {
        matches!(self.data, PayloadData::Empty)
    }

    /// Rank of the payload (0 scalar, 1 vector, 2 matrix).
    pub fn data_ndim(&self) -> usize {
        self.data_ndim
    }

    /// Underlying storage.
    pub fn data(&self) -> &PayloadData {
        &self.data
    }

    /// Dense matrix, if the payload is dense.
    pub fn as_dense(&self) -> Option<&DMatrix<f64>> {
        match &self.data {
            PayloadData::Dense(m) => Some(m),
            _ => None,
        }
    }

    /// Sparse matrix, if the payload is sparse.
    pub fn as_sparse(&self) -> Option<&CscMatrix<f64>> {
        match &self.data {
            PayloadData::Sparse(m) => Some(m),
            _ => None,
        }
    }

    /// Materialize the payload as a dense matrix.
    pub fn to_dense(&self) -> Option<DMatrix<f64>> {
        match &self.data {
            PayloadData::Empty => None,
            PayloadData::Dense(m) => Some(m.clone()),
            PayloadData::Sparse(m) => Some(csc_to_dense(m)),
        }
    }

    /// Matrix shape of the stored data; scalar when empty.
    pub fn shape(&self) -> Shape {
        match &self.data {
            PayloadData::Empty => Shape::scalar(),
            PayloadData::Dense(m) => Shape::matrix(m.nrows(), m.ncols()),
            PayloadData::Sparse(m) => Shape::matrix(m.nrows(), m.ncols()),
        }
    }
}

fn truncate_indices(raw: &[f64], extent: usize, axis: &str) -> Result<Vec<usize>> {
    raw.iter()
        .map(|&v| {
            let idx = v.trunc();
            if !idx.is_finite() || idx < 0.0 || idx >= extent as f64 {
                Err(LinOpError::IndexOutOfRange(format!(
                    "{} index {} outside 0..{}",
                    axis, v, extent
                )))
            } else {
                Ok(idx as usize)
            }
        })
        .collect()
}
