//! Per-axis slice descriptors for index nodes.

use super::shape::Shape;
use crate::error::{LinOpError, Result};

/// Half-open `(start, end, step)` range along one axis.
///
/// With a positive step the selected indices are `start, start + step, ...`
/// while strictly less than `end`; with a negative step, while strictly
/// greater than `end`. An `end` of `-1` with a negative step runs through
/// index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl Slice {
    pub fn new(start: i64, end: i64, step: i64) -> Self {
        Slice { start, end, step }
    }

    /// Number of selected indices.
    ///
    /// Defined for any triple, in or out of bounds.
    pub fn len(&self) -> usize {
        let (from, to) = if self.step > 0 {
            (self.start, self.end)
        } else if self.step < 0 {
            (self.end, self.start)
        } else {
            return 0;
        };
        if to <= from {
            return 0;
        }
        let count = to.abs_diff(from).div_ceil(self.step.unsigned_abs());
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selected indices, in selection order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len() as i64).map(move |k| (self.start + k * self.step) as usize)
    }

    /// Check the bounds against an axis of extent `extent`.
    pub fn validate(&self, extent: usize) -> Result<()> {
        let d = i64::try_from(extent).unwrap_or(i64::MAX);
        let in_bounds = if self.step > 0 {
            (0..=d).contains(&self.start) && (0..=d).contains(&self.end)
        } else if self.step < 0 {
            (-1..d).contains(&self.start) && (-1..d).contains(&self.end)
        } else {
            false
        };
        if in_bounds {
            Ok(())
        } else {
            Err(LinOpError::IndexOutOfRange(format!(
                "slice ({}, {}, {}) on axis of extent {}",
                self.start, self.end, self.step, extent
            )))
        }
    }
}

/// One slice per axis of the indexed child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SliceSpec(Vec<Slice>);

impl SliceSpec {
    pub fn new(slices: impl Into<Vec<Slice>>) -> Self {
        SliceSpec(slices.into())
    }

    /// Build from raw `(start, end, step)` triples.
    pub fn from_triples(triples: &[(i64, i64, i64)]) -> Self {
        SliceSpec(
            triples
                .iter()
                .map(|&(start, end, step)| Slice::new(start, end, step))
                .collect(),
        )
    }

    pub fn slices(&self) -> &[Slice] {
        &self.0
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Per-axis selection lengths.
    pub fn selection_shape(&self) -> Shape {
        Shape::from_dims(self.0.iter().map(Slice::len).collect::<Vec<_>>())
    }

    /// Validate against the shape of the indexed child.
    pub fn validate(&self, child: &Shape) -> Result<()> {
        if self.0.len() != child.ndim() {
            return Err(LinOpError::shape(
                format!("{} slice(s) for child {}", child.ndim(), child),
                format!("{} slice(s)", self.0.len()),
            ));
        }
        for (slice, &extent) in self.0.iter().zip(child.dims()) {
            slice.validate(extent)?;
        }
        Ok(())
    }

    /// Flat column-major positions in the child selected by this spec.
    pub fn flat_indices(&self, child: &Shape) -> Vec<usize> {
        let mut flat = vec![0usize];
        let mut stride = 1;
        for (slice, &extent) in self.0.iter().zip(child.dims()) {
            let mut next = Vec::with_capacity(flat.len() * slice.len());
            for i in slice.indices() {
                for &base in &flat {
                    next.push(base + i * stride);
                }
            }
            flat = next;
            stride *= extent;
        }
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_selection() {
        let s = Slice::new(0, 3, 1);
        assert!(s.validate(3).is_ok());
        assert_eq!(s.indices().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_strided() {
        let s = Slice::new(1, 6, 2);
        assert_eq!(s.indices().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_negative_step() {
        let s = Slice::new(4, -1, -2);
        assert!(s.validate(5).is_ok());
        assert_eq!(s.indices().collect::<Vec<_>>(), vec![4, 2, 0]);

        let s = Slice::new(3, 0, -1);
        assert_eq!(s.indices().collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_empty_selection() {
        let s = Slice::new(2, 2, 1);
        assert!(s.is_empty());
        assert!(s.validate(2).is_ok());
        assert!(Slice::new(3, 1, 1).is_empty());
    }

    #[test]
    fn test_out_of_range() {
        assert!(Slice::new(0, 4, 1).validate(3).is_err());
        assert!(Slice::new(-1, 2, 1).validate(3).is_err());
        assert!(Slice::new(3, -1, -1).validate(3).is_err());
        assert!(Slice::new(0, 1, 0).validate(3).is_err());
    }

    #[test]
    fn test_extreme_triples() {
        let s = Slice::new(i64::MIN, i64::MAX, 1);
        assert_eq!(s.len(), usize::MAX);
        assert!(s.validate(3).is_err());

        let s = Slice::new(i64::MAX, i64::MIN, i64::MIN);
        assert_eq!(s.len(), 2);
        assert!(s.validate(3).is_err());

        assert!(Slice::new(i64::MAX, i64::MIN, 1).is_empty());
    }

    #[test]
    fn test_spec_rank_mismatch() {
        let spec = SliceSpec::from_triples(&[(0, 1, 1)]);
        let err = spec.validate(&Shape::matrix(2, 2)).unwrap_err();
        assert!(matches!(err, LinOpError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_flat_indices_column_major() {
        // Rows 0..2, column 1 of a 3x2 matrix.
        let spec = SliceSpec::from_triples(&[(0, 2, 1), (1, 2, 1)]);
        let child = Shape::matrix(3, 2);
        assert!(spec.validate(&child).is_ok());
        assert_eq!(spec.selection_shape(), Shape::matrix(2, 1));
        assert_eq!(spec.flat_indices(&child), vec![3, 4]);
    }
}
