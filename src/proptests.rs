//! Property-based tests for payload ingestion and slicing.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use crate::linop::{CoefficientPayload, OperatorNode, OperatorType, Slice};

    // Strategy for a shape and a column-major buffer of matching length
    fn dense_input() -> impl Strategy<Value = (usize, usize, Vec<f64>)> {
        (1usize..6, 1usize..6).prop_flat_map(|(rows, cols)| {
            (
                Just(rows),
                Just(cols),
                prop::collection::vec(-100.0f64..100.0, rows * cols),
            )
        })
    }

    // Strategy for COO triplets with deliberately many repeated positions
    fn coo_input() -> impl Strategy<Value = (usize, usize, Vec<(usize, usize, f64)>)> {
        (1usize..4, 1usize..4).prop_flat_map(|(rows, cols)| {
            (
                Just(rows),
                Just(cols),
                prop::collection::vec((0..rows, 0..cols, -10i32..10), 0..20).prop_map(|ts| {
                    ts.into_iter()
                        .map(|(r, c, v)| (r, c, f64::from(v)))
                        .collect()
                }),
            )
        })
    }

    proptest! {
        #[test]
        fn dense_round_trip((rows, cols, buffer) in dense_input()) {
            let payload = CoefficientPayload::dense(&buffer, rows, cols).unwrap();
            let m = payload.as_dense().unwrap();
            prop_assert_eq!(m.nrows(), rows);
            prop_assert_eq!(m.ncols(), cols);
            for j in 0..cols {
                for i in 0..rows {
                    prop_assert_eq!(m[(i, j)], buffer[i + j * rows]);
                }
            }
            prop_assert!(!payload.is_sparse());
        }

        #[test]
        fn dense_wrong_length_rejected((rows, cols, mut buffer) in dense_input()) {
            buffer.push(0.0);
            prop_assert!(CoefficientPayload::dense(&buffer, rows, cols).is_err());
        }

        #[test]
        fn sparse_accumulates_duplicates((rows, cols, triplets) in coo_input()) {
            let values: Vec<f64> = triplets.iter().map(|t| t.2).collect();
            let row_idx: Vec<f64> = triplets.iter().map(|t| t.0 as f64).collect();
            let col_idx: Vec<f64> = triplets.iter().map(|t| t.1 as f64).collect();

            let payload = CoefficientPayload::sparse(&values, &row_idx, &col_idx, rows, cols).unwrap();
            prop_assert!(payload.is_sparse());
            prop_assert_eq!(payload.data_ndim(), 2);

            let mut expected: HashMap<(usize, usize), f64> = HashMap::new();
            for &(r, c, v) in &triplets {
                *expected.entry((r, c)).or_insert(0.0) += v;
            }
            let dense = payload.to_dense().unwrap();
            for i in 0..rows {
                for j in 0..cols {
                    let want = expected.get(&(i, j)).copied().unwrap_or(0.0);
                    prop_assert_eq!(dense[(i, j)], want);
                }
            }
        }

        #[test]
        fn sparse_flag_tracks_last_call(calls in prop::collection::vec(any::<bool>(), 1..8)) {
            // true = set_sparse, false = set_dense
            let mut payload = CoefficientPayload::new();
            let mut became_sparse = false;
            for sparse in calls {
                if sparse {
                    payload.set_sparse(&[1.0], &[0.0], &[0.0], 1, 1).unwrap();
                    became_sparse = true;
                } else {
                    let result = payload.set_dense(&[1.0], 1, 1);
                    prop_assert_eq!(result.is_err(), became_sparse);
                }
                prop_assert_eq!(payload.is_sparse(), became_sparse);
            }
        }

        #[test]
        fn has_constant_type_matches_kind(code in 0i32..25) {
            let kind = OperatorType::try_from(code).unwrap();
            let node = OperatorNode::new(kind);
            prop_assert_eq!(node.has_constant_type(), (20..=22).contains(&code));
        }

        #[test]
        fn slice_indices_stay_in_bounds(
            extent in 0usize..12,
            start in 0i64..12,
            end in 0i64..12,
            step in 1i64..4,
        ) {
            let slice = Slice::new(start, end, step);
            if slice.validate(extent).is_ok() {
                let indices: Vec<usize> = slice.indices().collect();
                prop_assert_eq!(indices.len(), slice.len());
                prop_assert!(indices.iter().all(|&i| i < extent));
                prop_assert!(indices.windows(2).all(|w| w[1] == w[0] + step as usize));
            }
        }
    }
}
