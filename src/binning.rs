// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Histogram rebinning (§4.6) and sparse/dense fused arithmetic (§4.7).
//!
//! Neither operation has a direct analogue in the teacher crate (`ndarray`
//! has no histogram concept); the row-partitioned-and-independent shape of
//! both kernels is grounded on the teacher's own `rayon` feature, which
//! likewise only ever parallelizes over disjoint output regions (§5).

use crate::dim::Dim;
use crate::dimensions::Dimensions;
use crate::error::{DimensionError, SparseError, VariableError};
use crate::storage::ArithOp;

/// Redistribute one row of bin contents from `old_coord` edges to
/// `new_coord` edges by area overlap (§4.6's contract, verbatim).
pub fn rebin_row(old: &[f64], old_coord: &[f64], new_coord: &[f64]) -> Result<Vec<f64>, VariableError> {
    let n = old.len();
    if old_coord.len() != n + 1 {
        return Err(DimensionError::Mismatch {
            expected: format!("old_coord.len() == {}", n + 1),
            actual: format!("old_coord.len() == {}", old_coord.len()),
        }
        .into());
    }
    let m = new_coord.len().saturating_sub(1);
    let mut out = vec![0.0; m];
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        let (xo_low, xo_high) = (old_coord[i], old_coord[i + 1]);
        let (xn_low, xn_high) = (new_coord[j], new_coord[j + 1]);
        if xn_high <= xo_low {
            j += 1;
        } else if xo_high <= xn_low {
            i += 1;
        } else {
            let overlap = (xo_high.min(xn_high) - xo_low.max(xn_low)).max(0.0);
            out[j] += old[i] * (overlap / (xo_high - xo_low));
            if xn_high > xo_high {
                i += 1;
            } else {
                j += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(feature = "rayon")]
fn map_rows<T: Send, F: Fn(usize) -> T + Sync>(count: usize, f: F) -> Vec<T> {
    use rayon::prelude::*;
    (0..count).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "rayon"))]
fn map_rows<T, F: Fn(usize) -> T>(count: usize, f: F) -> Vec<T> {
    (0..count).map(f).collect()
}

/// Rebin a dense `f64` buffer along `dim`. `old_coord`/`new_coord` are
/// shared across every outer row (the common case; §4.6's "inner-dimension
/// fast path" is the special case `dim` innermost, which this also
/// handles — the per-axis stride bookkeeping is identical either way, only
/// the stride of `dim` differs).
pub fn rebin_dense_f64(
    old: &[f64],
    dims: &Dimensions,
    dim: Dim,
    old_coord: &[f64],
    new_coord: &[f64],
) -> Result<(Vec<f64>, Dimensions), VariableError> {
    let n = dims.extent(dim)?;
    let inner = dims.stride(dim)?;
    let m = new_coord.len().saturating_sub(1);
    let row_count = if n == 0 { 0 } else { old.len() / n };

    let rows: Vec<Vec<f64>> = map_rows(row_count, |row| {
        let o = row / inner.max(1);
        let in_ = row % inner.max(1);
        let base = o * n * inner.max(1) + in_;
        let gathered: Vec<f64> = (0..n).map(|k| old[base + k * inner.max(1)]).collect();
        rebin_row(&gathered, old_coord, new_coord)
    })
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;

    let outer = if inner == 0 { row_count } else { row_count / inner };
    let mut out = vec![0.0; outer * m * inner.max(1)];
    for (row, rebinned) in rows.into_iter().enumerate() {
        let o = row / inner.max(1);
        let in_ = row % inner.max(1);
        let out_base = o * m * inner.max(1) + in_;
        for (k, v) in rebinned.into_iter().enumerate() {
            out[out_base + k * inner.max(1)] = v;
        }
    }

    let mut new_dims = dims.clone();
    new_dims.resize(dim, m)?;
    Ok((out, new_dims))
}

fn is_uniform(edges: &[f64]) -> bool {
    if edges.len() < 2 {
        return true;
    }
    let step = edges[1] - edges[0];
    edges.windows(2).all(|w| (w[1] - w[0] - step).abs() <= 1e-9 * step.abs().max(1.0))
}

/// Sparse/dense fused arithmetic (§4.7): multiply or divide each event's
/// implicit weight of 1 by the histogram bin of `weights` the event's
/// abscissa (via `sparse_coord`) falls into.
pub fn fused_sparse_dense_f64(
    sparse_coord: &[Vec<f64>],
    edges: &[f64],
    weights: &[f64],
    op: ArithOp,
) -> Result<Vec<Vec<f64>>, VariableError> {
    let k = weights.len();
    if edges.len() != k + 1 {
        return Err(SparseError::UnsupportedCombination("edges.len() must be weights.len() + 1").into());
    }
    if !is_uniform(edges) {
        return Err(SparseError::NonUniformEdges.into());
    }
    let offset = edges[0];
    let scale = k as f64 / (edges[k] - edges[0]);

    let rows = map_rows(sparse_coord.len(), |p| {
        sparse_coord[p]
            .iter()
            .map(|&e| {
                let bin = ((e - offset) * scale).floor();
                if bin >= 0.0 && (bin as usize) < k {
                    op.apply_pub(1.0, weights[bin as usize])
                } else {
                    op.apply_pub(1.0, 0.0)
                }
            })
            .collect()
    });
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;
    use crate::dimensions::Dimensions;

    #[test]
    fn rebin_identity_1d() {
        let old_coord = vec![0.0, 1.0, 2.0, 3.0];
        let new_coord = vec![0.0, 1.0, 2.0, 3.0];
        let data = vec![10.0, 20.0, 30.0];
        assert_eq!(rebin_row(&data, &old_coord, &new_coord).unwrap(), data);
    }

    #[test]
    fn rebin_merging() {
        let old_coord = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let new_coord = vec![0.0, 2.0, 4.0];
        let data = vec![1.0, 1.0, 1.0, 1.0];
        assert_eq!(rebin_row(&data, &old_coord, &new_coord).unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn rebin_partial_overlap() {
        let old_coord = vec![0.0, 2.0];
        let new_coord = vec![0.0, 1.0, 2.0];
        let data = vec![10.0];
        assert_eq!(rebin_row(&data, &old_coord, &new_coord).unwrap(), vec![5.0, 5.0]);
    }

    #[test]
    fn rebin_conserves_total_for_full_coverage() {
        let old_coord = vec![0.0, 1.0, 3.0, 6.0];
        let new_coord = vec![0.0, 2.0, 4.0, 6.0];
        let data = vec![1.0, 2.0, 3.0];
        let rebinned = rebin_row(&data, &old_coord, &new_coord).unwrap();
        let total_in: f64 = data.iter().sum();
        let total_out: f64 = rebinned.iter().sum();
        assert!((total_in - total_out).abs() < 1e-9);
    }

    #[test]
    fn rebin_row_rejects_mismatched_coord_length() {
        let old_coord = vec![0.0, 1.0, 2.0];
        let new_coord = vec![0.0, 2.0];
        let data = vec![1.0, 1.0, 1.0];
        assert!(rebin_row(&data, &old_coord, &new_coord).is_err());
    }

    #[test]
    fn rebin_dense_handles_outer_rows() {
        let dims = Dimensions::from_dense([(Dim::Y, 2), (Dim::X, 3)]).unwrap();
        let old = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let old_coord = vec![0.0, 1.0, 2.0, 3.0];
        let new_coord = vec![0.0, 3.0];
        let (out, new_dims) = rebin_dense_f64(&old, &dims, Dim::X, &old_coord, &new_coord).unwrap();
        assert_eq!(out, vec![3.0, 3.0]);
        assert_eq!(new_dims.extent(Dim::X).unwrap(), 1);
    }

    #[test]
    fn fused_event_op_bins_events() {
        let sparse = vec![vec![0.5, 1.5, 2.5]];
        let edges = vec![0.0, 1.0, 2.0, 3.0];
        let weights = vec![2.0, 4.0, 6.0];
        let result = fused_sparse_dense_f64(&sparse, &edges, &weights, ArithOp::Mul).unwrap();
        assert_eq!(result, vec![vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn fused_event_op_rejects_non_uniform_edges() {
        let sparse = vec![vec![0.5]];
        let edges = vec![0.0, 1.0, 5.0];
        let weights = vec![1.0, 1.0];
        assert!(fused_sparse_dense_f64(&sparse, &edges, &weights, ArithOp::Mul).is_err());
    }
}
