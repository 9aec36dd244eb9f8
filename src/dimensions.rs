// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Dimensions`: an ordered `(Dim, extent)` mapping, with an optional
//! sparse marker on the final axis.
//!
//! Grounded on the teacher's `Dimension` trait (`dimension/dimension_trait.rs`):
//! extent/stride bookkeeping, reshaped from a fixed-rank generic parameter
//! into a runtime ordered map keyed by label, since dims here are named
//! rather than positional.

use std::fmt;

use crate::dim::Dim;
use crate::error::{DimensionError, VariableError};

/// The length of one axis: a dense extent, or the sparse marker allowed
/// only on the innermost axis (§3.2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AxisLen {
    Dense(usize),
    Sparse,
}

impl AxisLen {
    pub fn is_sparse(self) -> bool {
        matches!(self, AxisLen::Sparse)
    }

    pub fn dense_or(self, default: usize) -> usize {
        match self {
            AxisLen::Dense(n) => n,
            AxisLen::Sparse => default,
        }
    }
}

/// An ordered sequence of `(label, extent)` pairs. The first label is the
/// outermost axis in memory, the last the innermost.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    labels: Vec<Dim>,
    lens: Vec<AxisLen>,
}

impl Dimensions {
    pub fn new() -> Self {
        Dimensions { labels: Vec::new(), lens: Vec::new() }
    }

    /// Construct from ordered `(label, extent)` pairs, all dense.
    pub fn from_dense(pairs: impl IntoIterator<Item = (Dim, usize)>) -> Result<Self, VariableError> {
        let mut dims = Dimensions::new();
        for (label, extent) in pairs {
            dims.add(label, AxisLen::Dense(extent))?;
        }
        Ok(dims)
    }

    /// Construct an ordered sequence whose last axis is sparse.
    pub fn from_dense_with_sparse_tail(
        dense: impl IntoIterator<Item = (Dim, usize)>,
        sparse_label: Dim,
    ) -> Result<Self, VariableError> {
        let mut dims = Dimensions::new();
        for (label, extent) in dense {
            dims.add(label, AxisLen::Dense(extent))?;
        }
        dims.add(sparse_label, AxisLen::Sparse)?;
        Ok(dims)
    }

    pub fn rank(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Dim] {
        &self.labels
    }

    pub fn is_sparse(&self) -> bool {
        self.lens.last().is_some_and(|l| l.is_sparse())
    }

    pub fn sparse_label(&self) -> Option<Dim> {
        if self.is_sparse() {
            self.labels.last().copied()
        } else {
            None
        }
    }

    pub fn contains(&self, label: Dim) -> bool {
        self.labels.contains(&label)
    }

    fn index_of(&self, label: Dim) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }

    /// Dense extent of `label`. Errors if the label is absent, or if it
    /// names the sparse axis (whose length varies per row).
    pub fn extent(&self, label: Dim) -> Result<usize, VariableError> {
        let i = self.index_of(label).ok_or(DimensionError::MissingLabel(label))?;
        match self.lens[i] {
            AxisLen::Dense(n) => Ok(n),
            AxisLen::Sparse => Err(DimensionError::SparseWhereDenseRequired(label).into()),
        }
    }

    pub fn axis_len(&self, label: Dim) -> Option<AxisLen> {
        self.index_of(label).map(|i| self.lens[i])
    }

    /// Row-major (C order) stride of `label`: the product of the dense
    /// extents of every axis that comes after it. Undefined (returns an
    /// error) for the sparse axis, which has no fixed per-row stride.
    pub fn stride(&self, label: Dim) -> Result<usize, VariableError> {
        let i = self.index_of(label).ok_or(DimensionError::MissingLabel(label))?;
        if self.lens[i].is_sparse() {
            return Err(DimensionError::SparseWhereDenseRequired(label).into());
        }
        let mut stride = 1usize;
        for &len in &self.lens[i + 1..] {
            match len {
                AxisLen::Dense(n) => stride *= n,
                AxisLen::Sparse => {}
            }
        }
        Ok(stride)
    }

    /// Product of the dense extents. Sparse axes (if any) are not
    /// included — `volume` counts the number of outer rows.
    pub fn volume(&self) -> usize {
        self.lens.iter().fold(1usize, |acc, &l| match l {
            AxisLen::Dense(n) => acc * n,
            AxisLen::Sparse => acc,
        })
    }

    /// Append a new, outermost-to-innermost-last label.
    pub fn add(&mut self, label: Dim, len: AxisLen) -> Result<(), VariableError> {
        if self.contains(label) {
            return Err(DimensionError::DuplicateLabel(label).into());
        }
        if let AxisLen::Sparse = len {
            // sparse marker only ever legal as the very last axis; enforced
            // by always appending and never inserting before it.
            if self.is_sparse() {
                return Err(DimensionError::SparseWhereDenseRequired(label).into());
            }
        } else if self.is_sparse() {
            // a dense axis may never be appended after the sparse one.
            return Err(DimensionError::SparseWhereDenseRequired(label).into());
        }
        self.labels.push(label);
        self.lens.push(len);
        Ok(())
    }

    pub fn resize(&mut self, label: Dim, n: usize) -> Result<(), VariableError> {
        let i = self.index_of(label).ok_or(DimensionError::MissingLabel(label))?;
        self.lens[i] = AxisLen::Dense(n);
        Ok(())
    }

    pub fn erase(&mut self, label: Dim) -> Result<(), VariableError> {
        let i = self.index_of(label).ok_or(DimensionError::MissingLabel(label))?;
        self.labels.remove(i);
        self.lens.remove(i);
        Ok(())
    }

    pub fn without(&self, label: Dim) -> Result<Dimensions, VariableError> {
        let mut out = self.clone();
        out.erase(label)?;
        Ok(out)
    }

    pub fn relabel(&mut self, i: usize, new_label: Dim) -> Result<(), VariableError> {
        if i >= self.labels.len() {
            return Err(DimensionError::MissingLabel(new_label).into());
        }
        if self.labels.iter().enumerate().any(|(j, &l)| j != i && l == new_label) {
            return Err(DimensionError::DuplicateLabel(new_label).into());
        }
        self.labels[i] = new_label;
        Ok(())
    }

    pub fn rename(&mut self, from: Dim, to: Dim) -> Result<(), VariableError> {
        let i = self.index_of(from).ok_or(DimensionError::MissingLabel(from))?;
        self.relabel(i, to)
    }

    /// True iff `self` is a contiguous sub-block of `other` under the same
    /// label order: same label sequence, and at most a single axis shrunk
    /// relative to `other`, with every axis outside it (more outer) sized
    /// 1 in `self` — the row-major condition for a sub-extent to still be
    /// one unbroken run rather than a strided series of gapped rows.
    pub fn is_contiguous_in(&self, other: &Dimensions) -> bool {
        if self.labels != other.labels {
            return false;
        }
        let mut seen_shrunk = false;
        for i in (0..self.labels.len()).rev() {
            let (mine, theirs) = (self.lens[i], other.lens[i]);
            match (mine, theirs) {
                (AxisLen::Sparse, AxisLen::Sparse) => {}
                (AxisLen::Dense(a), AxisLen::Dense(b)) => {
                    if seen_shrunk {
                        if a != 1 {
                            return false;
                        }
                    } else if a != b {
                        seen_shrunk = true;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Set containment, ignoring axis order: every label of `other` is
    /// present in `self` with the same extent.
    pub fn contains_dims(&self, other: &Dimensions) -> bool {
        other.labels.iter().zip(&other.lens).all(|(&label, &len)| {
            self.index_of(label).is_some_and(|i| self.lens[i] == len)
        })
    }

    /// True iff both describe the same set of `(label, extent)` pairs,
    /// regardless of order (used by `Variable::eq`, §4.3).
    pub fn same_set(&self, other: &Dimensions) -> bool {
        self.rank() == other.rank() && self.contains_dims(other) && other.contains_dims(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dim, AxisLen)> + '_ {
        self.labels.iter().copied().zip(self.lens.iter().copied())
    }

    /// Reorder axes according to `order` (a permutation of `0..rank()`).
    pub fn transposed(&self, order: &[usize]) -> Result<Dimensions, VariableError> {
        if order.len() != self.rank() {
            return Err(DimensionError::MissingLabel(Dim::Invalid).into());
        }
        let mut labels = Vec::with_capacity(order.len());
        let mut lens = Vec::with_capacity(order.len());
        for &i in order {
            labels.push(self.labels[i]);
            lens.push(self.lens[i]);
        }
        Ok(Dimensions { labels, lens })
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (label, len)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match len {
                AxisLen::Dense(n) => write!(f, "{label}: {n}")?,
                AxisLen::Sparse => write!(f, "{label}: sparse")?,
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_product_of_dense_extents() {
        let d = Dimensions::from_dense([(Dim::Y, 2), (Dim::X, 3)]).unwrap();
        assert_eq!(d.volume(), 6);
    }

    #[test]
    fn stride_is_row_major() {
        let d = Dimensions::from_dense([(Dim::Y, 2), (Dim::X, 3)]).unwrap();
        assert_eq!(d.stride(Dim::X).unwrap(), 1);
        assert_eq!(d.stride(Dim::Y).unwrap(), 3);
    }

    #[test]
    fn duplicate_label_rejected() {
        let mut d = Dimensions::new();
        d.add(Dim::X, AxisLen::Dense(3)).unwrap();
        assert!(d.add(Dim::X, AxisLen::Dense(4)).is_err());
    }

    #[test]
    fn same_set_ignores_order() {
        let a = Dimensions::from_dense([(Dim::Y, 2), (Dim::X, 3)]).unwrap();
        let b = Dimensions::from_dense([(Dim::X, 3), (Dim::Y, 2)]).unwrap();
        assert!(a.same_set(&b));
    }

    #[test]
    fn contiguous_sub_block() {
        let parent = Dimensions::from_dense([(Dim::Y, 4), (Dim::X, 3)]).unwrap();
        let mut child = parent.clone();
        child.resize(Dim::Y, 2).unwrap();
        assert!(child.is_contiguous_in(&parent));

        let mut non_contig = parent.clone();
        non_contig.resize(Dim::X, 2).unwrap();
        assert!(!non_contig.is_contiguous_in(&parent));
    }

    #[test]
    fn contiguous_requires_unit_extent_outside_a_shrunk_middle_axis() {
        let parent = Dimensions::from_dense([(Dim::Y, 2), (Dim::Z, 5), (Dim::X, 3)]).unwrap();

        let mut single_outer_row = parent.clone();
        single_outer_row.resize(Dim::Y, 1).unwrap();
        single_outer_row.resize(Dim::Z, 2).unwrap();
        assert!(single_outer_row.is_contiguous_in(&parent));

        let mut gapped = parent.clone();
        gapped.resize(Dim::Z, 2).unwrap();
        assert!(!gapped.is_contiguous_in(&parent));
    }

    #[test]
    fn sparse_tail_only() {
        let mut d = Dimensions::new();
        d.add(Dim::Y, AxisLen::Dense(3)).unwrap();
        d.add(Dim::X, AxisLen::Sparse).unwrap();
        assert!(d.add(Dim::Z, AxisLen::Dense(2)).is_err());
    }
}
