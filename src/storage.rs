// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Storage` (§3.5/§4.2): type-erased, copy-on-write ownership of a
//! contiguous buffer. Grounded directly on the teacher's
//! `DataMut for Rc<Vec<A>>` impl in `data_traits.rs` — `Rc::make_mut` is
//! exactly the "clone only detaches on first mutation" contract §5 asks
//! for, and it is unobservable from the outside, same as the teacher's.
//!
//! Per design note §9, the "View" half of the §3.5 concept is not a
//! `Storage` variant here — it is realized at the `Variable` level as a
//! borrowed lens (`crate::variable::VariableView`), so this module only
//! ever holds owned buffers.

use std::rc::Rc;

use crate::binning;
use crate::broadcast::{self, Relation};
use crate::buffer::Buffer;
use crate::dim::Dim;
use crate::dimensions::Dimensions;
use crate::dtype::{Arithmetic, ElementKind};
use crate::error::{KindError, SparseError, VariableError};
use crate::strided_view::{StridedView, StridedViewMut};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn apply<T>(self, a: T, b: T) -> T
    where
        T: std::ops::Add<Output = T>
            + std::ops::Sub<Output = T>
            + std::ops::Mul<Output = T>
            + std::ops::Div<Output = T>,
    {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }
    }

    /// Public entry point for callers outside this module (the sparse/dense
    /// fused kernel in `binning.rs`, which has no `Storage` to operate on).
    pub fn apply_pub<T>(self, a: T, b: T) -> T
    where
        T: std::ops::Add<Output = T>
            + std::ops::Sub<Output = T>
            + std::ops::Mul<Output = T>
            + std::ops::Div<Output = T>,
    {
        self.apply(a, b)
    }
}

#[derive(Clone, Debug)]
pub struct Storage {
    buffer: Rc<Buffer>,
}

impl Storage {
    pub fn from_buffer(buffer: Buffer) -> Self {
        Storage { buffer: Rc::new(buffer) }
    }

    pub fn zeroed(kind: ElementKind, n: usize) -> Self {
        Storage::from_buffer(Buffer::zeroed(kind, n))
    }

    pub fn kind(&self) -> ElementKind {
        self.buffer.kind()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Cheap aliasing clone: `Rc::clone`, O(1). Matches `clone_view()` in
    /// §4.2's table.
    pub fn clone_view(&self) -> Self {
        Storage { buffer: Rc::clone(&self.buffer) }
    }

    /// Deep copy: always allocates a fresh buffer. Matches `clone()` in
    /// §4.2's table.
    pub fn deep_clone(&self) -> Self {
        Storage { buffer: Rc::new((*self.buffer).clone()) }
    }

    /// Obtain a uniquely-owned `&mut Buffer`, copying first if this
    /// storage is currently shared (COW detach, §5).
    pub fn make_mut(&mut self) -> &mut Buffer {
        Rc::make_mut(&mut self.buffer)
    }

    pub fn resize(&self, kind: ElementKind, dims: &Dimensions) -> Self {
        Storage::zeroed(kind, dims.volume())
    }

    /// Elementwise equality under `iteration_dims`' order (§4.2).
    pub fn equals(&self, self_dims: &Dimensions, other: &Storage, other_dims: &Dimensions) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        macro_rules! cmp {
            ($variant:ident) => {{
                let (Buffer::$variant(a), Buffer::$variant(b)) = (&*self.buffer, &*other.buffer) else {
                    return false;
                };
                let (Ok(va), Ok(vb)) = (
                    StridedView::new(a, 0, self_dims, self_dims),
                    StridedView::new(b, 0, other_dims, self_dims),
                ) else {
                    return false;
                };
                va.eq(vb)
            }};
        }
        match self.kind() {
            ElementKind::Bool => cmp!(Bool),
            ElementKind::I32 => cmp!(I32),
            ElementKind::I64 => cmp!(I64),
            ElementKind::F32 => cmp!(F32),
            ElementKind::F64 => cmp!(F64),
            ElementKind::Str => cmp!(Str),
            ElementKind::Vector3 => cmp!(Vector3),
            ElementKind::Dataset => cmp!(Dataset),
            ElementKind::EventListF64 => cmp!(EventListF64),
            ElementKind::EventListF32 => cmp!(EventListF32),
        }
    }

    /// Copy the block `[other_begin, other_end)` of `other` along `dim`
    /// into `self` starting at `self_offset` along the same dim (§4.2).
    pub fn copy_into(
        &mut self,
        self_dims: &Dimensions,
        dim: Dim,
        self_offset: usize,
        other: &Storage,
        other_dims: &Dimensions,
        other_begin: usize,
        other_end: usize,
    ) -> Result<(), VariableError> {
        if self.kind() != other.kind() {
            return Err(KindError::Mismatch { expected: self.kind(), actual: other.kind() }.into());
        }
        macro_rules! copy {
            ($variant:ident) => {{
                let dst_stride = self_dims.stride(dim)?;
                let src_stride = other_dims.stride(dim)?;
                let n_rows = other_dims.volume() / other_dims.extent(dim)?.max(1);
                let row_len_dst = self_dims.extent(dim)? * dst_stride;
                let row_len_src = other_dims.extent(dim)? * src_stride;
                let block_len = (other_end - other_begin) * src_stride;
                let Buffer::$variant(src) = &*other.buffer else { unreachable!() };
                let Buffer::$variant(dst) = self.make_mut() else { unreachable!() };
                for row in 0..n_rows {
                    let src_off = row * row_len_src + other_begin * src_stride;
                    let dst_off = row * row_len_dst + self_offset * dst_stride;
                    dst[dst_off..dst_off + block_len].clone_from_slice(&src[src_off..src_off + block_len]);
                }
                Ok(())
            }};
        }
        match self.kind() {
            ElementKind::Bool => copy!(Bool),
            ElementKind::I32 => copy!(I32),
            ElementKind::I64 => copy!(I64),
            ElementKind::F32 => copy!(F32),
            ElementKind::F64 => copy!(F64),
            ElementKind::Str => copy!(Str),
            ElementKind::Vector3 => copy!(Vector3),
            ElementKind::Dataset => copy!(Dataset),
            ElementKind::EventListF64 | ElementKind::EventListF32 => {
                self.copy_sparse_rows_into(dim, self_offset, other, other_begin, other_end)
            }
        }
    }

    fn copy_sparse_rows_into(
        &mut self,
        _dim: Dim,
        self_offset: usize,
        other: &Storage,
        other_begin: usize,
        other_end: usize,
    ) -> Result<(), VariableError> {
        match (self.make_mut(), &*other.buffer) {
            (Buffer::EventListF64(dst), Buffer::EventListF64(src)) => {
                for (i, row) in src[other_begin..other_end].iter().enumerate() {
                    dst[self_offset + i] = row.clone();
                }
                Ok(())
            }
            (Buffer::EventListF32(dst), Buffer::EventListF32(src)) => {
                for (i, row) in src[other_begin..other_end].iter().enumerate() {
                    dst[self_offset + i] = row.clone();
                }
                Ok(())
            }
            _ => Err(KindError::Mismatch { expected: self.kind(), actual: other.kind() }.into()),
        }
    }

    /// `self += / -= / *= / /= other`, with `other` broadcast to
    /// `self_dims` when `self_dims` strictly contains `other_dims` (§4.2,
    /// §4.4 rule 2). Errors before any write if kinds mismatch, the kind
    /// is non-arithmetic, or the dims relation isn't a valid broadcast.
    pub fn in_place_op(
        &mut self,
        self_dims: &Dimensions,
        other: &Storage,
        other_dims: &Dimensions,
        op: ArithOp,
    ) -> Result<(), VariableError> {
        if self.kind() != other.kind() {
            return Err(KindError::Mismatch { expected: self.kind(), actual: other.kind() }.into());
        }
        if self.kind().arithmetic() != Arithmetic::Numeric {
            return Err(KindError::NotArithmetic(self.kind()).into());
        }
        match broadcast::classify(self_dims, other_dims)? {
            Relation::RhsContainsLhs => {
                return Err(crate::error::DimensionError::Mismatch {
                    expected: format!("{self_dims}"),
                    actual: format!("{other_dims}"),
                }
                .into());
            }
            _ => {}
        }
        macro_rules! run {
            ($variant:ident) => {{
                let Buffer::$variant(src) = &*other.buffer else { unreachable!() };
                let src_view = StridedView::new(src, 0, other_dims, self_dims)?;
                let Buffer::$variant(dst) = self.make_mut() else { unreachable!() };
                let dst_view = StridedViewMut::new(dst, 0, self_dims, self_dims)?;
                for (d, s) in dst_view.zip(src_view) {
                    *d = op.apply(*d, *s);
                }
                Ok(())
            }};
        }
        match self.kind() {
            ElementKind::I32 => run!(I32),
            ElementKind::I64 => run!(I64),
            ElementKind::F32 => run!(F32),
            ElementKind::F64 => run!(F64),
            _ => unreachable!("checked arithmetic eligibility above"),
        }
    }

    /// Reduction-shaped accumulation used by `sum` (§4.3, §4.4 rule 3):
    /// `self_dims` is `src_dims` with `reduced` erased; every element of
    /// `src` is added into the corresponding (broadcast) cell of `self`.
    pub fn accumulate_reduce(
        &mut self,
        self_dims: &Dimensions,
        src: &Storage,
        src_dims: &Dimensions,
    ) -> Result<(), VariableError> {
        if self.kind() != src.kind() {
            return Err(KindError::Mismatch { expected: self.kind(), actual: src.kind() }.into());
        }
        if self.kind().arithmetic() != Arithmetic::Numeric {
            return Err(KindError::NotArithmetic(self.kind()).into());
        }
        macro_rules! run {
            ($variant:ident) => {{
                let Buffer::$variant(srcv) = &*src.buffer else { unreachable!() };
                let src_view = StridedView::new(srcv, 0, src_dims, src_dims)?;
                let Buffer::$variant(dst) = self.make_mut() else { unreachable!() };
                let dst_view = StridedViewMut::new_allow_broadcast(dst, 0, self_dims, src_dims)?;
                for (d, s) in dst_view.zip(src_view) {
                    *d = *d + *s;
                }
                Ok(())
            }};
        }
        match self.kind() {
            ElementKind::I32 => run!(I32),
            ElementKind::I64 => run!(I64),
            ElementKind::F32 => run!(F32),
            ElementKind::F64 => run!(F64),
            _ => unreachable!("checked arithmetic eligibility above"),
        }
    }

    /// Histogram rebinning (§4.2/§4.6): the `rebin(old_storage, dim,
    /// old_coord, new_coord)` entry of §4.2's operation table. Dispatches on
    /// kind: `F64` goes straight to `binning::rebin_dense_f64`, `F32` casts
    /// through `f64` and back (the area-overlap math needs float division
    /// regardless of storage width), everything else is rejected — see
    /// SPEC_FULL.md §11 for why the exclusion is narrower than "non-numeric".
    pub fn rebin(
        &self,
        dims: &Dimensions,
        dim: Dim,
        old_coord: &[f64],
        new_coord: &[f64],
    ) -> Result<(Storage, Dimensions), VariableError> {
        match self.kind() {
            ElementKind::F64 => {
                let values = self.buffer().as_f64()?;
                let (data, new_dims) = binning::rebin_dense_f64(values, dims, dim, old_coord, new_coord)?;
                Ok((Storage::from_buffer(Buffer::F64(data)), new_dims))
            }
            ElementKind::F32 => {
                let values = self.buffer().as_f32()?;
                let values64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
                let (data, new_dims) = binning::rebin_dense_f64(&values64, dims, dim, old_coord, new_coord)?;
                let data32: Vec<f32> = data.into_iter().map(|v| v as f32).collect();
                Ok((Storage::from_buffer(Buffer::F32(data32)), new_dims))
            }
            other => Err(SparseError::RebinOnNonArithmetic(other).into()),
        }
    }

    /// Mask OR-combination used by Dataset arithmetic (§6): logical-or of
    /// two `Bool` storages, broadcasting `other` to `self_dims`.
    pub fn or_in_place(&mut self, self_dims: &Dimensions, other: &Storage, other_dims: &Dimensions) -> Result<(), VariableError> {
        if self.kind() != ElementKind::Bool || other.kind() != ElementKind::Bool {
            return Err(KindError::Mismatch { expected: ElementKind::Bool, actual: other.kind() }.into());
        }
        let Buffer::Bool(src) = &*other.buffer else { unreachable!() };
        let src_view = StridedView::new(src, 0, other_dims, self_dims)?;
        let Buffer::Bool(dst) = self.make_mut() else { unreachable!() };
        let dst_view = StridedViewMut::new(dst, 0, self_dims, self_dims)?;
        for (d, s) in dst_view.zip(src_view) {
            *d = *d || *s;
        }
        Ok(())
    }
}

impl PartialEq for Storage {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer) || *self.buffer == *other.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;

    fn dims(pairs: &[(Dim, usize)]) -> Dimensions {
        Dimensions::from_dense(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn clone_view_is_cheap_alias_until_mutated() {
        let a = Storage::from_buffer(Buffer::F64(vec![1.0, 2.0, 3.0]));
        let mut b = a.clone_view();
        assert_eq!(a, b);
        b.make_mut();
        assert_eq!(a.buffer().as_f64().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn in_place_add_broadcasts_rhs() {
        let d = dims(&[(Dim::Y, 2), (Dim::X, 3)]);
        let mut a = Storage::from_buffer(Buffer::F64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let b_dims = dims(&[(Dim::X, 3)]);
        let b = Storage::from_buffer(Buffer::F64(vec![10.0, 20.0, 30.0]));
        a.in_place_op(&d, &b, &b_dims, ArithOp::Add).unwrap();
        assert_eq!(a.buffer().as_f64().unwrap(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn in_place_op_rejects_non_arithmetic_kind() {
        let d = dims(&[(Dim::X, 2)]);
        let mut a = Storage::from_buffer(Buffer::Str(vec!["a".into(), "b".into()]));
        let b = Storage::from_buffer(Buffer::Str(vec!["c".into(), "d".into()]));
        assert!(a.in_place_op(&d, &b, &d, ArithOp::Add).is_err());
    }

    #[test]
    fn rebin_dispatches_f64_directly() {
        let d = dims(&[(Dim::X, 2)]);
        let a = Storage::from_buffer(Buffer::F64(vec![10.0, 10.0]));
        let (out, new_dims) = a.rebin(&d, Dim::X, &[0.0, 1.0, 2.0], &[0.0, 2.0]).unwrap();
        assert_eq!(out.buffer().as_f64().unwrap(), &[20.0]);
        assert_eq!(new_dims.extent(Dim::X).unwrap(), 1);
    }

    #[test]
    fn rebin_casts_f32_through_f64() {
        let d = dims(&[(Dim::X, 2)]);
        let a = Storage::from_buffer(Buffer::F32(vec![10.0, 10.0]));
        let (out, _) = a.rebin(&d, Dim::X, &[0.0, 1.0, 2.0], &[0.0, 2.0]).unwrap();
        assert_eq!(out.buffer().as_f32().unwrap(), &[20.0]);
    }

    #[test]
    fn rebin_rejects_non_float_kind() {
        let d = dims(&[(Dim::X, 2)]);
        let a = Storage::from_buffer(Buffer::I32(vec![10, 10]));
        assert!(a.rebin(&d, Dim::X, &[0.0, 1.0, 2.0], &[0.0, 2.0]).is_err());
    }

    #[test]
    fn accumulate_reduce_sums_over_erased_axis() {
        let src_dims = dims(&[(Dim::Y, 2), (Dim::X, 3)]);
        let dst_dims = dims(&[(Dim::X, 3)]);
        let mut dst = Storage::zeroed(ElementKind::F64, 3);
        let src = Storage::from_buffer(Buffer::F64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        dst.accumulate_reduce(&dst_dims, &src, &src_dims).unwrap();
        assert_eq!(dst.buffer().as_f64().unwrap(), &[5.0, 7.0, 9.0]);
    }
}
