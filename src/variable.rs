// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Variable` (§3.4, §4.3): unit, dims, storage, plus slicing, reshaping,
//! transposition, elementwise arithmetic and comparison, and concatenation.
//! Grounded on the teacher's `impl_methods.rs` (method shapes for `slice`,
//! `reversed_axes`, `into_shape`) and `arraytraits.rs` (operator trait impls
//! such as `impl Add for ArrayBase`).
//!
//! Views are modelled per design note §9 as a borrowed lens rather than a
//! parallel type hierarchy: a `VariableView`/`VariableViewMut` carries no
//! data of its own, only a reference to the owning `Variable`, the visible
//! `Dimensions`, and a base offset into the parent's buffer. Because a slice
//! of a view still only ever has one concrete `Variable` backing its memory
//! (views cannot nest past the root), both view types flatten straight to
//! `&'a Variable`/`&'a mut Variable` regardless of how many times `.slice()`
//! is chained.

use std::fmt;

use crate::binning;
use crate::broadcast::{self, Relation};
use crate::buffer::Buffer;
use crate::dim::Dim;
use crate::dimensions::Dimensions;
use crate::dtype::{Arithmetic, ElementKind};
use crate::error::{DimensionError, KindError, SliceError, SparseError, UnitError, VariableError};
use crate::storage::{ArithOp, Storage};
use crate::strided_view::{StridedView, StridedViewMut};
use crate::transform::{map_unary_float, UnaryFloatOps};
use crate::units::Unit;

/// End of a slice descriptor (§3.6). `Index` takes a single element and
/// drops the dimension from the result; `Exclusive` keeps the dimension with
/// a shrunken extent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SliceEnd {
    Index(usize),
    Exclusive(usize),
}

/// Read-only access shared by `Variable` and `VariableView`: dims, unit,
/// kind, and the (buffer, parent dims, base offset) triple a `StridedView`
/// needs to walk the visible region.
pub trait AsVariable {
    fn dims(&self) -> &Dimensions;
    fn unit(&self) -> &Unit;
    fn kind(&self) -> ElementKind;
    fn name(&self) -> Option<&str>;
    fn buffer(&self) -> &Buffer;
    /// The `Dimensions` the backing buffer is actually laid out under.
    fn parent_dims(&self) -> &Dimensions;
    fn base_offset(&self) -> usize;
}

#[derive(Clone)]
pub struct Variable {
    unit: Unit,
    dims: Dimensions,
    data: Storage,
    name: Option<String>,
}

impl AsVariable for Variable {
    fn dims(&self) -> &Dimensions {
        &self.dims
    }
    fn unit(&self) -> &Unit {
        &self.unit
    }
    fn kind(&self) -> ElementKind {
        self.data.kind()
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    fn buffer(&self) -> &Buffer {
        self.data.buffer()
    }
    fn parent_dims(&self) -> &Dimensions {
        &self.dims
    }
    fn base_offset(&self) -> usize {
        0
    }
}

/// A borrowed, read-only lens into a `Variable` (§3.5/§4.3). Never outlives
/// its parent (enforced by the `'a` borrow); a mutable view of the same
/// parent cannot coexist, since `slice_mut` takes `&mut Variable` exclusively.
pub struct VariableView<'a> {
    parent: &'a Variable,
    dims: Dimensions,
    base_offset: usize,
}

impl<'a> AsVariable for VariableView<'a> {
    fn dims(&self) -> &Dimensions {
        &self.dims
    }
    fn unit(&self) -> &Unit {
        self.parent.unit()
    }
    fn kind(&self) -> ElementKind {
        self.parent.kind()
    }
    fn name(&self) -> Option<&str> {
        self.parent.name()
    }
    fn buffer(&self) -> &Buffer {
        self.parent.buffer()
    }
    fn parent_dims(&self) -> &Dimensions {
        self.parent.parent_dims()
    }
    fn base_offset(&self) -> usize {
        self.base_offset
    }
}

impl<'a> VariableView<'a> {
    pub fn to_owned(&self) -> Result<Variable, VariableError> {
        materialize(self)
    }

    /// Further slice a view (§4.3: "operate on Variable and on slice-views
    /// uniformly"). Stays flattened to the same root `&'a Variable`.
    pub fn slice(&self, dim: Dim, begin: usize, end: SliceEnd) -> Result<VariableView<'a>, VariableError> {
        let (new_dims, extra_offset) = slice_dims(&self.dims, self.parent_dims(), dim, begin, end)?;
        Ok(VariableView { parent: self.parent, dims: new_dims, base_offset: self.base_offset + extra_offset })
    }

    /// Further reorder the axes of a view (§4.3), same rationale as
    /// `Variable::transpose`: only `dims`' label order changes, `base_offset`
    /// and the root `parent` are untouched.
    pub fn transpose(&self, order: &[usize]) -> Result<VariableView<'a>, VariableError> {
        let dims = self.dims.transposed(order)?;
        Ok(VariableView { parent: self.parent, dims, base_offset: self.base_offset })
    }

    /// `reshape` on a view (§4.3: "on a view it forces a contiguous copy
    /// first") — materialize, then relabel.
    pub fn reshape(&self, new_dims: Dimensions) -> Result<Variable, VariableError> {
        self.to_owned()?.reshape(new_dims)
    }
}

/// A borrowed, mutable lens. While it is alive it exclusively borrows the
/// parent `Variable`; the borrow checker enforces the "no other view may
/// exist" rule from §5 directly, with no runtime bookkeeping required.
pub struct VariableViewMut<'a> {
    parent: &'a mut Variable,
    dims: Dimensions,
    base_offset: usize,
}

impl<'a> VariableViewMut<'a> {
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn kind(&self) -> ElementKind {
        self.parent.kind()
    }

    /// Unlike `Variable::checked_assign`, a view can't just adopt the
    /// result unit on Mul/Div: the parent's unit is shared with whatever
    /// is outside this slice, so a unit change here would silently corrupt
    /// it for the rest of the Variable. Only proceed when the computed
    /// result unit equals what the parent already carries (e.g. scaling by
    /// a dimensionless factor); otherwise reject with
    /// `UnitError::ChangeOnPartialView`.
    fn checked_assign<A: AsVariable>(&mut self, rhs: &A, op: ArithOp) -> Result<(), VariableError> {
        check_arith_unit(self.parent.unit(), rhs.unit(), op)?;
        if let ArithOp::Mul | ArithOp::Div = op {
            let new_unit = result_unit(self.parent.unit(), rhs.unit(), op);
            if &new_unit != self.parent.unit() {
                return Err(UnitError::ChangeOnPartialView.into());
            }
        }
        arith_assign_into(self.parent.data.make_mut(), self.parent.dims(), self.base_offset, &self.dims, rhs, op)
    }

    pub fn add_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Add)
    }
    pub fn sub_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Sub)
    }
    pub fn mul_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Mul)
    }
    pub fn div_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Div)
    }

    /// Assign `rhs`'s values into this slice in place ("slice assignment",
    /// §3.4's lifecycle list), requiring identical dims (no broadcast).
    pub fn assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        if !self.dims.same_set(rhs.dims()) {
            return Err(DimensionError::Mismatch {
                expected: format!("{}", self.dims),
                actual: format!("{}", rhs.dims()),
            }
            .into());
        }
        if self.kind() != rhs.kind() {
            return Err(KindError::Mismatch { expected: self.kind(), actual: rhs.kind() }.into());
        }
        copy_into_offset(self.parent.data.make_mut(), self.parent.dims(), self.base_offset, &self.dims, rhs)
    }
}

fn materialize<A: AsVariable>(v: &A) -> Result<Variable, VariableError> {
    let dims = v.dims().clone();
    macro_rules! copy_dense {
        ($variant:ident) => {{
            let src = v.buffer().$variant()?;
            let view = StridedView::new(src, v.base_offset(), v.parent_dims(), &dims)?;
            view.copied().collect::<Vec<_>>()
        }};
    }
    let buffer = match v.kind() {
        ElementKind::Bool => Buffer::Bool(copy_dense!(as_bool)),
        ElementKind::I32 => Buffer::I32(copy_dense!(as_i32)),
        ElementKind::I64 => Buffer::I64(copy_dense!(as_i64)),
        ElementKind::F32 => Buffer::F32(copy_dense!(as_f32)),
        ElementKind::F64 => Buffer::F64(copy_dense!(as_f64)),
        ElementKind::Str => {
            let src = v.buffer().as_str()?;
            let view = StridedView::new(src, v.base_offset(), v.parent_dims(), &dims)?;
            Buffer::Str(view.cloned().collect())
        }
        ElementKind::Vector3 => {
            let src = v.buffer().as_vector3()?;
            let view = StridedView::new(src, v.base_offset(), v.parent_dims(), &dims)?;
            Buffer::Vector3(view.copied().collect())
        }
        ElementKind::Dataset => {
            let src = v.buffer().as_dataset()?;
            let view = StridedView::new(src, v.base_offset(), v.parent_dims(), &dims)?;
            Buffer::Dataset(view.cloned().collect())
        }
        ElementKind::EventListF64 => {
            let src = v.buffer().as_events_f64()?;
            let (dd, pd) = (dense_dims(&dims), dense_dims(v.parent_dims()));
            let view = StridedView::new(src, v.base_offset(), &pd, &dd)?;
            Buffer::EventListF64(view.cloned().collect())
        }
        ElementKind::EventListF32 => {
            let src = v.buffer().as_events_f32()?;
            let (dd, pd) = (dense_dims(&dims), dense_dims(v.parent_dims()));
            let view = StridedView::new(src, v.base_offset(), &pd, &dd)?;
            Buffer::EventListF32(view.cloned().collect())
        }
    };
    Ok(Variable { unit: v.unit().clone(), dims, data: Storage::from_buffer(buffer), name: v.name().map(String::from) })
}

fn dense_dims(d: &Dimensions) -> Dimensions {
    match d.sparse_label() {
        Some(label) => d.without(label).expect("sparse label is present"),
        None => d.clone(),
    }
}

/// Compute a sliced view's visible `Dimensions` plus the additional flat
/// offset (in units of `parent_dims`' own stride for `dim`) the slice
/// introduces, given the *current* visible dims `dims` of the thing being
/// sliced and the root `parent_dims` layout it is backed by.
fn slice_dims(
    dims: &Dimensions,
    parent_dims: &Dimensions,
    dim: Dim,
    begin: usize,
    end: SliceEnd,
) -> Result<(Dimensions, usize), VariableError> {
    let extent = dims.extent(dim)?;
    let end_excl = match end {
        SliceEnd::Index(i) => i + 1,
        SliceEnd::Exclusive(e) => e,
    };
    if begin > end_excl {
        return Err(SliceError::BeginAfterEnd { begin: begin as isize, end: end_excl as isize }.into());
    }
    if end_excl > extent {
        return Err(SliceError::OutOfRange { dim, begin: begin as isize, end: end_excl as isize, extent }.into());
    }
    let mut new_dims = dims.clone();
    match end {
        SliceEnd::Index(_) => new_dims.erase(dim)?,
        SliceEnd::Exclusive(_) => new_dims.resize(dim, end_excl - begin)?,
    }
    let stride = parent_dims.stride(dim)?;
    Ok((new_dims, begin * stride))
}

fn check_arith_unit(lhs: &Unit, rhs: &Unit, op: ArithOp) -> Result<(), VariableError> {
    match op {
        ArithOp::Add | ArithOp::Sub => {
            if lhs != rhs {
                return Err(UnitError::Incompatible { lhs: lhs.to_string(), rhs: rhs.to_string() }.into());
            }
        }
        ArithOp::Mul | ArithOp::Div => {}
    }
    Ok(())
}

fn result_unit(lhs: &Unit, rhs: &Unit, op: ArithOp) -> Unit {
    match op {
        ArithOp::Add | ArithOp::Sub => lhs.clone(),
        ArithOp::Mul => lhs * rhs,
        ArithOp::Div => lhs / rhs,
    }
}

/// Offset-aware, kind-dispatched `dst += / -= / *= / /= rhs`. Shared by
/// `Variable`'s own compound-assignment operators (where `dst_offset == 0`
/// and `dst_parent_dims == dst_view_dims`) and by `VariableViewMut` (where
/// they differ). Mirrors `Storage::in_place_op` but threads the base offset
/// a slice-view introduces through to `StridedView`/`StridedViewMut`.
fn arith_assign_into<A: AsVariable>(
    dst_buf: &mut Buffer,
    dst_parent_dims: &Dimensions,
    dst_offset: usize,
    dst_view_dims: &Dimensions,
    rhs: &A,
    op: ArithOp,
) -> Result<(), VariableError> {
    if dst_buf.kind() != rhs.kind() {
        return Err(KindError::Mismatch { expected: dst_buf.kind(), actual: rhs.kind() }.into());
    }
    if dst_buf.kind().arithmetic() != Arithmetic::Numeric {
        return Err(KindError::NotArithmetic(dst_buf.kind()).into());
    }
    if let Relation::RhsContainsLhs = broadcast::classify(dst_view_dims, rhs.dims())? {
        return Err(DimensionError::Mismatch {
            expected: format!("{dst_view_dims}"),
            actual: format!("{}", rhs.dims()),
        }
        .into());
    }

    // §4.4 rule 1: when both sides are contiguous sub-blocks of their own
    // parent under the same label order, walk matching flat slices directly
    // rather than paying for a pair of strided cursors.
    let contiguous = dst_view_dims == rhs.dims()
        && dst_view_dims.is_contiguous_in(dst_parent_dims)
        && rhs.dims().is_contiguous_in(rhs.parent_dims());

    if contiguous {
        let len = dst_view_dims.volume();
        macro_rules! run_flat {
            ($variant:ident, $acc:ident) => {{
                let src_full = rhs.buffer().$acc()?;
                let src_slice = &src_full[rhs.base_offset()..rhs.base_offset() + len];
                let Buffer::$variant(dst_full) = dst_buf else { unreachable!() };
                let dst_slice = &mut dst_full[dst_offset..dst_offset + len];
                for (d, s) in dst_slice.iter_mut().zip(src_slice) {
                    *d = op.apply_pub(*d, *s);
                }
                return Ok(());
            }};
        }
        match dst_buf.kind() {
            ElementKind::I32 => run_flat!(I32, as_i32),
            ElementKind::I64 => run_flat!(I64, as_i64),
            ElementKind::F32 => run_flat!(F32, as_f32),
            ElementKind::F64 => run_flat!(F64, as_f64),
            _ => unreachable!("checked arithmetic eligibility above"),
        }
    }

    macro_rules! run {
        ($variant:ident, $acc:ident) => {{
            let src_full = rhs.buffer().$acc()?;
            let src_view = StridedView::new(src_full, rhs.base_offset(), rhs.parent_dims(), dst_view_dims)?;
            let Buffer::$variant(dst_full) = dst_buf else { unreachable!() };
            let dst_view = StridedViewMut::new(dst_full, dst_offset, dst_parent_dims, dst_view_dims)?;
            for (d, s) in dst_view.zip(src_view) {
                *d = op.apply_pub(*d, *s);
            }
            Ok(())
        }};
    }
    match dst_buf.kind() {
        ElementKind::I32 => run!(I32, as_i32),
        ElementKind::I64 => run!(I64, as_i64),
        ElementKind::F32 => run!(F32, as_f32),
        ElementKind::F64 => run!(F64, as_f64),
        _ => unreachable!("checked arithmetic eligibility above"),
    }
}

/// Offset-aware slice assignment: copy `rhs`'s values (in `dst_view_dims`'
/// order) into `dst_buf` at `dst_offset`, dims-for-dims identical (no
/// broadcast, no reduction — a plain overwrite).
fn copy_into_offset<A: AsVariable>(
    dst_buf: &mut Buffer,
    dst_parent_dims: &Dimensions,
    dst_offset: usize,
    dst_view_dims: &Dimensions,
    rhs: &A,
) -> Result<(), VariableError> {
    macro_rules! run {
        ($variant:ident, $acc:ident) => {{
            let src_full = rhs.buffer().$acc()?;
            let src_view = StridedView::new(src_full, rhs.base_offset(), rhs.parent_dims(), dst_view_dims)?;
            let Buffer::$variant(dst_full) = dst_buf else { unreachable!() };
            let dst_view = StridedViewMut::new(dst_full, dst_offset, dst_parent_dims, dst_view_dims)?;
            for (d, s) in dst_view.zip(src_view) {
                *d = s.clone();
            }
            Ok(())
        }};
    }
    match dst_buf.kind() {
        ElementKind::Bool => run!(Bool, as_bool),
        ElementKind::I32 => run!(I32, as_i32),
        ElementKind::I64 => run!(I64, as_i64),
        ElementKind::F32 => run!(F32, as_f32),
        ElementKind::F64 => run!(F64, as_f64),
        ElementKind::Str => run!(Str, as_str),
        ElementKind::Vector3 => run!(Vector3, as_vector3),
        ElementKind::Dataset => run!(Dataset, as_dataset),
        ElementKind::EventListF64 | ElementKind::EventListF32 => {
            Err(SparseError::UnsupportedCombination("slice assignment of sparse rows is unsupported").into())
        }
    }
}

/// Elementwise equality (§4.3): units, names, dims (any permutation), and
/// every element under the LHS's iteration order must agree.
pub fn variables_eq<A: AsVariable, B: AsVariable>(a: &A, b: &B) -> bool {
    if a.unit() != b.unit() || a.name() != b.name() {
        return false;
    }
    if !a.dims().same_set(b.dims()) {
        return false;
    }
    if a.kind() != b.kind() {
        return false;
    }
    macro_rules! cmp_dense {
        ($acc:ident) => {{
            let (Ok(sa), Ok(sb)) = (a.buffer().$acc(), b.buffer().$acc()) else { return false };
            match (
                StridedView::new(sa, a.base_offset(), a.parent_dims(), a.dims()),
                StridedView::new(sb, b.base_offset(), b.parent_dims(), a.dims()),
            ) {
                (Ok(va), Ok(vb)) => va.eq(vb),
                _ => false,
            }
        }};
    }
    macro_rules! cmp_sparse {
        ($acc:ident) => {{
            let (Ok(sa), Ok(sb)) = (a.buffer().$acc(), b.buffer().$acc()) else { return false };
            let da = dense_dims(a.dims());
            let pa = dense_dims(a.parent_dims());
            let pb = dense_dims(b.parent_dims());
            match (StridedView::new(sa, a.base_offset(), &pa, &da), StridedView::new(sb, b.base_offset(), &pb, &da)) {
                (Ok(va), Ok(vb)) => va.eq(vb),
                _ => false,
            }
        }};
    }
    match a.kind() {
        ElementKind::Bool => cmp_dense!(as_bool),
        ElementKind::I32 => cmp_dense!(as_i32),
        ElementKind::I64 => cmp_dense!(as_i64),
        ElementKind::F32 => cmp_dense!(as_f32),
        ElementKind::F64 => cmp_dense!(as_f64),
        ElementKind::Str => cmp_dense!(as_str),
        ElementKind::Vector3 => cmp_dense!(as_vector3),
        ElementKind::Dataset => cmp_dense!(as_dataset),
        ElementKind::EventListF64 => cmp_sparse!(as_events_f64),
        ElementKind::EventListF32 => cmp_sparse!(as_events_f32),
    }
}

impl Variable {
    /// `make_variable` (§6): construct from an explicit buffer, checking
    /// `data.element_count == dims.volume()` for dense kinds (§3.4's
    /// invariant) or row-count for sparse kinds.
    pub fn make_variable(unit: Unit, dims: Dimensions, buffer: Buffer) -> Result<Variable, VariableError> {
        let expected = dims.volume();
        if buffer.len() != expected {
            return Err(DimensionError::Mismatch {
                expected: format!("{expected} elements"),
                actual: format!("{} elements", buffer.len()),
            }
            .into());
        }
        if buffer.kind().is_sparse() != dims.is_sparse() {
            return Err(DimensionError::SparseWhereDenseRequired(dims.sparse_label().unwrap_or(Dim::Invalid)).into());
        }
        Ok(Variable { unit, dims, data: Storage::from_buffer(buffer), name: None })
    }

    /// `zero_variable` (§6): default-initialized buffer of the given kind.
    pub fn zero_variable(kind: ElementKind, unit: Unit, dims: Dimensions) -> Variable {
        let n = dims.volume();
        Variable { unit, dims, data: Storage::zeroed(kind, n), name: None }
    }

    /// `from_scalar` (§6): a rank-0 Variable holding a single `f64`.
    pub fn from_scalar(value: f64, unit: Unit) -> Variable {
        Variable { unit, dims: Dimensions::new(), data: Storage::from_buffer(Buffer::F64(vec![value])), name: None }
    }

    /// Convenience constructor used throughout the test suite and by
    /// `Dataset`: a dense `f64` Variable from explicit values.
    pub fn from_f64(unit: Unit, dims: Dimensions, values: Vec<f64>) -> Result<Variable, VariableError> {
        Self::make_variable(unit, dims, Buffer::F64(values))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn values_f64(&self) -> Result<&[f64], VariableError> {
        self.data.buffer().as_f64()
    }
    pub fn values_f32(&self) -> Result<&[f32], VariableError> {
        self.data.buffer().as_f32()
    }
    pub fn values_i32(&self) -> Result<&[i32], VariableError> {
        self.data.buffer().as_i32()
    }
    pub fn values_i64(&self) -> Result<&[i64], VariableError> {
        self.data.buffer().as_i64()
    }
    pub fn values_bool(&self) -> Result<&[bool], VariableError> {
        self.data.buffer().as_bool()
    }
    pub fn values_str(&self) -> Result<&[String], VariableError> {
        self.data.buffer().as_str()
    }
    pub fn sparse_values_f64(&self) -> Result<&[Vec<f64>], VariableError> {
        self.data.buffer().as_events_f64()
    }
    pub fn sparse_values_f32(&self) -> Result<&[Vec<f32>], VariableError> {
        self.data.buffer().as_events_f32()
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    /// `set_dims` (§3.4): reinitializes data (to zeros) if the volume
    /// changes; otherwise keeps the buffer and reinterprets it under the
    /// new shape, identical in effect to `reshape` in that case.
    pub fn set_dims(&mut self, new_dims: Dimensions) {
        if new_dims.volume() != self.dims.volume() || new_dims.is_sparse() != self.dims.is_sparse() {
            self.data = Storage::zeroed(self.kind(), new_dims.volume());
        }
        self.dims = new_dims;
    }

    pub fn rename(&mut self, from: Dim, to: Dim) -> Result<(), VariableError> {
        self.dims.rename(from, to)
    }

    /// `reshape` (§4.3): legal only when volumes match; an owned `Variable`
    /// just relabels (flat buffer order is unchanged).
    pub fn reshape(&self, new_dims: Dimensions) -> Result<Variable, VariableError> {
        if new_dims.volume() != self.dims.volume() {
            return Err(DimensionError::Mismatch {
                expected: format!("volume {}", self.dims.volume()),
                actual: format!("volume {}", new_dims.volume()),
            }
            .into());
        }
        let mut out = self.clone();
        out.dims = new_dims;
        Ok(out)
    }

    /// `transpose` (§4.3): reorders axes. Per §4.3's own wording this
    /// "produces a non-contiguous view unless `order` is the identity" — a
    /// transpose only relabels which axis is outermost/innermost, it never
    /// moves data, so (unlike `reshape`, which changes what stride each
    /// label carries while keeping axis order fixed) it must return a view
    /// whose `dims` differ in *order* from `parent_dims`. `StridedView`
    /// already walks exactly that case (the `transpose_reorders_without_copy`
    /// test in `strided_view.rs`); returning an owned `Variable` with
    /// merely relabeled `dims` here would silently reinterpret the
    /// untouched buffer under the wrong strides.
    pub fn transpose(&self, order: &[usize]) -> Result<VariableView<'_>, VariableError> {
        let dims = self.dims.transposed(order)?;
        Ok(VariableView { parent: self, dims, base_offset: 0 })
    }

    pub fn slice(&self, dim: Dim, begin: usize, end: SliceEnd) -> Result<VariableView<'_>, VariableError> {
        let (new_dims, extra_offset) = slice_dims(&self.dims, &self.dims, dim, begin, end)?;
        Ok(VariableView { parent: self, dims: new_dims, base_offset: extra_offset })
    }

    pub fn slice_mut(&mut self, dim: Dim, begin: usize, end: SliceEnd) -> Result<VariableViewMut<'_>, VariableError> {
        let (new_dims, extra_offset) = slice_dims(&self.dims, &self.dims, dim, begin, end)?;
        Ok(VariableViewMut { parent: self, dims: new_dims, base_offset: extra_offset })
    }

    fn checked_assign<A: AsVariable>(&mut self, rhs: &A, op: ArithOp) -> Result<(), VariableError> {
        check_arith_unit(&self.unit, rhs.unit(), op)?;
        let dims = self.dims.clone();
        let result = arith_assign_into(self.data.make_mut(), &dims, 0, &dims, rhs, op)?;
        if let ArithOp::Mul | ArithOp::Div = op {
            self.unit = result_unit(&self.unit, rhs.unit(), op);
        }
        Ok(result)
    }

    pub fn add_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Add)
    }
    pub fn sub_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Sub)
    }
    pub fn mul_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Mul)
    }
    pub fn div_assign<A: AsVariable>(&mut self, rhs: &A) -> Result<(), VariableError> {
        self.checked_assign(rhs, ArithOp::Div)
    }

    /// Mask OR-combination (§6): used by `Dataset::add_assign` for
    /// `mask`-role Variables, which combine via logical-or rather than
    /// numeric addition.
    pub fn or_assign(&mut self, rhs: &Variable) -> Result<(), VariableError> {
        self.data.or_in_place(&self.dims.clone(), &rhs.data, &rhs.dims)
    }

    fn binary(&self, rhs: &Variable, op: ArithOp) -> Result<Variable, VariableError> {
        let mut out = self.clone();
        out.checked_assign(rhs, op)?;
        Ok(out)
    }

    pub fn add(&self, rhs: &Variable) -> Result<Variable, VariableError> {
        self.binary(rhs, ArithOp::Add)
    }
    pub fn sub(&self, rhs: &Variable) -> Result<Variable, VariableError> {
        self.binary(rhs, ArithOp::Sub)
    }
    pub fn mul(&self, rhs: &Variable) -> Result<Variable, VariableError> {
        self.binary(rhs, ArithOp::Mul)
    }
    pub fn div(&self, rhs: &Variable) -> Result<Variable, VariableError> {
        self.binary(rhs, ArithOp::Div)
    }

    /// `scale` — multiply every element by a dimensionless scalar; used by
    /// `mean` (§4.3: `sum(var,dim) * (1/extent)`) and not otherwise exposed.
    fn scale(&mut self, factor: f64) -> Result<(), VariableError> {
        macro_rules! run {
            ($variant:ident, $cast:ty) => {{
                let Buffer::$variant(v) = self.data.make_mut() else { unreachable!() };
                for x in v.iter_mut() {
                    *x = (*x as f64 * factor) as $cast;
                }
            }};
        }
        match self.kind() {
            ElementKind::F64 => run!(F64, f64),
            ElementKind::F32 => run!(F32, f32),
            ElementKind::I32 => run!(I32, i32),
            ElementKind::I64 => run!(I64, i64),
            other => return Err(KindError::NotArithmetic(other).into()),
        }
        Ok(())
    }

    /// `sum(var, dim)` (§4.3): result dims = `var.dims` with `dim` erased,
    /// zero-initialized, then accumulated into via the reduction-shaped
    /// `Storage::accumulate_reduce` (§4.4 rule 3). Unit preserved.
    pub fn sum(&self, dim: Dim) -> Result<Variable, VariableError> {
        let result_dims = self.dims.without(dim)?;
        let mut out = Variable::zero_variable(self.kind(), self.unit.clone(), result_dims.clone());
        out.data.accumulate_reduce(&result_dims, &self.data, &self.dims)?;
        Ok(out)
    }

    /// `mean(var, dim) = sum(var, dim) * (1 / var.dims[dim])`.
    pub fn mean(&self, dim: Dim) -> Result<Variable, VariableError> {
        let n = self.dims.extent(dim)?;
        if n == 0 {
            return Err(DimensionError::NegativeExtent(dim).into());
        }
        let mut out = self.sum(dim)?;
        out.scale(1.0 / n as f64)?;
        Ok(out)
    }

    /// `concatenate(a, b, dim)` (§4.3). Requires matching kind, unit, name,
    /// and matching extents on every axis other than `dim`. If `dim` is the
    /// sparse axis, concatenates per-row containers; otherwise allocates a
    /// fresh dense buffer and copies `a` then `b` along `dim`.
    pub fn concatenate(a: &Variable, b: &Variable, dim: Dim) -> Result<Variable, VariableError> {
        if a.kind() != b.kind() {
            return Err(KindError::Mismatch { expected: a.kind(), actual: b.kind() }.into());
        }
        if a.unit != b.unit {
            return Err(UnitError::Incompatible { lhs: a.unit.to_string(), rhs: b.unit.to_string() }.into());
        }
        if a.name != b.name {
            return Err(KindError::Mismatch { expected: a.kind(), actual: b.kind() }.into());
        }
        if a.dims.is_sparse() && a.dims.sparse_label() == Some(dim) {
            return Self::concatenate_sparse_rows(a, b, dim);
        }
        for &label in a.dims.labels() {
            if label == dim {
                continue;
            }
            if a.dims.extent(label)? != b.dims.extent(label)? {
                return Err(DimensionError::Mismatch {
                    expected: format!("{label}: {}", a.dims.extent(label)?),
                    actual: format!("{label}: {}", b.dims.extent(label)?),
                }
                .into());
            }
        }
        let n_a = a.dims.extent(dim)?;
        let n_b = b.dims.extent(dim)?;
        let mut new_dims = a.dims.clone();
        new_dims.resize(dim, n_a + n_b)?;
        let mut out = Variable::zero_variable(a.kind(), a.unit.clone(), new_dims.clone());
        out.data.copy_into(&new_dims, dim, 0, &a.data, &a.dims, 0, n_a)?;
        out.data.copy_into(&new_dims, dim, n_a, &b.data, &b.dims, 0, n_b)?;
        out.name = a.name.clone();
        Ok(out)
    }

    fn concatenate_sparse_rows(a: &Variable, b: &Variable, dim: Dim) -> Result<Variable, VariableError> {
        if a.dims.without(dim)? != b.dims.without(dim)? {
            return Err(DimensionError::Mismatch {
                expected: format!("{}", a.dims.without(dim)?),
                actual: format!("{}", b.dims.without(dim)?),
            }
            .into());
        }
        let buffer = match (a.data.buffer(), b.data.buffer()) {
            (Buffer::EventListF64(ra), Buffer::EventListF64(rb)) => Buffer::EventListF64(
                ra.iter().zip(rb).map(|(x, y)| x.iter().chain(y).copied().collect()).collect(),
            ),
            (Buffer::EventListF32(ra), Buffer::EventListF32(rb)) => Buffer::EventListF32(
                ra.iter().zip(rb).map(|(x, y)| x.iter().chain(y).copied().collect()).collect(),
            ),
            _ => return Err(KindError::Mismatch { expected: a.kind(), actual: b.kind() }.into()),
        };
        Ok(Variable { unit: a.unit.clone(), dims: a.dims.clone(), data: Storage::from_buffer(buffer), name: a.name.clone() })
    }

    /// Collapse a dense outer axis of a sparse Variable by concatenating the
    /// per-row event containers that share every other outer index (§8
    /// scenario 7): `{Y:3, X:sparse}` flattened along `Y` gives `{X:sparse}`
    /// with each output row the events of every input row that differed
    /// only in `Y`, in `Y`-then-within-row order (§5's determinism rule).
    pub fn flatten(var: &Variable, dim: Dim) -> Result<Variable, VariableError> {
        if !var.dims.is_sparse() {
            return Err(SparseError::UnsupportedCombination("flatten requires a sparse Variable").into());
        }
        if var.dims.sparse_label() == Some(dim) {
            return Err(SparseError::UnsupportedCombination("cannot flatten the sparse axis itself").into());
        }
        let dense_parent = dense_dims(&var.dims);
        let n = dense_parent.extent(dim)?;
        let inner = dense_parent.stride(dim)?.max(1);
        let row_count = dense_parent.volume();
        let out_rows = if n == 0 { 0 } else { row_count / n };
        let new_dims = var.dims.without(dim)?;
        macro_rules! run {
            ($variant:ident) => {{
                let Buffer::$variant(src) = var.data.buffer() else { unreachable!() };
                let mut out = vec![Vec::new(); out_rows];
                for p in 0..out_rows {
                    let o = p / inner;
                    let in_ = p % inner;
                    let base = o * n * inner + in_;
                    for k in 0..n {
                        out[p].extend(src[base + k * inner].iter().copied());
                    }
                }
                Buffer::$variant(out)
            }};
        }
        let buffer = match var.kind() {
            ElementKind::EventListF64 => run!(EventListF64),
            ElementKind::EventListF32 => run!(EventListF32),
            other => return Err(SparseError::RebinOnNonArithmetic(other).into()),
        };
        Ok(Variable { unit: var.unit.clone(), dims: new_dims, data: Storage::from_buffer(buffer), name: var.name.clone() })
    }

    /// `split(var, dim, indices)` (§4.3): partition at sorted, unique,
    /// in-range indices. Empty `indices` returns `[var.clone()]`.
    pub fn split(var: &Variable, dim: Dim, indices: &[usize]) -> Result<Vec<Variable>, VariableError> {
        let extent = var.dims.extent(dim)?;
        let mut bounds = Vec::with_capacity(indices.len() + 2);
        bounds.push(0usize);
        bounds.extend_from_slice(indices);
        bounds.push(extent);
        let mut out = Vec::with_capacity(bounds.len() - 1);
        for w in bounds.windows(2) {
            let (begin, end) = (w[0], w[1]);
            out.push(var.slice(dim, begin, SliceEnd::Exclusive(end))?.to_owned()?);
        }
        Ok(out)
    }

    /// `filter(var, mask)` (§4.3): copies rows of `var` along `mask`'s
    /// single labeled axis for which the mask is true.
    pub fn filter(var: &Variable, mask: &Variable) -> Result<Variable, VariableError> {
        if mask.dims.rank() != 1 {
            return Err(DimensionError::Mismatch {
                expected: "rank 1".into(),
                actual: format!("rank {}", mask.dims.rank()),
            }
            .into());
        }
        let dim = mask.dims.labels()[0];
        let mask_values = mask.values_bool()?;
        let mut rows: Vec<Variable> = Vec::new();
        for (i, &keep) in mask_values.iter().enumerate() {
            if keep {
                rows.push(var.slice(dim, i, SliceEnd::Exclusive(i + 1))?.to_owned()?);
            }
        }
        if rows.is_empty() {
            let mut empty_dims = var.dims.clone();
            empty_dims.resize(dim, 0)?;
            return Ok(Variable::zero_variable(var.kind(), var.unit.clone(), empty_dims));
        }
        let mut acc = rows.remove(0);
        for row in rows {
            acc = Variable::concatenate(&acc, &row, dim)?;
        }
        Ok(acc)
    }

    /// `permute(var, dim, indices)` (§4.3): gather rows of `var` along `dim`
    /// at `indices`, in order, into a fresh Variable.
    pub fn permute(var: &Variable, dim: Dim, indices: &[usize]) -> Result<Variable, VariableError> {
        let mut new_dims = var.dims.clone();
        new_dims.resize(dim, indices.len())?;
        let mut out = Variable::zero_variable(var.kind(), var.unit.clone(), new_dims.clone());
        for (i, &src_index) in indices.iter().enumerate() {
            out.data.copy_into(&new_dims, dim, i, &var.data, &var.dims, src_index, src_index + 1)?;
        }
        out.name = var.name.clone();
        Ok(out)
    }

    /// Histogram rebinning (§4.6). `self` gets overwritten with the
    /// redistributed contents; `old`'s dims must match `self`'s except for
    /// `dim`'s extent, and `old_coord`/`new_coord` are the bin-edge pairs.
    pub fn rebin(&mut self, old: &Variable, dim: Dim, old_coord: &Variable, new_coord: &Variable) -> Result<(), VariableError> {
        if self.kind() != old.kind() {
            return Err(KindError::Mismatch { expected: self.kind(), actual: old.kind() }.into());
        }
        let old_edges = old_coord.values_f64()?;
        let new_edges = new_coord.values_f64()?;
        let (data, new_dims) = old.data.rebin(&old.dims, dim, old_edges, new_edges)?;
        self.dims = new_dims;
        self.data = data;
        self.unit = old.unit.clone();
        Ok(())
    }

    /// Sparse/dense fused arithmetic (§4.7): multiply/divide each event's
    /// implicit weight of 1 by the histogram bin of `weights` its abscissa
    /// (via `sparse_coord`) falls into. The result carries an implicit
    /// `counts` unit factor the caller may strip with `Unit::without_counts`.
    pub fn fused_sparse_dense(sparse_coord: &Variable, edges: &Variable, weights: &Variable, op: ArithOp) -> Result<Variable, VariableError> {
        let rows = sparse_coord.sparse_values_f64()?;
        let edge_values = edges.values_f64()?;
        let weight_values = weights.values_f64()?;
        let result_rows = binning::fused_sparse_dense_f64(rows, edge_values, weight_values, op)?;
        let unit = &weights.unit * &Unit::counts();
        Ok(Variable {
            unit,
            dims: sparse_coord.dims.clone(),
            data: Storage::from_buffer(Buffer::EventListF64(result_rows)),
            name: sparse_coord.name.clone(),
        })
    }

    /// `replace_nan` (§9 open question): return a Variable with NaN values
    /// replaced by `replacement`, dims and unit unchanged. Implemented via
    /// the elementwise transform engine (§4.8).
    pub fn replace_nan(&self, replacement: f64) -> Result<Variable, VariableError> {
        let data = map_unary_float(
            &self.dims,
            &self.data,
            UnaryFloatOps {
                f64_op: move |x: f64| if x.is_nan() { replacement } else { x },
                f32_op: move |x: f32| if x.is_nan() { replacement as f32 } else { x },
            },
        )?;
        Ok(Variable { unit: self.unit.clone(), dims: self.dims.clone(), data, name: self.name.clone() })
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        variables_eq(self, other)
    }
}

impl PartialEq<Variable> for VariableView<'_> {
    fn eq(&self, other: &Variable) -> bool {
        variables_eq(self, other)
    }
}
impl PartialEq<VariableView<'_>> for Variable {
    fn eq(&self, other: &VariableView<'_>) -> bool {
        variables_eq(self, other)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("unit", &self.unit)
            .field("dims", &self.dims)
            .field("kind", &self.kind())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;

    fn vec1(dim: Dim, values: &[f64]) -> Variable {
        Variable::from_f64(Unit::dimensionless(), Dimensions::from_dense([(dim, values.len())]).unwrap(), values.to_vec()).unwrap()
    }

    fn grid(values: &[f64]) -> Variable {
        Variable::from_f64(Unit::dimensionless(), Dimensions::from_dense([(Dim::Y, 2), (Dim::X, 3)]).unwrap(), values.to_vec()).unwrap()
    }

    #[test]
    fn broadcast_add_matches_scenario_4() {
        let a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = vec1(Dim::X, &[10.0, 20.0, 30.0]);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.values_f64().unwrap(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn transpose_reorders_data_not_just_labels() {
        let a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let transposed = a.transpose(&[1, 0]).unwrap().to_owned().unwrap();
        assert_eq!(transposed.dims().labels(), &[Dim::X, Dim::Y]);
        assert_eq!(transposed.values_f64().unwrap(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn transpose_is_involution() {
        let a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let back = a.transpose(&[1, 0]).unwrap().to_owned().unwrap().transpose(&[1, 0]).unwrap().to_owned().unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn transpose_arithmetic_matches_scenario_5() {
        let a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // b has dims {X,Y} with values equal to a^T, flattened in X-major order.
        let b = Variable::from_f64(
            Unit::dimensionless(),
            Dimensions::from_dense([(Dim::X, 3), (Dim::Y, 2)]).unwrap(),
            vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0],
        )
        .unwrap();
        let sum = a.add(&b).unwrap();
        let doubled = a.add(&a).unwrap();
        assert_eq!(sum, doubled);
    }

    #[test]
    fn concatenate_new_axis_matches_scenario_6() {
        let a = vec1(Dim::X, &[1.0, 2.0, 3.0]);
        let b = vec1(Dim::X, &[4.0, 5.0, 6.0]);
        let ab = Variable::concatenate(&a, &b, Dim::Y).unwrap();
        assert_eq!(ab.dims().extent(Dim::Y).unwrap(), 2);
        assert_eq!(ab.dims().extent(Dim::X).unwrap(), 3);
    }

    #[test]
    fn slice_and_equality_roundtrip() {
        let a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let row = a.slice(Dim::Y, 1, SliceEnd::Index(1)).unwrap();
        assert!(!row.dims().contains(Dim::Y));
        let owned = row.to_owned().unwrap();
        assert_eq!(owned.values_f64().unwrap(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn sum_erases_dim_and_preserves_total() {
        let a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let summed = a.sum(Dim::Y).unwrap();
        assert!(!summed.dims().contains(Dim::Y));
        assert_eq!(summed.values_f64().unwrap(), &[5.0, 7.0, 9.0]);
    }

    #[test]
    fn mean_divides_by_extent() {
        let a = vec1(Dim::X, &[2.0, 4.0, 6.0]);
        let m = a.mean(Dim::X).unwrap();
        assert_eq!(m.values_f64().unwrap(), &[4.0]);
    }

    #[test]
    fn split_then_concatenate_round_trips() {
        let a = vec1(Dim::X, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let parts = Variable::split(&a, Dim::X, &[2]).unwrap();
        assert_eq!(parts.len(), 2);
        let rejoined = Variable::concatenate(&parts[0], &parts[1], Dim::X).unwrap();
        assert_eq!(rejoined, a);
    }

    #[test]
    fn filter_all_true_equals_input() {
        let a = vec1(Dim::X, &[1.0, 2.0, 3.0]);
        let mask = Variable::make_variable(Unit::dimensionless(), Dimensions::from_dense([(Dim::X, 3)]).unwrap(), Buffer::Bool(vec![true, true, true])).unwrap();
        let filtered = Variable::filter(&a, &mask).unwrap();
        assert_eq!(filtered, a);
    }

    #[test]
    fn filter_all_false_is_empty() {
        let a = vec1(Dim::X, &[1.0, 2.0, 3.0]);
        let mask = Variable::make_variable(Unit::dimensionless(), Dimensions::from_dense([(Dim::X, 3)]).unwrap(), Buffer::Bool(vec![false, false, false])).unwrap();
        let filtered = Variable::filter(&a, &mask).unwrap();
        assert_eq!(filtered.dims().extent(Dim::X).unwrap(), 0);
    }

    #[test]
    fn mismatched_units_reject_add() {
        let mut a = vec1(Dim::X, &[1.0]);
        a.set_unit(Unit::base("m"));
        let b = vec1(Dim::X, &[1.0]);
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn non_arithmetic_kind_surfaces_kind_error() {
        let a = Variable::make_variable(Unit::dimensionless(), Dimensions::from_dense([(Dim::X, 2)]).unwrap(), Buffer::Str(vec!["a".into(), "b".into()])).unwrap();
        let b = a.clone();
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn replace_nan_replaces_only_nan() {
        let a = vec1(Dim::X, &[1.0, f64::NAN, 3.0]);
        let replaced = a.replace_nan(0.0).unwrap();
        assert_eq!(replaced.values_f64().unwrap(), &[1.0, 0.0, 3.0]);
    }

    #[test]
    fn permute_gathers_rows_in_order() {
        let a = vec1(Dim::X, &[10.0, 20.0, 30.0, 40.0]);
        let out = Variable::permute(&a, Dim::X, &[3, 0, 0]).unwrap();
        assert_eq!(out.values_f64().unwrap(), &[40.0, 10.0, 10.0]);
    }

    #[test]
    fn flatten_merges_sparse_rows_matches_scenario_7() {
        let dims = Dimensions::from_dense_with_sparse_tail([(Dim::Y, 3)], Dim::X).unwrap();
        let buffer = Buffer::EventListF64(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0], vec![6.0, 7.0]]);
        let events = Variable::make_variable(Unit::dimensionless(), dims, buffer).unwrap();
        let flat = Variable::flatten(&events, Dim::Y).unwrap();
        assert!(!flat.dims().contains(Dim::Y));
        assert_eq!(flat.sparse_values_f64().unwrap(), &[vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]]);
    }

    #[test]
    fn slice_view_arithmetic_writes_through() {
        let mut a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = vec1(Dim::X, &[100.0, 200.0, 300.0]);
        {
            let mut row = a.slice_mut(Dim::Y, 0, SliceEnd::Exclusive(1)).unwrap();
            row.add_assign(&b).unwrap();
        }
        assert_eq!(a.values_f64().unwrap(), &[101.0, 202.0, 303.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn slice_view_arithmetic_falls_back_to_strided_path() {
        // Slicing the innermost axis of a multi-row grid yields a
        // non-contiguous view (a gap between rows), exercising the
        // StridedView/StridedViewMut path rather than the flat-slice
        // fast path `arith_assign_into` takes for contiguous sub-blocks.
        let mut a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = vec1(Dim::X, &[100.0, 200.0]);
        {
            let mut cols = a.slice_mut(Dim::X, 0, SliceEnd::Exclusive(2)).unwrap();
            cols.add_assign(&b).unwrap();
        }
        assert_eq!(a.values_f64().unwrap(), &[101.0, 202.0, 3.0, 104.0, 205.0, 6.0]);
    }

    #[test]
    fn view_mul_by_dimensionless_writes_through() {
        let mut a = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let scale = vec1(Dim::X, &[2.0, 2.0, 2.0]);
        {
            let mut row = a.slice_mut(Dim::Y, 0, SliceEnd::Exclusive(1)).unwrap();
            row.mul_assign(&scale).unwrap();
        }
        assert_eq!(a.values_f64().unwrap(), &[2.0, 4.0, 6.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn view_mul_rejects_unit_change() {
        let mut a = vec1(Dim::X, &[1.0, 2.0, 3.0]);
        a.set_unit(Unit::base("m"));
        let mut scale = vec1(Dim::X, &[2.0, 2.0, 2.0]);
        scale.set_unit(Unit::base("s"));
        let mut row = a.slice_mut(Dim::X, 0, SliceEnd::Exclusive(2)).unwrap();
        assert!(row.mul_assign(&scale).is_err());
    }

    #[test]
    fn rebin_overwrites_dims_and_values() {
        let old = vec1(Dim::X, &[1.0, 1.0, 1.0, 1.0]);
        let old_coord = vec1(Dim::X, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        let new_coord = vec1(Dim::X, &[0.0, 2.0, 4.0]);
        let mut out = Variable::zero_variable(old.kind(), old.unit().clone(), Dimensions::from_dense([(Dim::X, 0)]).unwrap());
        out.rebin(&old, Dim::X, &old_coord, &new_coord).unwrap();
        assert_eq!(out.values_f64().unwrap(), &[2.0, 2.0]);
    }

    #[test]
    fn rebin_rejects_kind_mismatch() {
        let old = Variable::make_variable(Unit::dimensionless(), Dimensions::from_dense([(Dim::X, 2)]).unwrap(), Buffer::I32(vec![1, 1])).unwrap();
        let old_coord = vec1(Dim::X, &[0.0, 1.0, 2.0]);
        let new_coord = vec1(Dim::X, &[0.0, 2.0]);
        let mut out = vec1(Dim::X, &[0.0]);
        assert!(out.rebin(&old, Dim::X, &old_coord, &new_coord).is_err());
    }

    #[test]
    fn rebin_rejects_non_float_storage() {
        let old = Variable::make_variable(Unit::dimensionless(), Dimensions::from_dense([(Dim::X, 2)]).unwrap(), Buffer::I32(vec![1, 1])).unwrap();
        let old_coord = vec1(Dim::X, &[0.0, 1.0, 2.0]);
        let new_coord = vec1(Dim::X, &[0.0, 2.0]);
        let mut out = Variable::make_variable(Unit::dimensionless(), Dimensions::from_dense([(Dim::X, 1)]).unwrap(), Buffer::I32(vec![0])).unwrap();
        assert!(out.rebin(&old, Dim::X, &old_coord, &new_coord).is_err());
    }
}

/// Property-based tests for §8's universal invariants, in the teacher's
/// in-module `quickcheck!` style (`src/dimension/mod.rs`'s `extended_gcd_*`
/// properties): arbitrary inputs are tamed to a bounded, finite range so the
/// float-tolerance assertions aren't flaky from overflow/cancellation, the
/// same way the teacher's `TestResult::discard()` sidesteps inputs a
/// property was never meant to cover.
#[cfg(test)]
mod properties {
    use super::*;
    use approx::relative_eq;
    use quickcheck::{quickcheck, TestResult};

    fn make_vec(dim: Dim, values: Vec<f64>) -> Variable {
        let n = values.len();
        Variable::from_f64(Unit::dimensionless(), Dimensions::from_dense([(dim, n)]).unwrap(), values).unwrap()
    }

    fn tame(values: Vec<f64>) -> Vec<f64> {
        values.into_iter().map(|x| if x.is_finite() { x.clamp(-1.0e6, 1.0e6) } else { 0.0 }).collect()
    }

    quickcheck! {
        fn add_is_commutative(values: Vec<f64>) -> TestResult {
            let values = tame(values);
            if values.is_empty() {
                return TestResult::discard();
            }
            let a = make_vec(Dim::X, values.clone());
            let b = make_vec(Dim::X, values.iter().map(|x| x * 2.0 + 1.0).collect());
            TestResult::from_bool(a.add(&b).unwrap() == b.add(&a).unwrap())
        }

        fn add_then_subtract_recovers_original(values: Vec<f64>) -> TestResult {
            let values = tame(values);
            if values.is_empty() {
                return TestResult::discard();
            }
            let a = make_vec(Dim::X, values.clone());
            let b = make_vec(Dim::X, vec![1.0; values.len()]);
            let recovered = a.add(&b).unwrap().sub(&b).unwrap();
            TestResult::from_bool(
                recovered
                    .values_f64()
                    .unwrap()
                    .iter()
                    .zip(&values)
                    .all(|(x, y)| relative_eq!(*x, *y, epsilon = 1e-9)),
            )
        }

        fn concatenate_split_round_trips(values: Vec<f64>, cut: usize) -> TestResult {
            let values = tame(values);
            if values.len() < 2 {
                return TestResult::discard();
            }
            let cut = 1 + cut % (values.len() - 1);
            let v = make_vec(Dim::X, values);
            let parts = Variable::split(&v, Dim::X, &[cut]).unwrap();
            let rejoined = Variable::concatenate(&parts[0], &parts[1], Dim::X).unwrap();
            TestResult::from_bool(rejoined == v)
        }

        fn sum_preserves_total(values: Vec<f64>) -> TestResult {
            let values = tame(values);
            if values.is_empty() {
                return TestResult::discard();
            }
            let total: f64 = values.iter().sum();
            let v = make_vec(Dim::X, values);
            let summed = v.sum(Dim::X).unwrap();
            TestResult::from_bool(relative_eq!(summed.values_f64().unwrap()[0], total, epsilon = 1e-6))
        }

        fn rebin_identity_preserves_values(data: Vec<f64>) -> TestResult {
            let data = tame(data);
            if data.is_empty() {
                return TestResult::discard();
            }
            let coord: Vec<f64> = (0..=data.len()).map(|i| i as f64).collect();
            let rebinned = crate::binning::rebin_row(&data, &coord, &coord).unwrap();
            TestResult::from_bool(
                rebinned.iter().zip(&data).all(|(x, y)| relative_eq!(*x, *y, epsilon = 1e-9)),
            )
        }
    }
}
