// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The elementwise transform engine (§4.8): given one or two Variables and a
//! closure keyed by a concrete element-kind, validate the kind, acquire
//! aligned `StridedView`s, and apply the closure, writing into a fresh
//! output `Variable`.
//!
//! Grounded on the teacher's `Zip`/`NdProducer` fan-out (`zip/mod.rs`,
//! `zip/ndproducer.rs`): a shared cursor walks producers aligned to the
//! widest input dims and applies a closure at each step. Here the "producer
//! alignment" is the broadcast/permutation a `StridedView` already performs,
//! so the engine itself only needs to pick the kind-specific closure and the
//! widest of the input dims before delegating to `StridedView`/`StridedViewMut`.
//!
//! Only `F32`/`F64` are wired up: every concrete user of this engine in the
//! spec (`replace_nan`, §9) is float-only, and `Variable`'s `+=`/`-=`/`*=`/`/=`
//! already have a dedicated, tested dispatch path in `storage.rs` that this
//! module does not duplicate.

use crate::buffer::Buffer;
use crate::dimensions::Dimensions;
use crate::dtype::ElementKind;
use crate::error::{KindError, VariableError};
use crate::storage::Storage;
use crate::strided_view::{StridedView, StridedViewMut};

/// Closure set keyed by the two float kinds this engine currently serves.
/// A `unit` closure is deliberately absent here: every current caller
/// (`replace_nan`) is unit-preserving, so unit arithmetic is the identity;
/// a future caller needing genuine unit transformation would add a third
/// field here, per §4.8's "separate closure ... handles the unit arithmetic".
pub struct UnaryFloatOps<F64, F32>
where
    F64: Fn(f64) -> f64,
    F32: Fn(f32) -> f32,
{
    pub f64_op: F64,
    pub f32_op: F32,
}

/// Apply `ops` elementwise over `src`, writing into a freshly allocated
/// buffer with the same dims. Errors (kind mismatch against the registered
/// `F32`/`F64` tuple) surface before any write, per §7's fail-fast rule.
pub fn map_unary_float<F64, F32>(
    dims: &Dimensions,
    src: &Storage,
    ops: UnaryFloatOps<F64, F32>,
) -> Result<Storage, VariableError>
where
    F64: Fn(f64) -> f64,
    F32: Fn(f32) -> f32,
{
    match src.kind() {
        ElementKind::F64 => {
            let input = src.buffer().as_f64()?;
            let mut out = vec![0.0f64; dims.volume()];
            {
                let src_view = StridedView::new(input, 0, dims, dims)?;
                let dst_view = StridedViewMut::new(&mut out, 0, dims, dims)?;
                for (d, s) in dst_view.zip(src_view) {
                    *d = (ops.f64_op)(*s);
                }
            }
            Ok(Storage::from_buffer(Buffer::F64(out)))
        }
        ElementKind::F32 => {
            let input = src.buffer().as_f32()?;
            let mut out = vec![0.0f32; dims.volume()];
            {
                let src_view = StridedView::new(input, 0, dims, dims)?;
                let dst_view = StridedViewMut::new(&mut out, 0, dims, dims)?;
                for (d, s) in dst_view.zip(src_view) {
                    *d = (ops.f32_op)(*s);
                }
            }
            Ok(Storage::from_buffer(Buffer::F32(out)))
        }
        other => Err(KindError::Mismatch { expected: ElementKind::F64, actual: other }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;

    #[test]
    fn map_unary_replaces_values() {
        let dims = Dimensions::from_dense([(Dim::X, 3)]).unwrap();
        let src = Storage::from_buffer(Buffer::F64(vec![1.0, f64::NAN, 3.0]));
        let out = map_unary_float(
            &dims,
            &src,
            UnaryFloatOps { f64_op: |x| if x.is_nan() { 0.0 } else { x }, f32_op: |x| x },
        )
        .unwrap();
        assert_eq!(out.buffer().as_f64().unwrap(), &[1.0, 0.0, 3.0]);
    }

    #[test]
    fn map_unary_rejects_non_float_kind() {
        let dims = Dimensions::from_dense([(Dim::X, 2)]).unwrap();
        let src = Storage::from_buffer(Buffer::I32(vec![1, 2]));
        let res = map_unary_float(&dims, &src, UnaryFloatOps { f64_op: |x| x, f32_op: |x| x });
        assert!(res.is_err());
    }
}
