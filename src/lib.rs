// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A labeled, unit-carrying, multi-dimensional array engine.
//!
//! The core value type is [`Variable`](variable::Variable): type-erased
//! storage (tagged by [`ElementKind`](dtype::ElementKind)) addressed through
//! named [`Dim`](dim::Dim)ensions rather than positional axes, with a
//! [`StridedView`](strided_view::StridedView) cursor that realizes slicing,
//! broadcasting, and transposition without copying, and a fused histogram
//! [`rebin`](binning) kernel for bin-to-bin resampling. [`Dataset`] groups
//! Variables by role (coordinate, label, data, mask, attribute) and
//! propagates arithmetic across them.
//!
//! Physical-unit arithmetic, a dynamic-language bindings front-end, and
//! pretty-printing are out of scope here — see [`units`] for the minimal
//! stand-in this crate assumes an external unit library would provide.

extern crate num_traits;
#[cfg(feature = "rayon")]
extern crate rayon;

pub mod binning;
pub mod broadcast;
pub mod buffer;
pub mod dataset;
pub mod dim;
pub mod dimensions;
pub mod dtype;
pub mod error;
pub mod storage;
pub mod strided_view;
pub mod transform;
pub mod units;
pub mod variable;

pub use crate::dataset::{Dataset, Role};
pub use crate::dim::Dim;
pub use crate::dimensions::{AxisLen, Dimensions};
pub use crate::dtype::{Arithmetic, ElementKind};
pub use crate::error::VariableError;
pub use crate::storage::{ArithOp, Storage};
pub use crate::units::Unit;
pub use crate::variable::{AsVariable, SliceEnd, Variable, VariableView, VariableViewMut};
