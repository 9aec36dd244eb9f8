// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Broadcast and alignment rules (§4.4), grounded on the teacher's
//! `BroadcastShape` trait (`dimension/broadcast.rs`), reshaped from
//! positional numpy-style broadcasting to the label-set-containment rule
//! this spec defines.

use crate::dimensions::Dimensions;
use crate::error::{DimensionError, VariableError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    /// Same set of `(label, extent)` pairs (axis order may differ).
    Equal,
    /// `lhs` is a strict superset: broadcast `rhs` up to `lhs`.
    LhsContainsRhs,
    /// `rhs` is a strict superset: this is the reduction-shaped case
    /// (§4.4 rule 3), valid only for associative/commutative accumulation.
    RhsContainsLhs,
}

pub fn classify(lhs: &Dimensions, rhs: &Dimensions) -> Result<Relation, VariableError> {
    if lhs.same_set(rhs) {
        return Ok(Relation::Equal);
    }
    if lhs.contains_dims(rhs) {
        return Ok(Relation::LhsContainsRhs);
    }
    if rhs.contains_dims(lhs) {
        return Ok(Relation::RhsContainsLhs);
    }
    Err(DimensionError::Mismatch { expected: format!("{lhs}"), actual: format!("{rhs}") }.into())
}
