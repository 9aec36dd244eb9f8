// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error taxonomy (§7), grounded on the teacher's `error.rs`/`shape_error.rs`
//! pattern: a closed set of error kinds, each carrying the structured
//! context (shapes, units, kinds) a caller needs to format a message, with
//! no allocation required on the error path.

use std::fmt;

use crate::dim::Dim;
use crate::dtype::ElementKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DimensionError {
    /// Two dimension sets disagree and neither contains the other.
    Mismatch { expected: String, actual: String },
    MissingLabel(Dim),
    DuplicateLabel(Dim),
    NegativeExtent(Dim),
    SparseWhereDenseRequired(Dim),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitError {
    Incompatible { lhs: String, rhs: String },
    ChangeOnPartialView,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KindError {
    Mismatch { expected: ElementKind, actual: ElementKind },
    NotArithmetic(ElementKind),
    ReplacementTypeMismatch { expected: ElementKind, actual: ElementKind },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SliceError {
    OutOfRange { dim: Dim, begin: isize, end: isize, extent: usize },
    BeginAfterEnd { begin: isize, end: isize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SparseError {
    UnsupportedCombination(&'static str),
    NonUniformEdges,
    RebinOnNonArithmetic(ElementKind),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidState {
    MutateThroughConstView,
    ResizeNonOwningView,
}

/// The unified error type every fallible operation in this crate returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariableError {
    Dimension(DimensionError),
    Unit(UnitError),
    Kind(KindError),
    Slice(SliceError),
    Sparse(SparseError),
    InvalidState(InvalidState),
}

impl From<DimensionError> for VariableError {
    fn from(e: DimensionError) -> Self {
        VariableError::Dimension(e)
    }
}
impl From<UnitError> for VariableError {
    fn from(e: UnitError) -> Self {
        VariableError::Unit(e)
    }
}
impl From<KindError> for VariableError {
    fn from(e: KindError) -> Self {
        VariableError::Kind(e)
    }
}
impl From<SliceError> for VariableError {
    fn from(e: SliceError) -> Self {
        VariableError::Slice(e)
    }
}
impl From<SparseError> for VariableError {
    fn from(e: SparseError) -> Self {
        VariableError::Sparse(e)
    }
}
impl From<InvalidState> for VariableError {
    fn from(e: InvalidState) -> Self {
        VariableError::InvalidState(e)
    }
}

impl fmt::Display for VariableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableError::Dimension(e) => match e {
                DimensionError::Mismatch { expected, actual } => {
                    write!(f, "dimensions do not match: expected {expected}, got {actual}")
                }
                DimensionError::MissingLabel(d) => write!(f, "dimension {d} not found"),
                DimensionError::DuplicateLabel(d) => write!(f, "dimension {d} already present"),
                DimensionError::NegativeExtent(d) => write!(f, "negative extent for dimension {d}"),
                DimensionError::SparseWhereDenseRequired(d) => {
                    write!(f, "dimension {d} is sparse where a dense axis was required")
                }
            },
            VariableError::Unit(e) => match e {
                UnitError::Incompatible { lhs, rhs } => {
                    write!(f, "incompatible units: {lhs} vs {rhs}")
                }
                UnitError::ChangeOnPartialView => {
                    write!(f, "cannot change the unit of a partial view")
                }
            },
            VariableError::Kind(e) => match e {
                KindError::Mismatch { expected, actual } => {
                    write!(f, "underlying data types do not match: expected {expected}, got {actual}")
                }
                KindError::NotArithmetic(k) => write!(f, "{k} does not support arithmetic"),
                KindError::ReplacementTypeMismatch { expected, actual } => {
                    write!(f, "replacement value type {actual} does not match input type {expected}")
                }
            },
            VariableError::Slice(e) => match e {
                SliceError::OutOfRange { dim, begin, end, extent } => {
                    write!(f, "slice [{begin},{end}) out of range for dimension {dim} with extent {extent}")
                }
                SliceError::BeginAfterEnd { begin, end } => {
                    write!(f, "slice begin {begin} is after end {end}")
                }
            },
            VariableError::Sparse(e) => match e {
                SparseError::UnsupportedCombination(msg) => write!(f, "unsupported sparse/dense combination: {msg}"),
                SparseError::NonUniformEdges => write!(f, "non-uniform bin edges are not supported"),
                SparseError::RebinOnNonArithmetic(k) => write!(f, "cannot rebin non-arithmetic kind {k}"),
            },
            VariableError::InvalidState(e) => match e {
                InvalidState::MutateThroughConstView => write!(f, "attempted to mutate through a const view"),
                InvalidState::ResizeNonOwningView => write!(f, "attempted to resize a non-owning view"),
            },
        }
    }
}

impl std::error::Error for VariableError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_without_panicking() {
        let e: VariableError = DimensionError::MissingLabel(Dim::X).into();
        assert!(!e.to_string().is_empty());
    }
}
