// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Buffer`: the tagged variant over concrete element storage (design
//! note §9: "re-architect as a tagged variant over the closed set of
//! element kinds; dispatch is a match on the tag"), replacing the
//! teacher's polymorphic-base-with-downcasts approach.

use crate::dataset::Dataset;
use crate::dtype::ElementKind;
use crate::error::{KindError, VariableError};

/// The Dataset "element kind" nests a whole `Dataset` by value (§9:
/// "cycles are forbidden by construction" — a `Dataset` can never again
/// contain itself as its own element, since this is the *only* place a
/// `Dataset` value can appear inside a `Buffer`).
pub type Vector3 = [f64; 3];

#[derive(Clone, Debug, PartialEq)]
pub enum Buffer {
    Bool(Vec<bool>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Str(Vec<String>),
    Vector3(Vec<Vector3>),
    Dataset(Vec<Dataset>),
    /// One resizable event list per outer row (§3.2, §4.7).
    EventListF64(Vec<Vec<f64>>),
    EventListF32(Vec<Vec<f32>>),
}

macro_rules! buffer_dispatch {
    ($self:expr, $pat:pat => $body:expr) => {
        match $self {
            Buffer::Bool($pat) => $body,
            Buffer::I32($pat) => $body,
            Buffer::I64($pat) => $body,
            Buffer::F32($pat) => $body,
            Buffer::F64($pat) => $body,
            Buffer::Str($pat) => $body,
            Buffer::Vector3($pat) => $body,
            Buffer::Dataset($pat) => $body,
            Buffer::EventListF64($pat) => $body,
            Buffer::EventListF32($pat) => $body,
        }
    };
}

impl Buffer {
    pub fn kind(&self) -> ElementKind {
        match self {
            Buffer::Bool(_) => ElementKind::Bool,
            Buffer::I32(_) => ElementKind::I32,
            Buffer::I64(_) => ElementKind::I64,
            Buffer::F32(_) => ElementKind::F32,
            Buffer::F64(_) => ElementKind::F64,
            Buffer::Str(_) => ElementKind::Str,
            Buffer::Vector3(_) => ElementKind::Vector3,
            Buffer::Dataset(_) => ElementKind::Dataset,
            Buffer::EventListF64(_) => ElementKind::EventListF64,
            Buffer::EventListF32(_) => ElementKind::EventListF32,
        }
    }

    /// Outer length: element count for dense kinds, row count for sparse
    /// (event-list) kinds.
    pub fn len(&self) -> usize {
        buffer_dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn zeroed(kind: ElementKind, n: usize) -> Buffer {
        fn zeros<T: num_traits::Zero + Clone>(n: usize) -> Vec<T> {
            vec![T::zero(); n]
        }
        match kind {
            ElementKind::Bool => Buffer::Bool(vec![false; n]),
            ElementKind::I32 => Buffer::I32(zeros(n)),
            ElementKind::I64 => Buffer::I64(zeros(n)),
            ElementKind::F32 => Buffer::F32(zeros(n)),
            ElementKind::F64 => Buffer::F64(zeros(n)),
            ElementKind::Str => Buffer::Str(vec![String::new(); n]),
            ElementKind::Vector3 => Buffer::Vector3(vec![[0.0; 3]; n]),
            ElementKind::Dataset => Buffer::Dataset(vec![Dataset::new(); n]),
            ElementKind::EventListF64 => Buffer::EventListF64(vec![Vec::new(); n]),
            ElementKind::EventListF32 => Buffer::EventListF32(vec![Vec::new(); n]),
        }
    }

    pub fn as_f64(&self) -> Result<&[f64], VariableError> {
        match self {
            Buffer::F64(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::F64, actual: other.kind() }.into()),
        }
    }

    pub fn as_f64_mut(&mut self) -> Result<&mut [f64], VariableError> {
        let kind = self.kind();
        match self {
            Buffer::F64(v) => Ok(v),
            _ => Err(KindError::Mismatch { expected: ElementKind::F64, actual: kind }.into()),
        }
    }

    pub fn as_f32(&self) -> Result<&[f32], VariableError> {
        match self {
            Buffer::F32(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::F32, actual: other.kind() }.into()),
        }
    }

    pub fn as_i32(&self) -> Result<&[i32], VariableError> {
        match self {
            Buffer::I32(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::I32, actual: other.kind() }.into()),
        }
    }

    pub fn as_i64(&self) -> Result<&[i64], VariableError> {
        match self {
            Buffer::I64(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::I64, actual: other.kind() }.into()),
        }
    }

    pub fn as_bool(&self) -> Result<&[bool], VariableError> {
        match self {
            Buffer::Bool(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::Bool, actual: other.kind() }.into()),
        }
    }

    pub fn as_str(&self) -> Result<&[String], VariableError> {
        match self {
            Buffer::Str(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::Str, actual: other.kind() }.into()),
        }
    }

    pub fn as_f32_mut(&mut self) -> Result<&mut [f32], VariableError> {
        let kind = self.kind();
        match self {
            Buffer::F32(v) => Ok(v),
            _ => Err(KindError::Mismatch { expected: ElementKind::F32, actual: kind }.into()),
        }
    }

    pub fn as_i32_mut(&mut self) -> Result<&mut [i32], VariableError> {
        let kind = self.kind();
        match self {
            Buffer::I32(v) => Ok(v),
            _ => Err(KindError::Mismatch { expected: ElementKind::I32, actual: kind }.into()),
        }
    }

    pub fn as_i64_mut(&mut self) -> Result<&mut [i64], VariableError> {
        let kind = self.kind();
        match self {
            Buffer::I64(v) => Ok(v),
            _ => Err(KindError::Mismatch { expected: ElementKind::I64, actual: kind }.into()),
        }
    }

    pub fn as_bool_mut(&mut self) -> Result<&mut [bool], VariableError> {
        let kind = self.kind();
        match self {
            Buffer::Bool(v) => Ok(v),
            _ => Err(KindError::Mismatch { expected: ElementKind::Bool, actual: kind }.into()),
        }
    }

    pub fn as_vector3(&self) -> Result<&[Vector3], VariableError> {
        match self {
            Buffer::Vector3(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::Vector3, actual: other.kind() }.into()),
        }
    }

    pub fn as_dataset(&self) -> Result<&[Dataset], VariableError> {
        match self {
            Buffer::Dataset(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::Dataset, actual: other.kind() }.into()),
        }
    }

    pub fn as_events_f32(&self) -> Result<&[Vec<f32>], VariableError> {
        match self {
            Buffer::EventListF32(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::EventListF32, actual: other.kind() }.into()),
        }
    }

    pub fn as_events_f64(&self) -> Result<&[Vec<f64>], VariableError> {
        match self {
            Buffer::EventListF64(v) => Ok(v),
            other => Err(KindError::Mismatch { expected: ElementKind::EventListF64, actual: other.kind() }.into()),
        }
    }

    pub fn as_events_f64_mut(&mut self) -> Result<&mut [Vec<f64>], VariableError> {
        let kind = self.kind();
        match self {
            Buffer::EventListF64(v) => Ok(v),
            _ => Err(KindError::Mismatch { expected: ElementKind::EventListF64, actual: kind }.into()),
        }
    }

    pub fn as_events_f32_mut(&mut self) -> Result<&mut [Vec<f32>], VariableError> {
        let kind = self.kind();
        match self {
            Buffer::EventListF32(v) => Ok(v),
            _ => Err(KindError::Mismatch { expected: ElementKind::EventListF32, actual: kind }.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_has_requested_length() {
        let b = Buffer::zeroed(ElementKind::F64, 5);
        assert_eq!(b.len(), 5);
        assert_eq!(b.as_f64().unwrap(), &[0.0; 5]);
    }

    #[test]
    fn typed_accessor_rejects_wrong_kind() {
        let b = Buffer::zeroed(ElementKind::I32, 2);
        assert!(b.as_f64().is_err());
    }
}
