// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Dataset` (§6, §9): a mapping from `(role, name)` to `Variable`, specified
//! only at the interface level Variable must support — role propagation,
//! coordinate alignment, mask OR-combination on arithmetic. Grounded on the
//! teacher's `aliases.rs` (a named surface over the core type, not a second
//! implementation) and the closed-enum-as-role-tag texture of `data_repr.rs`'s
//! `Device`.
//!
//! Deliberately minimal per SPEC_FULL §10: no iteration/broadcast
//! optimization beyond what single-`Variable` arithmetic already provides;
//! the aggregation logic proper is explicitly out of core scope (§1).

use crate::dim::Dim;
use crate::dtype::ElementKind;
use crate::error::{DimensionError, VariableError};
use crate::variable::Variable;

/// The closed set of roles a named `Variable` can play inside a `Dataset`
/// (§6, design note §9: "the 'tag' ... is a closed enumeration").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Coord,
    Label,
    Data,
    Mask,
    Attr,
}

/// A mapping from `(role, name)` to `Variable`. Insertion order is
/// preserved; lookups are linear, matching the small-N, name-keyed access
/// pattern this collaborator is used for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    entries: Vec<(Role, String, Variable)>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset { entries: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insert or replace the Variable at `(role, name)`.
    pub fn set(&mut self, role: Role, name: impl Into<String>, var: Variable) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(r, n, _)| *r == role && *n == name) {
            slot.2 = var;
        } else {
            self.entries.push((role, name, var));
        }
    }

    pub fn get(&self, role: Role, name: &str) -> Option<&Variable> {
        self.entries.iter().find(|(r, n, _)| *r == role && n == name).map(|(_, _, v)| v)
    }

    pub fn get_mut(&mut self, role: Role, name: &str) -> Option<&mut Variable> {
        self.entries.iter_mut().find(|(r, n, _)| *r == role && n == name).map(|(_, _, v)| v)
    }

    pub fn remove(&mut self, role: Role, name: &str) -> Option<Variable> {
        let i = self.entries.iter().position(|(r, n, _)| *r == role && n == name)?;
        Some(self.entries.remove(i).2)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str, &Variable)> {
        self.entries.iter().map(|(r, n, v)| (*r, n.as_str(), v))
    }

    pub fn by_role(&self, role: Role) -> impl Iterator<Item = (&str, &Variable)> {
        self.entries.iter().filter(move |(r, _, _)| *r == role).map(|(_, n, v)| (n.as_str(), v))
    }

    /// Every coordinate Variable whose dims contain `dim` must carry the
    /// same extent for it, else arithmetic between two Datasets would be
    /// silently misaligned (§6: "coordinate axes ... participate in
    /// alignment checks for arithmetic between Datasets").
    pub fn check_coord_alignment(&self, other: &Dataset, dim: Dim) -> Result<(), VariableError> {
        let mine = self.by_role(Role::Coord).find_map(|(n, v)| (v.dims().contains(dim)).then(|| (n, v)));
        let theirs = other.by_role(Role::Coord).find_map(|(n, v)| (v.dims().contains(dim)).then(|| (n, v)));
        if let (Some((_, a)), Some((_, b))) = (mine, theirs) {
            let (ea, eb) = (a.dims().extent(dim)?, b.dims().extent(dim)?);
            if ea != eb {
                return Err(DimensionError::Mismatch {
                    expected: format!("{dim}: {ea}"),
                    actual: format!("{dim}: {eb}"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Elementwise `self += other` across every `data`-role Variable shared
    /// by name, after checking coordinate alignment on every dimension each
    /// side's coordinates name; `mask`-role Variables are OR-combined rather
    /// than summed (§6: "masks are OR-combined on arithmetic").
    pub fn add_assign(&mut self, other: &Dataset) -> Result<(), VariableError> {
        for (_, _, coord) in self.entries.iter().filter(|(r, _, _)| *r == Role::Coord) {
            for &label in coord.dims().labels() {
                self.check_coord_alignment(other, label)?;
            }
        }
        let data_names: Vec<String> =
            self.by_role(Role::Data).map(|(n, _)| n.to_string()).collect();
        for name in data_names {
            if let Some(rhs) = other.get(Role::Data, &name).cloned() {
                if let Some(lhs) = self.get_mut(Role::Data, &name) {
                    lhs.add_assign(&rhs)?;
                }
            }
        }
        let mask_names: Vec<String> =
            self.by_role(Role::Mask).map(|(n, _)| n.to_string()).collect();
        for name in mask_names {
            if let Some(rhs) = other.get(Role::Mask, &name).cloned() {
                if let Some(lhs) = self.get_mut(Role::Mask, &name) {
                    lhs.or_assign(&rhs)?;
                }
            }
        }
        Ok(())
    }

    /// The element-kind a Dataset-as-element Variable carries, for
    /// equality/copy dispatch in `Storage`/`Buffer` (§9: cycles forbidden by
    /// construction — this is the only place a `Dataset` value exists).
    pub fn element_kind() -> ElementKind {
        ElementKind::Dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;
    use crate::dimensions::Dimensions;
    use crate::units::Unit;

    fn var1d(dim: Dim, values: &[f64]) -> Variable {
        Variable::from_f64(Unit::dimensionless(), Dimensions::from_dense([(dim, values.len())]).unwrap(), values.to_vec()).unwrap()
    }

    #[test]
    fn set_and_get_roundtrip() {
        let mut ds = Dataset::new();
        ds.set(Role::Data, "counts", var1d(Dim::X, &[1.0, 2.0, 3.0]));
        assert!(ds.get(Role::Data, "counts").is_some());
        assert!(ds.get(Role::Coord, "counts").is_none());
    }

    #[test]
    fn coord_alignment_detects_mismatch() {
        let mut a = Dataset::new();
        a.set(Role::Coord, "x", var1d(Dim::X, &[0.0, 1.0, 2.0]));
        let mut b = Dataset::new();
        b.set(Role::Coord, "x", var1d(Dim::X, &[0.0, 1.0]));
        assert!(a.check_coord_alignment(&b, Dim::X).is_err());
    }

    #[test]
    fn add_assign_combines_data_and_masks() {
        let mut a = Dataset::new();
        a.set(Role::Data, "counts", var1d(Dim::X, &[1.0, 2.0, 3.0]));
        let mut b = Dataset::new();
        b.set(Role::Data, "counts", var1d(Dim::X, &[10.0, 20.0, 30.0]));
        a.add_assign(&b).unwrap();
        assert_eq!(a.get(Role::Data, "counts").unwrap().values_f64().unwrap(), &[11.0, 22.0, 33.0]);
    }
}
