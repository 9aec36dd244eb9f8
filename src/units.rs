// Copyright (c) 2026 the labeled-variable authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A minimal stand-in for the physical-units collaborator §1 places out of
//! scope, implementing exactly the interface the spec says may be assumed:
//! equality, multiplication (and division), and a canonical "counts" token.
//! This is not a units *library* — no conversions, no SI prefixes, nothing
//! beyond what §1 and §4.7 lean on.

use std::collections::BTreeMap;
use std::fmt;

/// A symbolic unit, represented as signed integer powers of named base
/// symbols (e.g. `m^1 s^-1`). `Unit::dimensionless()` is the empty map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unit {
    powers: BTreeMap<&'static str, i32>,
}

impl Unit {
    pub fn dimensionless() -> Self {
        Unit { powers: BTreeMap::new() }
    }

    /// The canonical "counts" token used by histogram-like quantities
    /// (§4.7: a fused sparse/dense op's result "carries an implicit
    /// `counts` factor").
    pub fn counts() -> Self {
        Unit::base("counts")
    }

    pub fn base(symbol: &'static str) -> Self {
        let mut powers = BTreeMap::new();
        powers.insert(symbol, 1);
        Unit { powers }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.powers.is_empty()
    }

    pub fn is_counts(&self) -> bool {
        self.powers.len() == 1 && self.powers.get("counts") == Some(&1)
    }

    /// Remove one power of the `counts` token, if present; used when a
    /// fused sparse/dense op's counts factor should not appear in the
    /// caller-visible result (§4.7).
    pub fn without_counts(&self) -> Unit {
        let mut powers = self.powers.clone();
        if let Some(p) = powers.get_mut("counts") {
            *p -= 1;
            if *p == 0 {
                powers.remove("counts");
            }
        }
        Unit { powers }
    }

    fn combine(a: &Unit, b: &Unit, sign: i32) -> Unit {
        let mut powers = a.powers.clone();
        for (&symbol, &power) in &b.powers {
            let entry = powers.entry(symbol).or_insert(0);
            *entry += sign * power;
            if *entry == 0 {
                powers.remove(symbol);
            }
        }
        Unit { powers }
    }
}

impl std::ops::Mul for &Unit {
    type Output = Unit;
    fn mul(self, rhs: &Unit) -> Unit {
        Unit::combine(self, rhs, 1)
    }
}

impl std::ops::Div for &Unit {
    type Output = Unit;
    fn div(self, rhs: &Unit) -> Unit {
        Unit::combine(self, rhs, -1)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.powers.is_empty() {
            return write!(f, "dimensionless");
        }
        for (i, (symbol, power)) in self.powers.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            if *power == 1 {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{symbol}^{power}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplication_combines_powers() {
        let m = Unit::base("m");
        let s = Unit::base("s");
        let mps = &m * &s;
        assert_eq!(&mps / &s, m);
    }

    #[test]
    fn counts_round_trips() {
        let c = Unit::counts();
        assert!(c.is_counts());
        assert!(c.without_counts().is_dimensionless());
    }

    #[test]
    fn dimensionless_is_identity() {
        let m = Unit::base("m");
        assert_eq!(&m * &Unit::dimensionless(), m);
    }
}
