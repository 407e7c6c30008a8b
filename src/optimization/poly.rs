//! Scalar and polynomial contraction costs.

use std::collections::BTreeMap;
use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ContractError, ContractResult};

/// A polynomial in a single scaling variable, stored as exponent -> coefficient.
///
/// Zero coefficients are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Poly {
    symbol: String,
    terms: BTreeMap<u32, u128>,
}

impl Poly {
    /// Scaling variable name.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Highest exponent with a nonzero coefficient.
    pub fn degree(&self) -> u32 {
        self.terms.keys().next_back().copied().unwrap_or(0)
    }

    /// Coefficient of the given exponent.
    pub fn coefficient(&self, exponent: u32) -> u128 {
        self.terms.get(&exponent).copied().unwrap_or(0)
    }
}

/// Cost of a label or of a contraction.
///
/// Either a plain nonnegative integer or a polynomial in one abstract scaling
/// variable. Integers behave as degree-zero polynomials, so the two forms can
/// be combined and compared freely. Polynomials in different variables cannot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cost {
    Integer(u128),
    Polynomial(Poly),
}

impl Cost {
    pub fn zero() -> Self {
        Cost::Integer(0)
    }

    pub fn one() -> Self {
        Cost::Integer(1)
    }

    /// The scaling variable itself, `χ`.
    pub fn var(symbol: impl Into<String>) -> Self {
        Cost::power(symbol, 1, 1)
    }

    /// A single term `coefficient * symbol^exponent`.
    pub fn power(symbol: impl Into<String>, coefficient: u128, exponent: u32) -> Self {
        Cost::polynomial(symbol, [(exponent, coefficient)])
    }

    /// Builds a polynomial from `(exponent, coefficient)` pairs.
    ///
    /// Repeated exponents are summed; a polynomial with no positive-degree
    /// term collapses to an integer.
    pub fn polynomial(
        symbol: impl Into<String>,
        terms: impl IntoIterator<Item = (u32, u128)>,
    ) -> Self {
        let mut map = BTreeMap::new();
        for (exponent, coefficient) in terms {
            let entry = map.entry(exponent).or_insert(0u128);
            *entry = entry.saturating_add(coefficient);
        }
        Cost::normalized(symbol.into(), map)
    }

    fn normalized(symbol: String, mut terms: BTreeMap<u32, u128>) -> Self {
        terms.retain(|_, c| *c != 0);
        if terms.keys().all(|&e| e == 0) {
            Cost::Integer(terms.get(&0).copied().unwrap_or(0))
        } else {
            Cost::Polynomial(Poly { symbol, terms })
        }
    }

    /// Scaling variable, if this cost depends on one.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Cost::Integer(_) => None,
            Cost::Polynomial(p) => Some(p.symbol()),
        }
    }

    /// Polynomial degree; integers have degree zero.
    pub fn degree(&self) -> u32 {
        match self {
            Cost::Integer(_) => 0,
            Cost::Polynomial(p) => p.degree(),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Cost::Integer(0))
    }

    /// Terms as `(exponent, coefficient)` from highest to lowest degree.
    fn terms_descending(&self) -> Vec<(u32, u128)> {
        match self {
            Cost::Integer(0) => Vec::new(),
            Cost::Integer(c) => vec![(0, *c)],
            Cost::Polynomial(p) => p.terms.iter().rev().map(|(&e, &c)| (e, c)).collect(),
        }
    }

    fn term_map(&self) -> BTreeMap<u32, u128> {
        self.terms_descending().into_iter().collect()
    }

    fn common_symbol(&self, other: &Cost) -> ContractResult<Option<String>> {
        match (self.symbol(), other.symbol()) {
            (Some(a), Some(b)) if a != b => Err(ContractError::IncomparableCost {
                left: self.to_string(),
                right: other.to_string(),
            }),
            (Some(a), _) | (None, Some(a)) => Ok(Some(a.to_string())),
            (None, None) => Ok(None),
        }
    }

    /// Sum of two costs.
    pub fn checked_add(&self, other: &Cost) -> ContractResult<Cost> {
        match (self, other) {
            (Cost::Integer(a), Cost::Integer(b)) => Ok(Cost::Integer(a.saturating_add(*b))),
            _ => {
                let symbol = self.common_symbol(other)?.unwrap_or_default();
                let mut terms = self.term_map();
                for (e, c) in other.terms_descending() {
                    let entry = terms.entry(e).or_insert(0);
                    *entry = entry.saturating_add(c);
                }
                Ok(Cost::normalized(symbol, terms))
            }
        }
    }

    /// Product of two costs.
    pub fn checked_mul(&self, other: &Cost) -> ContractResult<Cost> {
        match (self, other) {
            (Cost::Integer(a), Cost::Integer(b)) => Ok(Cost::Integer(a.saturating_mul(*b))),
            _ => {
                let symbol = self.common_symbol(other)?.unwrap_or_default();
                let mut terms: BTreeMap<u32, u128> = BTreeMap::new();
                for (ea, ca) in self.terms_descending() {
                    for (eb, cb) in other.terms_descending() {
                        let entry = terms.entry(ea.saturating_add(eb)).or_insert(0);
                        *entry = entry.saturating_add(ca.saturating_mul(cb));
                    }
                }
                Ok(Cost::normalized(symbol, terms))
            }
        }
    }

    /// Total order used by the optimizer.
    ///
    /// Higher degree is larger; at equal degree the leading coefficients
    /// decide, then the remaining terms from highest to lowest degree.
    pub fn try_cmp(&self, other: &Cost) -> ContractResult<Ordering> {
        if let (Cost::Integer(a), Cost::Integer(b)) = (self, other) {
            return Ok(a.cmp(b));
        }
        self.common_symbol(other)?;

        let lhs = self.terms_descending();
        let rhs = other.terms_descending();
        for (a, b) in lhs.iter().zip(rhs.iter()) {
            let ord = a.0.cmp(&b.0).then(a.1.cmp(&b.1));
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(lhs.len().cmp(&rhs.len()))
    }

    /// Returns true if `self < other`.
    pub fn try_lt(&self, other: &Cost) -> ContractResult<bool> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }
}

impl Default for Cost {
    fn default() -> Self {
        Cost::one()
    }
}

impl From<u128> for Cost {
    fn from(value: u128) -> Self {
        Cost::Integer(value)
    }
}

impl From<u64> for Cost {
    fn from(value: u64) -> Self {
        Cost::Integer(value as u128)
    }
}

impl From<usize> for Cost {
    fn from(value: usize) -> Self {
        Cost::Integer(value as u128)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Integer(c) => write!(f, "{c}"),
            Cost::Polynomial(p) => {
                for (i, (&e, &c)) in p.terms.iter().rev().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    match (c, e) {
                        (c, 0) => write!(f, "{c}")?,
                        (1, 1) => write!(f, "{}", p.symbol)?,
                        (1, e) => write!(f, "{}^{e}", p.symbol)?,
                        (c, 1) => write!(f, "{c}{}", p.symbol)?,
                        (c, e) => write!(f, "{c}{}^{e}", p.symbol)?,
                    }
                }
                Ok(())
            }
        }
    }
}
