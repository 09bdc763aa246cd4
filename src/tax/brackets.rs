//! Progressive bracket schedules.
//!
//! A `BracketTable` is validated once at construction:
//! - the first bracket starts at 0
//! - each bracket is non-empty (`upper > lower`)
//! - brackets are contiguous (`next.lower == prev.upper`)
//! - the last bracket ends at `+inf`
//! - rates are finite and non-negative
//!
//! With those invariants the tax function is total, continuous, non-decreasing and
//! piecewise-linear, with slope equal to the marginal rate inside each bracket.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A single marginal-rate bracket `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub lower: f64,
    #[serde(with = "open_bound")]
    pub upper: f64,
    pub rate: f64,
}

/// Infinite bounds are written as the string `"inf"` (JSON has no infinity) and read
/// back from either a number or a string such as `"inf"` or `"infinity"`.
mod open_bound {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bound {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Bound::deserialize(deserializer)? {
            Bound::Number(v) => Ok(v),
            Bound::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid bracket bound '{text}'"))),
        }
    }
}

impl Bracket {
    pub const fn new(lower: f64, upper: f64, rate: f64) -> Self {
        Self { lower, upper, rate }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketTable {
    brackets: Vec<Bracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, AppError> {
        let Some(first) = brackets.first() else {
            return Err(AppError::configuration("Bracket table is empty."));
        };
        if first.lower != 0.0 {
            return Err(AppError::configuration(format!(
                "Bracket table must start at 0, starts at {}.",
                first.lower
            )));
        }
        for (i, b) in brackets.iter().enumerate() {
            if !(b.rate.is_finite() && b.rate >= 0.0) {
                return Err(AppError::configuration(format!("Bracket {i} has invalid rate {}.", b.rate)));
            }
            if !(b.lower.is_finite() && b.upper > b.lower) {
                return Err(AppError::configuration(format!(
                    "Bracket {i} is not ascending: [{}, {}).",
                    b.lower, b.upper
                )));
            }
        }
        for (i, w) in brackets.windows(2).enumerate() {
            if w[1].lower != w[0].upper {
                return Err(AppError::configuration(format!(
                    "Brackets {i} and {} leave a gap or overlap: {} vs {}.",
                    i + 1,
                    w[0].upper,
                    w[1].lower
                )));
            }
        }
        let last = brackets[brackets.len() - 1];
        if last.upper != f64::INFINITY {
            return Err(AppError::configuration(format!(
                "Last bracket must end at infinity, ends at {}.",
                last.upper
            )));
        }
        Ok(Self { brackets })
    }

    /// Build a table from `(upper, rate)` pairs, each bracket starting where the
    /// previous one ended.
    #[cfg(test)]
    pub fn from_limits(limits: &[(f64, f64)]) -> Result<Self, AppError> {
        let mut lower = 0.0;
        let mut brackets = Vec::with_capacity(limits.len());
        for &(upper, rate) in limits {
            brackets.push(Bracket::new(lower, upper, rate));
            lower = upper;
        }
        Self::new(brackets)
    }

    /// A single flat rate on the whole base.
    #[cfg(test)]
    pub fn flat(rate: f64) -> Result<Self, AppError> {
        Self::new(vec![Bracket::new(0.0, f64::INFINITY, rate)])
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// Tax due on `base`. Non-positive (and NaN) bases owe nothing.
    pub fn tax(&self, base: f64) -> f64 {
        if !(base > 0.0) {
            return 0.0;
        }
        let mut tax = 0.0;
        for b in &self.brackets {
            if base <= b.lower {
                break;
            }
            tax += (base.min(b.upper) - b.lower) * b.rate;
        }
        tax
    }

    /// Marginal rate applying at `base`.
    pub fn marginal_rate(&self, base: f64) -> f64 {
        self.brackets
            .iter()
            .find(|b| base >= b.lower && base < b.upper)
            .map(|b| b.rate)
            .unwrap_or(0.0)
    }
}
