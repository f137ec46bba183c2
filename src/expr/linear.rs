//! Affine expressions over scalar variables: sum_i(a_i * x_i) + c

use std::collections::BTreeMap;
use std::ops::{Add, Mul, Neg, Sub};

use super::variable::VarId;

/// An affine expression in standard form: sum_i(a_i * x_i) + c
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    /// Coefficient for each variable. Ordered so that iteration is deterministic.
    pub coeffs: BTreeMap<VarId, f64>,
    /// Constant term (offset).
    pub constant: f64,
}

impl LinExpr {
    /// Create the zero expression.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Create an expression for a single variable (unit coefficient).
    pub fn variable(id: VarId) -> Self {
        Self::term(id, 1.0)
    }

    /// Create a single weighted term a * x.
    pub fn term(id: VarId, coeff: f64) -> Self {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(id, coeff);
        LinExpr {
            coeffs,
            constant: 0.0,
        }
    }

    /// Create a constant expression.
    pub fn constant(value: f64) -> Self {
        LinExpr {
            coeffs: BTreeMap::new(),
            constant: value,
        }
    }

    /// Sum of the given variables, each with unit coefficient.
    pub fn sum_of(ids: impl IntoIterator<Item = VarId>) -> Self {
        ids.into_iter()
            .fold(LinExpr::zero(), |acc, id| acc.add_term(id, 1.0))
    }

    /// Check if this is a constant (no variables).
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Coefficient of `id`, zero when absent.
    pub fn coeff(&self, id: VarId) -> f64 {
        self.coeffs.get(&id).copied().unwrap_or(0.0)
    }

    /// Add a * x to this expression.
    pub fn add_term(mut self, id: VarId, coeff: f64) -> Self {
        *self.coeffs.entry(id).or_insert(0.0) += coeff;
        self
    }

    /// Add two affine expressions.
    pub fn add(&self, other: &LinExpr) -> LinExpr {
        let mut coeffs = self.coeffs.clone();
        for (id, coeff) in &other.coeffs {
            *coeffs.entry(*id).or_insert(0.0) += coeff;
        }
        LinExpr {
            coeffs,
            constant: self.constant + other.constant,
        }
    }

    /// Negate an affine expression.
    pub fn neg(&self) -> LinExpr {
        self.scale(-1.0)
    }

    /// Scale by a scalar.
    pub fn scale(&self, scalar: f64) -> LinExpr {
        LinExpr {
            coeffs: self.coeffs.iter().map(|(k, v)| (*k, v * scalar)).collect(),
            constant: self.constant * scalar,
        }
    }

    /// Evaluate at a point given as one value per variable column.
    ///
    /// Columns outside `values` evaluate as zero.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.coeffs
            .iter()
            .map(|(id, c)| c * values.get(id.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    /// Get all variable IDs in this expression, in column order.
    pub fn variables(&self) -> Vec<VarId> {
        self.coeffs.keys().copied().collect()
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::constant(value)
    }
}

impl From<VarId> for LinExpr {
    fn from(id: VarId) -> Self {
        LinExpr::variable(id)
    }
}

impl Add for &LinExpr {
    type Output = LinExpr;

    fn add(self, rhs: &LinExpr) -> LinExpr {
        LinExpr::add(self, rhs)
    }
}

impl Sub for &LinExpr {
    type Output = LinExpr;

    fn sub(self, rhs: &LinExpr) -> LinExpr {
        LinExpr::add(self, &rhs.neg())
    }
}

impl Neg for &LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        LinExpr::neg(self)
    }
}

impl Mul<f64> for &LinExpr {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        self.scale(rhs)
    }
}
