//! Linear constraint types for MIQP instances.
//!
//! Constraints map to cone rows in the solver:
//! - Zero: a'x + c = 0 (zero cone / equality)
//! - NonNeg: a'x + c >= 0 (nonnegative orthant)

use crate::expr::{LinExpr, VarId};

/// Cone a constraint row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cone {
    /// expr == 0.
    Zero,
    /// expr >= 0.
    NonNeg,
}

/// A labelled linear constraint `expr ∈ cone`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Human-readable label, e.g. `long_bound[AAPL]`.
    pub label: String,
    /// Cone the expression must lie in.
    pub cone: Cone,
    /// Affine expression.
    pub expr: LinExpr,
}

impl Constraint {
    /// Create an equality constraint: lhs == rhs.
    pub fn eq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Constraint {
            label: String::new(),
            cone: Cone::Zero,
            expr: &lhs.into() - &rhs.into(),
        }
    }

    /// Create an inequality constraint: lhs <= rhs.
    pub fn leq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        // lhs <= rhs  <=>  rhs - lhs >= 0
        Constraint {
            label: String::new(),
            cone: Cone::NonNeg,
            expr: &rhs.into() - &lhs.into(),
        }
    }

    /// Create an inequality constraint: lhs >= rhs.
    pub fn geq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        // lhs >= rhs  <=>  lhs - rhs >= 0
        Constraint {
            label: String::new(),
            cone: Cone::NonNeg,
            expr: &lhs.into() - &rhs.into(),
        }
    }

    /// Attach a label.
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Amount by which `values` violate this constraint (zero when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let v = self.expr.evaluate(values);
        match self.cone {
            Cone::Zero => v.abs(),
            Cone::NonNeg => (-v).max(0.0),
        }
    }

    /// Check whether `values` satisfy this constraint within `tol`.
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        self.violation(values) <= tol
    }

    /// Get all variable IDs in this constraint.
    pub fn variables(&self) -> Vec<VarId> {
        self.expr.variables()
    }
}

/// Extension trait for creating constraints from expressions.
pub trait ConstraintExt {
    /// Create equality constraint: self == rhs.
    fn equals(&self, rhs: impl Into<LinExpr>) -> Constraint;

    /// Create inequality constraint: self <= rhs.
    fn leq(&self, rhs: impl Into<LinExpr>) -> Constraint;

    /// Create inequality constraint: self >= rhs.
    fn geq(&self, rhs: impl Into<LinExpr>) -> Constraint;
}

impl ConstraintExt for LinExpr {
    fn equals(&self, rhs: impl Into<LinExpr>) -> Constraint {
        Constraint::eq(self.clone(), rhs)
    }

    fn leq(&self, rhs: impl Into<LinExpr>) -> Constraint {
        Constraint::leq(self.clone(), rhs)
    }

    fn geq(&self, rhs: impl Into<LinExpr>) -> Constraint {
        Constraint::geq(self.clone(), rhs)
    }
}
