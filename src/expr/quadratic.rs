//! Quadratic expressions: sum_{i<=j} p_ij x_i x_j + q' x + r

use std::collections::BTreeMap;

use super::linear::LinExpr;
use super::variable::VarId;

/// A quadratic expression.
///
/// Each monomial x_i x_j is stored once under the key `(min(i, j), max(i, j))`,
/// so `quad_coeffs[(i, j)]` is the full coefficient of x_i x_j.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadExpr {
    /// Quadratic monomials.
    pub quad_coeffs: BTreeMap<(VarId, VarId), f64>,
    /// Linear term, with zero constant.
    pub linear: LinExpr,
    /// Constant term.
    pub constant: f64,
}

impl QuadExpr {
    /// Create a quadratic expression from an affine one.
    pub fn from_linear(linear: LinExpr) -> Self {
        let constant = linear.constant;
        QuadExpr {
            quad_coeffs: BTreeMap::new(),
            linear: LinExpr {
                coeffs: linear.coeffs,
                constant: 0.0,
            },
            constant,
        }
    }

    /// Product of two affine expressions.
    pub fn product(a: &LinExpr, b: &LinExpr) -> Self {
        let mut quad_coeffs = BTreeMap::new();
        for (ia, ca) in &a.coeffs {
            for (ib, cb) in &b.coeffs {
                let key = if ia <= ib { (*ia, *ib) } else { (*ib, *ia) };
                *quad_coeffs.entry(key).or_insert(0.0) += ca * cb;
            }
        }
        // (a_x + a_0)(b_x + b_0) = a_x b_x + a_0 b_x + b_0 a_x + a_0 b_0
        let mut linear = LinExpr::zero();
        if b.constant != 0.0 {
            linear = linear.add(&a.scale(b.constant));
        }
        if a.constant != 0.0 {
            linear = linear.add(&b.scale(a.constant));
        }
        QuadExpr {
            quad_coeffs,
            linear: LinExpr {
                coeffs: linear.coeffs,
                constant: 0.0,
            },
            constant: a.constant * b.constant,
        }
    }

    /// Check if this is purely linear (no quadratic terms).
    pub fn is_linear(&self) -> bool {
        self.quad_coeffs.values().all(|c| *c == 0.0)
    }

    /// Add two quadratic expressions.
    pub fn add(&self, other: &QuadExpr) -> QuadExpr {
        let mut quad_coeffs = self.quad_coeffs.clone();
        for (key, coeff) in &other.quad_coeffs {
            *quad_coeffs.entry(*key).or_insert(0.0) += coeff;
        }
        QuadExpr {
            quad_coeffs,
            linear: self.linear.add(&other.linear),
            constant: self.constant + other.constant,
        }
    }

    /// Scale by a scalar.
    pub fn scale(&self, scalar: f64) -> QuadExpr {
        QuadExpr {
            quad_coeffs: self
                .quad_coeffs
                .iter()
                .map(|(k, v)| (*k, v * scalar))
                .collect(),
            linear: self.linear.scale(scalar),
            constant: self.constant * scalar,
        }
    }

    /// Evaluate at a point given as one value per variable column.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let at = |id: &VarId| values.get(id.index()).copied().unwrap_or(0.0);
        let quad: f64 = self
            .quad_coeffs
            .iter()
            .map(|((i, j), c)| c * at(i) * at(j))
            .sum();
        quad + self.linear.evaluate(values) + self.constant
    }

    /// Get all variable IDs in this expression.
    pub fn variables(&self) -> Vec<VarId> {
        let mut vars = self.linear.variables();
        for (v1, v2) in self.quad_coeffs.keys() {
            vars.push(*v1);
            vars.push(*v2);
        }
        vars.sort();
        vars.dedup();
        vars
    }
}
