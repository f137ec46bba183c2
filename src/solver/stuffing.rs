//! Matrix stuffing: converts the continuous relaxation of an instance to
//! solver format.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    (1/2) x' P x + q' x
//! subject to  A x + s = b,  s in K
//! ```
//!
//! with `P` given as its upper triangle. Binary domains are relaxed to
//! `0 <= x <= 1`; branching decisions enter as extra equality rows.

use nalgebra_sparse::CscMatrix;

use crate::constraints::Cone;
use crate::expr::{LinExpr, VarId, VariableDomain};
use crate::problem::{MiqpInstance, Objective};
use crate::sparse::{csc_from_triplets, is_upper_triangular};

/// Cone dimensions for Clarabel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of zero cone (equality) rows.
    pub zero: usize,
    /// Number of nonnegative cone rows.
    pub nonneg: usize,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg
    }
}

/// Stuffed relaxation ready for Clarabel.
#[derive(Debug)]
pub struct StuffedProblem {
    /// Quadratic cost matrix P (n x n, upper triangle).
    pub p: CscMatrix<f64>,
    /// Linear cost vector q (n).
    pub q: Vec<f64>,
    /// Constraint matrix A (m x n).
    pub a: CscMatrix<f64>,
    /// Constraint vector b (m).
    pub b: Vec<f64>,
    /// Cone dimensions. Zero rows come first.
    pub cone_dims: ConeDims,
    /// Constant offset in objective.
    pub objective_offset: f64,
}

impl StuffedProblem {
    /// Minimization-form objective: (1/2) x' P x + q' x + offset.
    pub fn objective_at(&self, x: &[f64]) -> f64 {
        let linear: f64 = self.q.iter().zip(x).map(|(qi, xi)| qi * xi).sum();
        let mut quadratic = 0.0;
        for (row, col, val) in self.p.triplet_iter() {
            if row == col {
                quadratic += 0.5 * val * x[row] * x[col];
            } else {
                // upper triangle stands for both (row, col) and (col, row)
                quadratic += val * x[row] * x[col];
            }
        }
        linear + quadratic + self.objective_offset
    }
}

/// Row-major triplet accumulator for A and b.
#[derive(Default)]
struct RowStack {
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
    b: Vec<f64>,
}

impl RowStack {
    /// Push one row for `expr` in `cone`.
    ///
    /// Zero:   a'x + c = 0   =>  A = a,  b = -c
    /// NonNeg: a'x + c >= 0  =>  A = -a, b = c   (so that b - Ax >= 0)
    fn push(&mut self, expr: &LinExpr, cone: Cone) {
        let row = self.b.len();
        let sign = match cone {
            Cone::Zero => 1.0,
            Cone::NonNeg => -1.0,
        };
        for (id, coeff) in &expr.coeffs {
            if *coeff != 0.0 {
                self.rows.push(row);
                self.cols.push(id.index());
                self.vals.push(coeff * sign);
            }
        }
        self.b.push(-sign * expr.constant);
    }
}

/// Build the continuous relaxation of `instance` with the given variables
/// fixed to the paired values.
pub fn stuff_relaxation(instance: &MiqpInstance, fixings: &[(VarId, f64)]) -> StuffedProblem {
    let n = instance.num_variables();
    let (p, q, objective_offset) = stuff_objective(instance.objective(), n);

    let mut stack = RowStack::default();

    // Zero cone rows must precede nonnegative ones.
    for c in instance.constraints().iter().filter(|c| c.cone == Cone::Zero) {
        stack.push(&c.expr, Cone::Zero);
    }
    for (id, value) in fixings {
        stack.push(&(&LinExpr::variable(*id) - &LinExpr::constant(*value)), Cone::Zero);
    }
    let zero = stack.b.len();

    for c in instance.constraints().iter().filter(|c| c.cone == Cone::NonNeg) {
        stack.push(&c.expr, Cone::NonNeg);
    }
    for v in instance.variables() {
        // x >= 0 for both domains, x <= 1 for relaxed binaries
        stack.push(&LinExpr::variable(v.id), Cone::NonNeg);
        if v.domain == VariableDomain::Binary {
            stack.push(&(&LinExpr::constant(1.0) - &LinExpr::variable(v.id)), Cone::NonNeg);
        }
    }
    let total = stack.b.len();

    let a = csc_from_triplets(total, n, stack.rows, stack.cols, stack.vals);

    StuffedProblem {
        p,
        q,
        a,
        b: stack.b,
        cone_dims: ConeDims {
            zero,
            nonneg: total - zero,
        },
        objective_offset,
    }
}

/// Stuff the objective into P (upper triangle), q and the constant offset.
///
/// A maximization is negated into a minimization.
fn stuff_objective(objective: &Objective, n: usize) -> (CscMatrix<f64>, Vec<f64>, f64) {
    let negated = !objective.is_minimize();
    let sign = if negated { -1.0 } else { 1.0 };
    let expr = objective.expr();

    let mut q = vec![0.0; n];
    for (id, coeff) in &expr.linear.coeffs {
        q[id.index()] += sign * coeff;
    }

    let mut p_rows = Vec::new();
    let mut p_cols = Vec::new();
    let mut p_vals = Vec::new();
    for ((i, j), coeff) in &expr.quad_coeffs {
        // c x_i x_j with i < j is (1/2)(P_ij + P_ji) x_i x_j, so P_ij = c;
        // c x_i^2 is (1/2) P_ii x_i^2, so P_ii = 2c.
        let scale = if i == j { 2.0 } else { 1.0 };
        p_rows.push(i.index());
        p_cols.push(j.index());
        p_vals.push(sign * scale * coeff);
    }

    let p = csc_from_triplets(n, n, p_rows, p_cols, p_vals);
    debug_assert!(is_upper_triangular(&p));
    (p, q, sign * expr.constant)
}
