//! Solver interface for mvportfolio.
//!
//! This module provides:
//! - The [`MiqpSolver`] boundary: a `MiqpInstance` goes in, a
//!   [`SolutionAssignment`] comes out
//! - Matrix stuffing of continuous relaxations into Clarabel's format
//! - A branch-and-bound adapter over the Clarabel QP solver

pub mod clarabel;
pub mod stuffing;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};
use crate::problem::MiqpInstance;

pub use self::clarabel::{ClarabelSettings, ClarabelSolver};
pub use stuffing::{stuff_relaxation, ConeDims, StuffedProblem};

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Optimal solution found.
    Optimal,
    /// No point satisfies the constraints.
    Infeasible,
    /// Objective can be improved without limit.
    Unbounded,
    /// The backend failed or gave up.
    SolverError,
    /// The time limit expired first.
    TimedOut,
}

impl SolverStatus {
    /// Check if the status carries a usable solution.
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolverStatus::Optimal)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
            SolverStatus::SolverError => "solver error",
            SolverStatus::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Result returned by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionAssignment {
    /// Solution status.
    pub status: SolverStatus,
    /// Variable values by name. Empty unless the status is optimal.
    pub values: BTreeMap<String, f64>,
    /// Objective value in the instance's own sense (if solved).
    pub objective_value: Option<f64>,
    /// Solve time in seconds.
    pub solve_time: f64,
    /// Number of relaxations solved.
    pub nodes: usize,
}

impl SolutionAssignment {
    /// An optimal assignment.
    pub fn optimal(values: BTreeMap<String, f64>, objective_value: f64) -> Self {
        SolutionAssignment {
            status: SolverStatus::Optimal,
            values,
            objective_value: Some(objective_value),
            solve_time: 0.0,
            nodes: 0,
        }
    }

    /// An assignment without values.
    pub fn unsolved(status: SolverStatus) -> Self {
        SolutionAssignment {
            status,
            values: BTreeMap::new(),
            objective_value: None,
            solve_time: 0.0,
            nodes: 0,
        }
    }

    /// Record solve statistics.
    pub fn with_stats(mut self, solve_time: f64, nodes: usize) -> Self {
        self.solve_time = solve_time;
        self.nodes = nodes;
        self
    }

    /// Get the value of a variable.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Get the value of a variable, returning an error on failure.
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::NoSolution`] for non-optimal assignments and
    /// [`PortfolioError::MissingVariable`] when the name is absent.
    pub fn try_value(&self, name: &str) -> Result<f64> {
        if !self.status.is_optimal() {
            return Err(PortfolioError::NoSolution(self.status));
        }
        self.get(name)
            .ok_or_else(|| PortfolioError::MissingVariable(name.to_string()))
    }
}

/// Per-solve options.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Wall-clock limit; `None` waits for completion.
    pub time_limit: Option<Duration>,
    /// Maximum number of relaxations; `None` for no limit.
    pub node_limit: Option<usize>,
    /// Distance from an integer below which a binary counts as integral.
    pub integrality_tolerance: f64,
    /// Print backend output.
    pub verbose: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            time_limit: None,
            node_limit: None,
            integrality_tolerance: 1e-6,
            verbose: false,
        }
    }
}

impl SolveOptions {
    /// Set the wall-clock limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Set the node limit.
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }
}

/// A mixed-integer quadratic programming backend.
///
/// Implementations translate the instance to their own representation and
/// report the outcome through [`SolutionAssignment`]. Non-optimal outcomes
/// are statuses, not errors.
pub trait MiqpSolver {
    /// Solve `instance`, blocking until done or `options.time_limit` expires.
    fn solve(&self, instance: &MiqpInstance, options: &SolveOptions) -> SolutionAssignment;
}

impl<S: MiqpSolver + ?Sized> MiqpSolver for &S {
    fn solve(&self, instance: &MiqpInstance, options: &SolveOptions) -> SolutionAssignment {
        (**self).solve(instance, options)
    }
}
