//! # mvportfolio
//!
//! Long/short mean-variance portfolio construction as a mixed-integer
//! quadratic program (MIQP).
//!
//! mvportfolio turns per-asset expected returns, exposure bounds and a
//! covariance matrix into an MIQP with a cardinality limit and aggregate
//! long/short exposure bounds, hands it to a solver, and derives risk/return
//! statistics from the solution.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mvportfolio::prelude::*;
//!
//! let universe = AssetUniverse::new(assets, covariance)?;
//! let config = ModelConfig::default().with_cardinality(10);
//!
//! let outcome = optimize(
//!     &universe,
//!     config,
//!     &ClarabelSolver::new(),
//!     &SolveOptions::default(),
//!     AnalysisConfig::default(),
//! )?;
//!
//! if let Some(report) = outcome.report() {
//!     println!("{}", report);
//! }
//! ```
//!
//! ## Model
//!
//! For each asset `i` with expected return `r_i`:
//!
//! ```text
//! maximize    sum_i r_i (ℓ_i - s_i) - ρ sum_ij Cov(i, j) (ℓ_i - s_i)(ℓ_j - s_j)
//! subject to  ℓ_i <= d_i^l ub_i              long bound
//!             s_i <= d_i^s lb_i              short bound
//!             d_i^l + d_i^s <= 1             long, short or neither
//!             sum_i (d_i^l + d_i^s) <= K     cardinality
//!             L_lo <= sum_i ℓ_i <= L_hi
//!             S_lo <= sum_i s_i <= S_hi
//!             ℓ, s >= 0,  d in {0, 1}
//! ```
//!
//! ## Architecture
//!
//! - **`AssetUniverse`** validates asset data and covariance
//! - **`PortfolioModelBuilder`** emits a solver-agnostic `MiqpInstance`
//! - **`MiqpSolver`** is the solver boundary; `ClarabelSolver` implements it
//!   by branch-and-bound over Clarabel QP relaxations
//! - **`ResultAnalyzer`** turns a `SolutionAssignment` into a `PortfolioReport`

pub mod analysis;
pub mod constraints;
pub mod data;
pub mod error;
pub mod expr;
pub mod model;
pub mod pipeline;
pub mod problem;
pub mod report;
pub mod solver;
pub mod sparse;
pub mod universe;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use mvportfolio::prelude::*;
/// ```
pub mod prelude {
    // Data
    pub use crate::universe::{Asset, AssetUniverse, CovarianceTable};

    // Model
    pub use crate::model::{
        ExposureBounds, ModelConfig, PortfolioModel, PortfolioModelBuilder, ShortBoundRule,
        VariableNames,
    };

    // Instance
    pub use crate::constraints::{Cone, Constraint, ConstraintExt};
    pub use crate::expr::{LinExpr, QuadExpr, VarId, VariableBuilder, VariableDomain, VariableSet};
    pub use crate::problem::{MiqpInstance, Objective};

    // Solver
    pub use crate::solver::{
        ClarabelSolver, MiqpSolver, SolutionAssignment, SolveOptions, SolverStatus,
    };

    // Analysis
    pub use crate::analysis::{AnalysisConfig, ResultAnalyzer};
    pub use crate::pipeline::{optimize, PortfolioOutcome};
    pub use crate::report::{AssetAllocation, PortfolioReport};

    // Errors
    pub use crate::error::{PortfolioError, Result};
}

// Re-export main types at crate root
pub use error::{PortfolioError, Result};
pub use problem::MiqpInstance;
pub use solver::{SolutionAssignment, SolverStatus};
