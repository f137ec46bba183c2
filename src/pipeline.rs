//! Build, solve and analyze in one call.

use tracing::{info, warn};

use crate::analysis::{AnalysisConfig, ResultAnalyzer};
use crate::error::Result;
use crate::model::{ModelConfig, PortfolioModelBuilder};
use crate::report::PortfolioReport;
use crate::solver::{MiqpSolver, SolveOptions, SolverStatus};
use crate::universe::AssetUniverse;

/// What a full optimization run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PortfolioOutcome {
    /// The solver found an optimum and it was analyzed.
    Solved(PortfolioReport),
    /// The solver finished without a usable solution.
    Unsolved(SolverStatus),
}

impl PortfolioOutcome {
    /// The report, if solved.
    pub fn report(&self) -> Option<&PortfolioReport> {
        match self {
            PortfolioOutcome::Solved(r) => Some(r),
            PortfolioOutcome::Unsolved(_) => None,
        }
    }

    /// Solver status of the run.
    pub fn status(&self) -> SolverStatus {
        match self {
            PortfolioOutcome::Solved(_) => SolverStatus::Optimal,
            PortfolioOutcome::Unsolved(s) => *s,
        }
    }
}

/// Build the model, solve it and analyze the result.
///
/// Configuration errors surface before the solver is called. Non-optimal
/// solver statuses are returned as [`PortfolioOutcome::Unsolved`].
pub fn optimize<S: MiqpSolver + ?Sized>(
    universe: &AssetUniverse,
    config: ModelConfig,
    solver: &S,
    solve_options: &SolveOptions,
    analysis: AnalysisConfig,
) -> Result<PortfolioOutcome> {
    analysis.validate()?;
    let model = PortfolioModelBuilder::new(universe, config).build()?;

    let assignment = solver.solve(&model.instance, solve_options);
    if !assignment.status.is_optimal() {
        warn!(status = %assignment.status, "no portfolio produced");
        return Ok(PortfolioOutcome::Unsolved(assignment.status));
    }

    let report = ResultAnalyzer::new(universe, analysis).analyze(&assignment)?;
    info!(
        net_return = report.net_return,
        volatility = report.volatility,
        names = report.name_count,
        "portfolio optimized"
    );
    Ok(PortfolioOutcome::Solved(report))
}
