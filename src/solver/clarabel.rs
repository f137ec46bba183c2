//! Clarabel solver integration.
//!
//! Clarabel is a continuous interior-point solver, so integrality is handled
//! here by depth-first branch-and-bound: each node solves the QP relaxation
//! with some binaries fixed, and the most fractional binary is branched on
//! until every binary is integral.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus as ClarabelStatus,
    SupportedConeT,
};
use tracing::{debug, info, trace, warn};

use super::stuffing::{stuff_relaxation, ConeDims, StuffedProblem};
use super::{MiqpSolver, SolutionAssignment, SolveOptions, SolverStatus};
use crate::expr::VarId;
use crate::problem::MiqpInstance;

/// Relative margin by which a node bound must beat the incumbent to be explored.
const PRUNE_REL_TOL: f64 = 1e-9;

/// Relative objective loss accepted when switching a binary off during polishing.
const POLISH_REL_TOL: f64 = 1e-6;

/// Interior-point settings passed to Clarabel for every relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClarabelSettings {
    /// Maximum iterations per relaxation.
    pub max_iter: u32,
    /// Absolute duality gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality gap tolerance.
    pub tol_gap_rel: f64,
    /// Feasibility tolerance.
    pub tol_feas: f64,
}

impl Default for ClarabelSettings {
    fn default() -> Self {
        ClarabelSettings {
            max_iter: 200,
            // Termination is governed by the relative gap.
            tol_gap_abs: 1e-12,
            tol_gap_rel: 1e-8,
            tol_feas: 1e-8,
        }
    }
}

/// Relaxation outcome, coarser than Clarabel's own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelaxationStatus {
    Solved,
    Infeasible,
    Unbounded,
    TimedOut,
    Failed,
}

impl From<ClarabelStatus> for RelaxationStatus {
    fn from(status: ClarabelStatus) -> Self {
        match status {
            ClarabelStatus::Solved | ClarabelStatus::AlmostSolved => RelaxationStatus::Solved,
            ClarabelStatus::PrimalInfeasible | ClarabelStatus::AlmostPrimalInfeasible => {
                RelaxationStatus::Infeasible
            }
            ClarabelStatus::DualInfeasible | ClarabelStatus::AlmostDualInfeasible => {
                RelaxationStatus::Unbounded
            }
            ClarabelStatus::MaxTime => RelaxationStatus::TimedOut,
            _ => RelaxationStatus::Failed,
        }
    }
}

/// Solution of one relaxation.
#[derive(Debug)]
struct Relaxation {
    status: RelaxationStatus,
    x: Vec<f64>,
    /// Minimization-form objective.
    objective: f64,
}

/// Branch-and-bound MIQP solver over Clarabel relaxations.
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    settings: ClarabelSettings,
}

impl ClarabelSolver {
    /// Create a solver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a solver with custom interior-point settings.
    pub fn with_settings(settings: ClarabelSettings) -> Self {
        ClarabelSolver { settings }
    }

    /// The interior-point settings in use.
    pub fn settings(&self) -> &ClarabelSettings {
        &self.settings
    }

    fn relax(
        &self,
        instance: &MiqpInstance,
        fixings: &[(VarId, f64)],
        verbose: bool,
        time_limit: Option<Duration>,
    ) -> Relaxation {
        let stuffed = stuff_relaxation(instance, fixings);
        solve_relaxation(&stuffed, &self.settings, verbose, time_limit)
    }
}

/// A branch-and-bound node: the binaries fixed on the path from the root.
#[derive(Debug, Clone, Default)]
struct Node {
    fixings: Vec<(VarId, f64)>,
}

impl Node {
    fn child(&self, id: VarId, value: f64) -> Node {
        let mut fixings = self.fixings.clone();
        fixings.push((id, value));
        Node { fixings }
    }

    fn is_root(&self) -> bool {
        self.fixings.is_empty()
    }
}

impl MiqpSolver for ClarabelSolver {
    fn solve(&self, instance: &MiqpInstance, options: &SolveOptions) -> SolutionAssignment {
        let start = Instant::now();
        let deadline = options.time_limit.map(|limit| start + limit);
        let binaries = instance.integer_variables();
        let tol = options.integrality_tolerance;

        let finish = |assignment: SolutionAssignment, nodes: usize| {
            let elapsed = start.elapsed();
            info!(
                status = %assignment.status,
                nodes,
                elapsed_ms = elapsed.as_millis() as u64,
                "branch-and-bound finished"
            );
            assignment.with_stats(elapsed.as_secs_f64(), nodes)
        };

        let mut stack = vec![Node::default()];
        let mut incumbent: Option<(f64, Vec<f64>)> = None;
        let mut nodes = 0;

        while let Some(node) = stack.pop() {
            let remaining = match deadline {
                Some(d) => match d.checked_duration_since(Instant::now()) {
                    Some(r) if !r.is_zero() => Some(r),
                    _ => {
                        warn!(nodes, "time limit reached");
                        return finish(SolutionAssignment::unsolved(SolverStatus::TimedOut), nodes);
                    }
                },
                None => None,
            };
            if options.node_limit.is_some_and(|limit| nodes >= limit) {
                warn!(nodes, "node limit reached");
                return finish(SolutionAssignment::unsolved(SolverStatus::SolverError), nodes);
            }

            nodes += 1;
            let relaxation = self.relax(instance, &node.fixings, options.verbose, remaining);
            trace!(
                depth = node.fixings.len(),
                status = ?relaxation.status,
                objective = relaxation.objective,
                "relaxation solved"
            );

            match relaxation.status {
                RelaxationStatus::Solved => {}
                RelaxationStatus::Infeasible if node.is_root() => {
                    return finish(SolutionAssignment::unsolved(SolverStatus::Infeasible), nodes);
                }
                RelaxationStatus::Unbounded if node.is_root() => {
                    return finish(SolutionAssignment::unsolved(SolverStatus::Unbounded), nodes);
                }
                RelaxationStatus::Failed if node.is_root() => {
                    return finish(SolutionAssignment::unsolved(SolverStatus::SolverError), nodes);
                }
                RelaxationStatus::TimedOut => {
                    warn!(nodes, "time limit reached inside relaxation");
                    return finish(SolutionAssignment::unsolved(SolverStatus::TimedOut), nodes);
                }
                RelaxationStatus::Infeasible => continue,
                RelaxationStatus::Unbounded | RelaxationStatus::Failed => {
                    warn!(
                        depth = node.fixings.len(),
                        status = ?relaxation.status,
                        "discarding node after relaxation failure"
                    );
                    continue;
                }
            }

            if let Some((best, _)) = &incumbent {
                if relaxation.objective >= best - PRUNE_REL_TOL * best.abs() {
                    continue;
                }
            }

            match most_fractional(&relaxation.x, &binaries, tol) {
                None => {
                    debug!(objective = relaxation.objective, nodes, "new incumbent");
                    incumbent = Some((relaxation.objective, relaxation.x));
                }
                Some(id) => {
                    let near = preferred_value(relaxation.x[id.index()]);
                    // The child nearer the relaxation is explored first.
                    stack.push(node.child(id, 1.0 - near));
                    stack.push(node.child(id, near));
                }
            }
        }

        match incumbent {
            Some((best, x)) => {
                let x = match deadline {
                    Some(d) if Instant::now() >= d => x,
                    _ => self.polish(instance, &binaries, best, x, options.verbose, deadline),
                };
                let values: BTreeMap<String, f64> = instance
                    .variables()
                    .iter()
                    .map(|v| (v.name.clone(), x[v.id.index()]))
                    .collect();
                let objective = instance.evaluate_objective(&x);
                finish(SolutionAssignment::optimal(values, objective), nodes)
            }
            None => finish(SolutionAssignment::unsolved(SolverStatus::Infeasible), nodes),
        }
    }
}

impl ClarabelSolver {
    /// Clean up an integral incumbent.
    ///
    /// Re-solves with every binary fixed to its rounded value, then tries to
    /// switch each binary that is on to off, keeping the change whenever the
    /// objective does not get worse by more than [`POLISH_REL_TOL`]. Binaries
    /// left on by interior-point noise are cleared this way.
    fn polish(
        &self,
        instance: &MiqpInstance,
        binaries: &[VarId],
        best: f64,
        x: Vec<f64>,
        verbose: bool,
        deadline: Option<Instant>,
    ) -> Vec<f64> {
        let mut fixings: Vec<(VarId, f64)> = binaries
            .iter()
            .map(|id| (*id, preferred_value(x[id.index()])))
            .collect();
        let remaining = || deadline.map(|d| d.saturating_duration_since(Instant::now()));

        let no_worse = |r: &Relaxation, best: f64| {
            r.status == RelaxationStatus::Solved
                && r.objective <= best + POLISH_REL_TOL * best.abs()
        };

        let fixed = self.relax(instance, &fixings, verbose, remaining());
        let (mut best, mut x) = if no_worse(&fixed, best) {
            (fixed.objective, fixed.x)
        } else {
            (best, x)
        };

        for k in 0..fixings.len() {
            if fixings[k].1 == 0.0 {
                continue;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("polishing stopped at the time limit");
                break;
            }
            fixings[k].1 = 0.0;
            let trial = self.relax(instance, &fixings, verbose, remaining());
            if no_worse(&trial, best) {
                trace!(
                    variable = %fixings[k].0,
                    objective = trial.objective,
                    "binary switched off"
                );
                best = trial.objective;
                x = trial.x;
            } else {
                fixings[k].1 = 1.0;
            }
        }
        debug!(
            objective = best,
            active = fixings.iter().filter(|(_, v)| *v == 1.0).count(),
            "incumbent polished"
        );
        x
    }
}

/// Value a binary is fixed to first when branching on it; ties go to 0.
fn preferred_value(x: f64) -> f64 {
    if x > 0.5 {
        1.0
    } else {
        0.0
    }
}

/// The binary farthest from integrality, if any exceeds `tol`.
fn most_fractional(x: &[f64], binaries: &[VarId], tol: f64) -> Option<VarId> {
    binaries
        .iter()
        .map(|id| (*id, (x[id.index()] - x[id.index()].round()).abs()))
        .filter(|(_, frac)| *frac > tol)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Solve a stuffed relaxation using Clarabel.
fn solve_relaxation(
    problem: &StuffedProblem,
    settings: &ClarabelSettings,
    verbose: bool,
    time_limit: Option<Duration>,
) -> Relaxation {
    let failed = || Relaxation {
        status: RelaxationStatus::Failed,
        x: Vec::new(),
        objective: f64::NAN,
    };

    let p = to_clarabel_csc(&problem.p);
    let a = to_clarabel_csc(&problem.a);
    let cones = to_clarabel_cones(&problem.cone_dims);

    let clarabel_settings = match DefaultSettingsBuilder::default()
        .verbose(verbose)
        .max_iter(settings.max_iter)
        .time_limit(time_limit.map_or(f64::INFINITY, |t| t.as_secs_f64()))
        .tol_gap_abs(settings.tol_gap_abs)
        .tol_gap_rel(settings.tol_gap_rel)
        .tol_feas(settings.tol_feas)
        .build()
    {
        Ok(s) => s,
        Err(err) => {
            warn!(error = %err, "invalid Clarabel settings");
            return failed();
        }
    };

    let mut solver = DefaultSolver::new(&p, &problem.q, &a, &problem.b, &cones, clarabel_settings);
    solver.solve();

    let status = RelaxationStatus::from(solver.solution.status);
    if status != RelaxationStatus::Solved {
        return Relaxation {
            status,
            ..failed()
        };
    }

    let x = solver.solution.x.clone();
    let objective = problem.objective_at(&x);
    Relaxation {
        status,
        x,
        objective,
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();

    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }

    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }

    cones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{VariableBuilder, VariableSet};

    #[test]
    fn test_default_settings() {
        let settings = ClarabelSettings::default();
        assert_eq!(settings.max_iter, 200);
        assert_eq!(settings.tol_gap_abs, 1e-12);
        assert_eq!(settings.tol_gap_rel, 1e-8);
    }

    #[test]
    fn test_to_clarabel_cones() {
        let cones = to_clarabel_cones(&ConeDims { zero: 2, nonneg: 3 });
        assert_eq!(cones.len(), 2);
        let cones = to_clarabel_cones(&ConeDims { zero: 0, nonneg: 3 });
        assert_eq!(cones.len(), 1);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelaxationStatus::from(ClarabelStatus::AlmostSolved),
            RelaxationStatus::Solved
        );
        assert_eq!(
            RelaxationStatus::from(ClarabelStatus::PrimalInfeasible),
            RelaxationStatus::Infeasible
        );
        assert_eq!(
            RelaxationStatus::from(ClarabelStatus::MaxTime),
            RelaxationStatus::TimedOut
        );
        assert_eq!(
            RelaxationStatus::from(ClarabelStatus::NumericalError),
            RelaxationStatus::Failed
        );
    }

    #[test]
    fn test_ties_prefer_zero() {
        assert_eq!(preferred_value(0.5), 0.0);
        assert_eq!(preferred_value(0.49), 0.0);
        assert_eq!(preferred_value(0.500_001), 1.0);
        assert_eq!(preferred_value(1.0), 1.0);
    }

    #[test]
    fn test_most_fractional() {
        let mut vars = VariableSet::new();
        let a = vars.add(VariableBuilder::binary());
        let b = vars.add(VariableBuilder::binary());
        let c = vars.add(VariableBuilder::binary());
        let binaries = [a, b, c];

        assert_eq!(most_fractional(&[1.0, 0.3, 0.45], &binaries, 1e-6), Some(c));
        assert_eq!(most_fractional(&[1.0, 1e-9, 0.0], &binaries, 1e-6), None);
    }
}
