//! Result analysis and the build → solve → analyze pipeline, driven by canned
//! solver assignments.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};

use mvportfolio::prelude::*;

/// Tolerance for comparing floating point results
const TOL: f64 = 1e-12;

/// Solver stub returning a fixed assignment.
struct CannedSolver(SolutionAssignment);

impl MiqpSolver for CannedSolver {
    fn solve(&self, _instance: &MiqpInstance, _options: &SolveOptions) -> SolutionAssignment {
        self.0.clone()
    }
}

fn scenario_universe() -> AssetUniverse {
    AssetUniverse::new(
        vec![
            Asset::new("A", 0.001, 0.1, 0.1),
            Asset::new("B", 0.002, 0.1, 0.1),
        ],
        CovarianceTable::from_rows(
            vec!["A".into(), "B".into()],
            vec![vec![0.0001, 0.0], vec![0.0, 0.0002]],
        )
        .unwrap(),
    )
    .unwrap()
}

fn scenario_config() -> ModelConfig {
    ModelConfig::default()
        .with_risk_aversion(0.5)
        .with_cardinality(1)
        .with_net_long(0.0, 1.0)
        .with_net_short(0.0, 1.0)
}

/// Assignment with every variable of every asset present.
///
/// Each entry is (asset, long, short, long_on, short_on).
fn assignment(entries: &[(&str, f64, f64, f64, f64)]) -> SolutionAssignment {
    let mut values = BTreeMap::new();
    for (id, long, short, long_on, short_on) in entries {
        let names = VariableNames::for_asset(id);
        values.insert(names.long, *long);
        values.insert(names.short, *short);
        values.insert(names.long_on, *long_on);
        values.insert(names.short_on, *short_on);
    }
    SolutionAssignment::optimal(values, 0.0)
}

#[test]
fn test_scenario_report() {
    let u = scenario_universe();
    let a = assignment(&[("A", 0.1, 0.0, 1.0, 0.0), ("B", 0.0, 0.0, 0.0, 0.0)]);
    let report = ResultAnalyzer::new(&u, AnalysisConfig::default())
        .analyze(&a)
        .expect("analysis failed");

    assert!((report.net_return - 0.0001).abs() < TOL, "got {}", report.net_return);
    assert!((report.variance - 1e-6).abs() < TOL, "got {}", report.variance);
    assert!((report.volatility - 1e-3).abs() < TOL);
    assert_eq!(report.name_count, 1);
    assert_eq!(report.long_count, 1);
    assert_eq!(report.short_count, 0);
    assert!((report.total_long - 0.1).abs() < TOL);
    assert_eq!(report.total_short, 0.0);

    // sqrt(252) * 1e-4 / 1e-3
    let sharpe = report.sharpe().unwrap();
    assert!((sharpe - 252.0_f64.sqrt() * 0.1).abs() < 1e-9, "got {}", sharpe);
    assert!((report.annualized_return - 0.0252).abs() < TOL);
    assert!((report.annualized_volatility - (252e-6_f64).sqrt()).abs() < TOL);
}

#[test]
fn test_long_short_report() {
    let u = scenario_universe();
    // short A 0.05, long B 0.1
    let a = assignment(&[("A", 0.0, 0.05, 0.0, 1.0), ("B", 0.1, 0.0, 1.0, 0.0)]);
    let report = ResultAnalyzer::new(&u, AnalysisConfig::default())
        .analyze(&a)
        .unwrap();

    let expected_return = 0.001 * -0.05 + 0.002 * 0.1;
    let expected_variance = 0.0001 * 0.05 * 0.05 + 0.0002 * 0.1 * 0.1;
    assert!((report.net_return - expected_return).abs() < TOL);
    assert!((report.variance - expected_variance).abs() < TOL);
    assert_eq!(report.name_count, 2);
    assert_eq!(report.long_count, 1);
    assert_eq!(report.short_count, 1);
    assert!((report.total_short - 0.05).abs() < TOL);
    assert_eq!(report.allocation("A").map(|x| x.net()), Some(-0.05));
}

#[test]
fn test_analysis_is_idempotent() {
    let u = scenario_universe();
    let a = assignment(&[("A", 0.03, 0.0, 1.0, 0.0), ("B", 0.0, 0.07, 0.0, 1.0)]);
    let analyzer = ResultAnalyzer::new(&u, AnalysisConfig::default());
    let first = analyzer.analyze(&a).unwrap();
    let second = analyzer.analyze(&a).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_zero_portfolio_has_undefined_sharpe() {
    let u = scenario_universe();
    let a = assignment(&[("A", 0.0, 0.0, 0.0, 0.0), ("B", 0.0, 0.0, 0.0, 0.0)]);
    let report = ResultAnalyzer::new(&u, AnalysisConfig::default())
        .analyze(&a)
        .unwrap();

    assert_eq!(report.volatility, 0.0);
    assert_eq!(report.annualized_sharpe, None);
    assert_eq!(report.sharpe(), Err(PortfolioError::DegenerateRisk));
    assert_eq!(report.name_count, 0);
    assert!(!report.net_return.is_nan());
}

#[test]
fn test_indicator_noise_is_rounded() {
    let u = scenario_universe();
    let a = assignment(&[
        ("A", 0.1, 1e-10, 0.999_999_9, 2e-8),
        ("B", 0.0, 0.0, 1e-9, 0.0),
    ]);
    let report = ResultAnalyzer::new(&u, AnalysisConfig::default())
        .analyze(&a)
        .unwrap();
    assert_eq!(report.long_count, 1);
    assert_eq!(report.short_count, 0);
}

/// Log sink shared between a test and its subscriber.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn test_indicator_on_empty_position_is_counted_and_logged() {
    let u = scenario_universe();
    // B's short indicator is on with no short allocation.
    let a = assignment(&[("A", 0.1, 0.0, 1.0, 0.0), ("B", 0.0, 0.0, 0.0, 1.0)]);

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let report = tracing::subscriber::with_default(subscriber, || {
        ResultAnalyzer::new(&u, AnalysisConfig::default())
            .analyze(&a)
            .unwrap()
    });

    assert_eq!(report.name_count, 2);
    assert_eq!(report.short_count, 1);
    let text = logs.contents();
    assert!(text.contains("short indicator set on an empty position"), "logs: {}", text);
    assert!(text.contains("B"), "logs: {}", text);
    assert!(!text.contains("long indicator set"), "logs: {}", text);
}

#[test]
fn test_fractional_indicator_is_flagged() {
    let u = scenario_universe();
    let a = assignment(&[("A", 0.05, 0.0, 0.5, 0.0), ("B", 0.0, 0.0, 0.0, 0.0)]);
    let err = ResultAnalyzer::new(&u, AnalysisConfig::default())
        .analyze(&a)
        .unwrap_err();
    assert_eq!(
        err,
        PortfolioError::IndicatorPrecision {
            variable: "long_on[A]".into(),
            value: 0.5
        }
    );
}

#[test]
fn test_missing_variable() {
    let u = scenario_universe();
    let a = assignment(&[("A", 0.1, 0.0, 1.0, 0.0)]);
    let err = ResultAnalyzer::new(&u, AnalysisConfig::default())
        .analyze(&a)
        .unwrap_err();
    assert_eq!(err, PortfolioError::MissingVariable("long[B]".into()));
}

#[test]
fn test_non_optimal_refused() {
    let u = scenario_universe();
    for status in [
        SolverStatus::Infeasible,
        SolverStatus::Unbounded,
        SolverStatus::SolverError,
        SolverStatus::TimedOut,
    ] {
        let result = ResultAnalyzer::new(&u, AnalysisConfig::default())
            .analyze(&SolutionAssignment::unsolved(status));
        assert_eq!(result, Err(PortfolioError::NoSolution(status)));
    }
}

#[test]
fn test_custom_periods_per_year() {
    let u = scenario_universe();
    let a = assignment(&[("A", 0.1, 0.0, 1.0, 0.0), ("B", 0.0, 0.0, 0.0, 0.0)]);
    let config = AnalysisConfig {
        periods_per_year: 12.0,
        ..Default::default()
    };
    let report = ResultAnalyzer::new(&u, config).analyze(&a).unwrap();
    let sharpe = report.sharpe().unwrap();
    assert!((sharpe - 12.0_f64.sqrt() * 0.1).abs() < 1e-9);
}

#[test]
fn test_pipeline_solved() {
    let u = scenario_universe();
    let solver = CannedSolver(assignment(&[
        ("A", 0.1, 0.0, 1.0, 0.0),
        ("B", 0.0, 0.0, 0.0, 0.0),
    ]));
    let outcome = optimize(
        &u,
        scenario_config(),
        &solver,
        &SolveOptions::default(),
        AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.status(), SolverStatus::Optimal);
    let report = outcome.report().expect("expected a report");
    assert_eq!(report.name_count, 1);
}

#[test]
fn test_pipeline_unsolved_propagates_status() {
    let u = scenario_universe();
    let solver = CannedSolver(SolutionAssignment::unsolved(SolverStatus::Infeasible));
    let outcome = optimize(
        &u,
        scenario_config(),
        &solver,
        &SolveOptions::default(),
        AnalysisConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome, PortfolioOutcome::Unsolved(SolverStatus::Infeasible));
    assert!(outcome.report().is_none());
}

#[test]
fn test_pipeline_rejects_config_before_solving() {
    struct PanickingSolver;
    impl MiqpSolver for PanickingSolver {
        fn solve(&self, _: &MiqpInstance, _: &SolveOptions) -> SolutionAssignment {
            panic!("solver must not be called");
        }
    }

    let u = scenario_universe();
    let result = optimize(
        &u,
        scenario_config().with_risk_aversion(0.0),
        &PanickingSolver,
        &SolveOptions::default(),
        AnalysisConfig::default(),
    );
    assert!(matches!(result, Err(PortfolioError::InvalidConfig(_))));
}

#[test]
fn test_report_serializes() {
    let u = scenario_universe();
    let a = assignment(&[("A", 0.0, 0.0, 0.0, 0.0), ("B", 0.0, 0.0, 0.0, 0.0)]);
    let report = ResultAnalyzer::new(&u, AnalysisConfig::default())
        .analyze(&a)
        .unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"annualized_sharpe\":null"));
    let parsed: PortfolioReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);
}
