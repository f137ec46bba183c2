//! Derivation of portfolio statistics from a solver assignment.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PortfolioError, Result};
use crate::model::VariableNames;
use crate::report::{AssetAllocation, PortfolioReport};
use crate::solver::SolutionAssignment;
use crate::universe::AssetUniverse;

/// Allocations at or below this size count as empty.
const IDLE_ALLOCATION: f64 = 1e-8;

/// Parameters of the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of return periods per year, e.g. 252 for daily data.
    pub periods_per_year: f64,
    /// Maximum distance of an indicator value from 0 or 1.
    pub indicator_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            periods_per_year: 252.0,
            indicator_tolerance: 1e-4,
        }
    }
}

impl AnalysisConfig {
    /// Check the parameters are in range.
    pub fn validate(&self) -> Result<()> {
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(PortfolioError::InvalidConfig(format!(
                "Periods per year must be positive, got {}",
                self.periods_per_year
            )));
        }
        if !(0.0..0.5).contains(&self.indicator_tolerance) {
            return Err(PortfolioError::InvalidConfig(format!(
                "Indicator tolerance must lie in [0, 0.5), got {}",
                self.indicator_tolerance
            )));
        }
        Ok(())
    }
}

/// Computes a [`PortfolioReport`] from an optimal assignment.
#[derive(Debug, Clone)]
pub struct ResultAnalyzer<'a> {
    universe: &'a AssetUniverse,
    config: AnalysisConfig,
}

impl<'a> ResultAnalyzer<'a> {
    /// Create an analyzer over a universe.
    pub fn new(universe: &'a AssetUniverse, config: AnalysisConfig) -> Self {
        ResultAnalyzer { universe, config }
    }

    /// Derive return, risk and concentration figures.
    ///
    /// Variables are looked up by the names in [`VariableNames`].
    ///
    /// # Errors
    ///
    /// - [`PortfolioError::NoSolution`] if the assignment is not optimal
    /// - [`PortfolioError::MissingVariable`] if a variable has no value
    /// - [`PortfolioError::IndicatorPrecision`] if an indicator is not near 0 or 1
    /// - [`PortfolioError::InvalidConfig`] if the analysis config is out of range
    pub fn analyze(&self, assignment: &SolutionAssignment) -> Result<PortfolioReport> {
        self.config.validate()?;
        if !assignment.status.is_optimal() {
            return Err(PortfolioError::NoSolution(assignment.status));
        }

        let tol = self.config.indicator_tolerance;
        let n = self.universe.len();
        let mut allocations = Vec::with_capacity(n);
        let mut long_count = 0;
        let mut short_count = 0;

        for asset in self.universe.assets() {
            let names = VariableNames::for_asset(&asset.id);
            let long = assignment.try_value(&names.long)?;
            let short = assignment.try_value(&names.short)?;
            if round_indicator(&names.long_on, assignment.try_value(&names.long_on)?, tol)? {
                long_count += 1;
                if long.abs() <= IDLE_ALLOCATION {
                    warn!(asset = %asset.id, long, "long indicator set on an empty position");
                }
            }
            if round_indicator(&names.short_on, assignment.try_value(&names.short_on)?, tol)? {
                short_count += 1;
                if short.abs() <= IDLE_ALLOCATION {
                    warn!(asset = %asset.id, short, "short indicator set on an empty position");
                }
            }
            allocations.push(AssetAllocation {
                asset: asset.id.clone(),
                long,
                short,
            });
        }

        let returns =
            DVector::from_iterator(n, self.universe.assets().iter().map(|a| a.expected_return));
        let nets = DVector::from_iterator(n, allocations.iter().map(AssetAllocation::net));

        let net_return = returns.dot(&nets);
        // PSD covariance gives a non-negative quadratic form up to round-off.
        let variance = nets.dot(&(self.universe.covariance_matrix() * &nets)).max(0.0);
        let volatility = variance.sqrt();

        let ppy = self.config.periods_per_year;
        let annualized_sharpe = if volatility == 0.0 {
            None
        } else {
            Some(ppy.sqrt() * net_return / volatility)
        };

        let total_long = allocations.iter().map(|a| a.long).sum();
        let total_short = allocations.iter().map(|a| a.short).sum();

        debug!(
            net_return,
            volatility,
            long_count,
            short_count,
            "portfolio analyzed"
        );

        Ok(PortfolioReport {
            net_return,
            variance,
            volatility,
            annualized_return: ppy * net_return,
            annualized_volatility: (variance * ppy).sqrt(),
            annualized_sharpe,
            name_count: long_count + short_count,
            long_count,
            short_count,
            total_long,
            total_short,
            allocations,
        })
    }
}

/// Round a solver indicator to a boolean, rejecting values near neither 0 nor 1.
pub fn round_indicator(name: &str, value: f64, tol: f64) -> Result<bool> {
    if value.abs() <= tol {
        Ok(false)
    } else if (value - 1.0).abs() <= tol {
        Ok(true)
    } else {
        Err(PortfolioError::IndicatorPrecision {
            variable: name.to_string(),
            value,
        })
    }
}
