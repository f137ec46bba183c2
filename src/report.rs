//! Portfolio statistics derived from a solved model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Allocation to a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    /// Asset identifier.
    pub asset: String,
    /// Long allocation ℓ_i.
    pub long: f64,
    /// Short allocation magnitude s_i.
    pub short: f64,
}

impl AssetAllocation {
    /// Net position ℓ_i - s_i.
    pub fn net(&self) -> f64 {
        self.long - self.short
    }
}

/// Risk/return summary of an optimal portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    /// Expected return of net positions per period.
    pub net_return: f64,
    /// Variance of net positions per period.
    pub variance: f64,
    /// Square root of the variance.
    pub volatility: f64,
    /// `periods_per_year * net_return`.
    pub annualized_return: f64,
    /// `sqrt(periods_per_year * variance)`.
    pub annualized_volatility: f64,
    /// Annualized Sharpe ratio; `None` when volatility is zero.
    pub annualized_sharpe: Option<f64>,
    /// Number of assets with any position.
    pub name_count: usize,
    /// Number of long positions.
    pub long_count: usize,
    /// Number of short positions.
    pub short_count: usize,
    /// Sum of long allocations.
    pub total_long: f64,
    /// Sum of short allocation magnitudes.
    pub total_short: f64,
    /// Per-asset allocations in universe order.
    pub allocations: Vec<AssetAllocation>,
}

impl PortfolioReport {
    /// The annualized Sharpe ratio.
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::DegenerateRisk`] when volatility is zero.
    pub fn sharpe(&self) -> Result<f64> {
        self.annualized_sharpe.ok_or(PortfolioError::DegenerateRisk)
    }

    /// Allocation of one asset, if it is part of the report.
    pub fn allocation(&self, asset: &str) -> Option<&AssetAllocation> {
        self.allocations.iter().find(|a| a.asset == asset)
    }
}

impl fmt::Display for PortfolioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "aggregate expected return: period: {:.4}, ann: {:.3}",
            self.net_return, self.annualized_return
        )?;
        writeln!(
            f,
            "aggregate vol return: period: {:.4}, ann: {:.3}",
            self.volatility, self.annualized_volatility
        )?;
        match self.annualized_sharpe {
            Some(sharpe) => writeln!(f, "annualized sharpe: {:.4}", sharpe)?,
            None => writeln!(f, "annualized sharpe: undefined (zero volatility)")?,
        }
        writeln!(f, "total number of names: {}", self.name_count)?;
        writeln!(f, "total number of longs: {}", self.long_count)?;
        writeln!(f, "total allocation to longs: {:.2}", self.total_long)?;
        writeln!(f, "total number of shorts: {}", self.short_count)?;
        writeln!(f, "total allocation to shorts: {:.2}", self.total_short)?;
        writeln!(f, "allocations:")?;
        writeln!(f, "{:<8} {:>7} {:>7}", "ticker", "long", "short")?;
        for a in &self.allocations {
            writeln!(f, "{:<8} {:>7.3} {:>7.3}", a.asset, a.long, a.short)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(sharpe: Option<f64>) -> PortfolioReport {
        PortfolioReport {
            net_return: 0.0002,
            variance: 2e-6,
            volatility: 2e-6_f64.sqrt(),
            annualized_return: 0.0504,
            annualized_volatility: (2e-6_f64 * 252.0).sqrt(),
            annualized_sharpe: sharpe,
            name_count: 1,
            long_count: 1,
            short_count: 0,
            total_long: 0.1,
            total_short: 0.0,
            allocations: vec![
                AssetAllocation {
                    asset: "A".into(),
                    long: 0.0,
                    short: 0.0,
                },
                AssetAllocation {
                    asset: "B".into(),
                    long: 0.1,
                    short: 0.0,
                },
            ],
        }
    }

    #[test]
    fn test_sharpe_accessor() {
        assert_eq!(report(Some(2.2)).sharpe(), Ok(2.2));
        assert_eq!(report(None).sharpe(), Err(PortfolioError::DegenerateRisk));
    }

    #[test]
    fn test_display() {
        let text = report(None).to_string();
        assert!(text.contains("annualized sharpe: undefined"));
        assert!(text.contains("total number of names: 1"));
        assert!(text.contains("B          0.100   0.000"));
    }

    #[test]
    fn test_allocation_lookup() {
        let r = report(Some(1.0));
        assert_eq!(r.allocation("B").map(AssetAllocation::net), Some(0.1));
        assert!(r.allocation("Z").is_none());
    }
}
