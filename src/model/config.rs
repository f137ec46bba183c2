//! Model configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Inclusive range `[lower, upper]` on an aggregate exposure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureBounds {
    /// Minimum aggregate allocation.
    pub lower: f64,
    /// Maximum aggregate allocation.
    pub upper: f64,
}

impl ExposureBounds {
    /// Create a bound pair.
    pub fn new(lower: f64, upper: f64) -> Self {
        ExposureBounds { lower, upper }
    }

    fn validate(&self, what: &str) -> Result<()> {
        if !self.lower.is_finite() || !self.upper.is_finite() {
            return Err(PortfolioError::InvalidConfig(format!(
                "{} bounds must be finite",
                what
            )));
        }
        if self.lower < 0.0 {
            return Err(PortfolioError::InvalidConfig(format!(
                "{} lower bound {} is negative",
                what, self.lower
            )));
        }
        if self.lower > self.upper {
            return Err(PortfolioError::InvalidConfig(format!(
                "{} lower bound {} exceeds upper bound {}",
                what, self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// Inequality used for the per-asset short exposure constraint.
///
/// Written literally as `-s >= d_s * lb`, the bound pins every short
/// allocation to zero. `Ceiling` reads it as a cap on the short magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortBoundRule {
    /// s <= d_s * lb
    #[default]
    Ceiling,
    /// -s >= d_s * lb
    AsFormulated,
}

/// Parameters of the long/short mean-variance model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Weight on portfolio variance; larger values favour lower risk.
    pub risk_aversion: f64,
    /// Maximum number of assets holding any position.
    pub cardinality: usize,
    /// Bounds on the sum of long allocations.
    pub net_long: ExposureBounds,
    /// Bounds on the sum of short allocation magnitudes.
    pub net_short: ExposureBounds,
    /// Form of the per-asset short constraint.
    pub short_bound_rule: ShortBoundRule,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            risk_aversion: 0.5,
            cardinality: 15,
            net_long: ExposureBounds::new(0.5, 1.0),
            net_short: ExposureBounds::new(0.5, 1.0),
            short_bound_rule: ShortBoundRule::Ceiling,
        }
    }
}

impl ModelConfig {
    /// Set the risk aversion.
    pub fn with_risk_aversion(mut self, rho: f64) -> Self {
        self.risk_aversion = rho;
        self
    }

    /// Set the cardinality limit.
    pub fn with_cardinality(mut self, k: usize) -> Self {
        self.cardinality = k;
        self
    }

    /// Set the aggregate long bounds.
    pub fn with_net_long(mut self, lower: f64, upper: f64) -> Self {
        self.net_long = ExposureBounds::new(lower, upper);
        self
    }

    /// Set the aggregate short bounds.
    pub fn with_net_short(mut self, lower: f64, upper: f64) -> Self {
        self.net_short = ExposureBounds::new(lower, upper);
        self
    }

    /// Set the short-bound rule.
    pub fn with_short_bound_rule(mut self, rule: ShortBoundRule) -> Self {
        self.short_bound_rule = rule;
        self
    }

    /// Check every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_aversion.is_finite() || self.risk_aversion <= 0.0 {
            return Err(PortfolioError::InvalidConfig(format!(
                "Risk aversion must be positive, got {}",
                self.risk_aversion
            )));
        }
        self.net_long.validate("Net long")?;
        self.net_short.validate("Net short")?;
        Ok(())
    }
}
