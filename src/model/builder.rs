//! Translation of an asset universe and configuration into a MIQP instance.
//!
//! For each asset `i` the model declares
//! - `long[i]` ℓ_i >= 0 and `short[i]` s_i >= 0 (short magnitude)
//! - `long_on[i]` d_i^l and `short_on[i]` d_i^s in {0, 1}
//!
//! and maximizes
//!
//! ```text
//! sum_i r_i (ℓ_i - s_i) - ρ sum_i sum_j Cov(i, j) (ℓ_i - s_i)(ℓ_j - s_j)
//! ```
//!
//! subject to, per asset, `long_bound`, `short_bound`, `exclusive`, then
//! `cardinality` and the four aggregate exposure rows.

use tracing::debug;

use super::config::{ExposureBounds, ModelConfig, ShortBoundRule};
use crate::constraints::{Constraint, ConstraintExt};
use crate::error::Result;
use crate::expr::{LinExpr, QuadExpr, VarId, VariableBuilder, VariableSet};
use crate::problem::MiqpInstance;
use crate::universe::{Asset, AssetUniverse};

/// Names of the four variables belonging to an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableNames {
    /// Long allocation.
    pub long: String,
    /// Short allocation magnitude.
    pub short: String,
    /// Long indicator.
    pub long_on: String,
    /// Short indicator.
    pub short_on: String,
}

impl VariableNames {
    /// Names used for `asset` in every instance built by this crate.
    pub fn for_asset(asset: &str) -> Self {
        VariableNames {
            long: format!("long[{}]", asset),
            short: format!("short[{}]", asset),
            long_on: format!("long_on[{}]", asset),
            short_on: format!("short_on[{}]", asset),
        }
    }
}

/// Variable handles of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetVariables {
    /// ℓ_i
    pub long: VarId,
    /// s_i
    pub short: VarId,
    /// d_i^l
    pub long_on: VarId,
    /// d_i^s
    pub short_on: VarId,
}

impl AssetVariables {
    fn declare(vars: &mut VariableSet, asset: &str) -> Self {
        let names = VariableNames::for_asset(asset);
        AssetVariables {
            long: vars.add(VariableBuilder::nonneg().name(names.long)),
            short: vars.add(VariableBuilder::nonneg().name(names.short)),
            long_on: vars.add(VariableBuilder::binary().name(names.long_on)),
            short_on: vars.add(VariableBuilder::binary().name(names.short_on)),
        }
    }

    /// Net position ℓ_i - s_i.
    pub fn net_position(&self) -> LinExpr {
        &LinExpr::variable(self.long) - &LinExpr::variable(self.short)
    }
}

/// A built model: the instance plus per-asset variable handles.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioModel {
    /// The MIQP to hand to a solver.
    pub instance: MiqpInstance,
    /// Asset ids paired with their variables, in universe order.
    pub assets: Vec<(String, AssetVariables)>,
}

/// Builds the long/short mean-variance MIQP.
#[derive(Debug, Clone)]
pub struct PortfolioModelBuilder<'a> {
    universe: &'a AssetUniverse,
    config: ModelConfig,
}

impl<'a> PortfolioModelBuilder<'a> {
    /// Create a builder over a universe.
    pub fn new(universe: &'a AssetUniverse, config: ModelConfig) -> Self {
        PortfolioModelBuilder { universe, config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Build the instance.
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::InvalidConfig`](crate::PortfolioError::InvalidConfig)
    /// before declaring anything if the configuration is out of range.
    pub fn build(&self) -> Result<PortfolioModel> {
        self.config.validate()?;

        let mut vars = VariableSet::new();
        let handles: Vec<AssetVariables> = self
            .universe
            .assets()
            .iter()
            .map(|a| AssetVariables::declare(&mut vars, &a.id))
            .collect();

        let objective = mean_variance_objective(self.universe, &handles, self.config.risk_aversion);

        let mut constraints = Vec::with_capacity(3 * handles.len() + 5);
        for (asset, v) in self.universe.assets().iter().zip(&handles) {
            constraints.push(long_bound_constraint(asset, v));
            constraints.push(short_bound_constraint(
                asset,
                v,
                self.config.short_bound_rule,
            ));
            constraints.push(exclusivity_constraint(asset, v));
        }
        constraints.push(cardinality_constraint(&handles, self.config.cardinality));
        constraints.extend(net_long_constraints(&handles, self.config.net_long));
        constraints.extend(net_short_constraints(&handles, self.config.net_short));

        let instance = MiqpInstance::maximize(objective)
            .variables(vars)
            .subject_to(constraints)
            .build()?;

        debug!(
            assets = handles.len(),
            variables = instance.num_variables(),
            constraints = instance.constraints().len(),
            risk_aversion = self.config.risk_aversion,
            cardinality = self.config.cardinality,
            "portfolio model built"
        );

        let assets = self
            .universe
            .assets()
            .iter()
            .map(|a| a.id.clone())
            .zip(handles)
            .collect();

        Ok(PortfolioModel { instance, assets })
    }
}

/// Net expected return minus ρ times the variance of net positions.
pub fn mean_variance_objective(
    universe: &AssetUniverse,
    handles: &[AssetVariables],
    risk_aversion: f64,
) -> QuadExpr {
    let cov = universe.covariance_matrix();
    let nets: Vec<LinExpr> = handles.iter().map(AssetVariables::net_position).collect();

    let expected = universe
        .assets()
        .iter()
        .zip(&nets)
        .fold(LinExpr::zero(), |acc, (asset, net)| {
            acc.add(&(net * asset.expected_return))
        });

    let mut variance = QuadExpr::default();
    for (i, net_i) in nets.iter().enumerate() {
        for (j, net_j) in nets.iter().enumerate() {
            let c = cov[(i, j)];
            if c != 0.0 {
                variance = variance.add(&QuadExpr::product(net_i, net_j).scale(c));
            }
        }
    }

    QuadExpr::from_linear(expected).add(&variance.scale(-risk_aversion))
}

/// ℓ_i <= d_i^l * ub_i
pub fn long_bound_constraint(asset: &Asset, v: &AssetVariables) -> Constraint {
    Constraint::leq(v.long, LinExpr::term(v.long_on, asset.upper_bound))
        .named(format!("long_bound[{}]", asset.id))
}

/// Per-asset short exposure constraint, in the form selected by `rule`.
pub fn short_bound_constraint(
    asset: &Asset,
    v: &AssetVariables,
    rule: ShortBoundRule,
) -> Constraint {
    let gated_bound = LinExpr::term(v.short_on, asset.lower_bound);
    let c = match rule {
        ShortBoundRule::Ceiling => Constraint::leq(v.short, gated_bound),
        ShortBoundRule::AsFormulated => Constraint::geq(LinExpr::term(v.short, -1.0), gated_bound),
    };
    c.named(format!("short_bound[{}]", asset.id))
}

/// d_i^l + d_i^s <= 1
pub fn exclusivity_constraint(asset: &Asset, v: &AssetVariables) -> Constraint {
    LinExpr::sum_of([v.long_on, v.short_on])
        .leq(1.0)
        .named(format!("exclusive[{}]", asset.id))
}

/// sum_i (d_i^l + d_i^s) <= K
pub fn cardinality_constraint(handles: &[AssetVariables], k: usize) -> Constraint {
    LinExpr::sum_of(handles.iter().flat_map(|v| [v.long_on, v.short_on]))
        .leq(k as f64)
        .named("cardinality")
}

/// L_lo <= sum_i ℓ_i and sum_i ℓ_i <= L_hi
pub fn net_long_constraints(
    handles: &[AssetVariables],
    bounds: ExposureBounds,
) -> [Constraint; 2] {
    let total = LinExpr::sum_of(handles.iter().map(|v| v.long));
    [
        total.geq(bounds.lower).named("net_long_lower"),
        total.leq(bounds.upper).named("net_long_upper"),
    ]
}

/// S_lo <= sum_i s_i and sum_i s_i <= S_hi
pub fn net_short_constraints(
    handles: &[AssetVariables],
    bounds: ExposureBounds,
) -> [Constraint; 2] {
    let total = LinExpr::sum_of(handles.iter().map(|v| v.short));
    [
        total.geq(bounds.lower).named("net_short_lower"),
        total.leq(bounds.upper).named("net_short_upper"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::CovarianceTable;
    use crate::PortfolioError;

    fn universe() -> AssetUniverse {
        AssetUniverse::new(
            vec![
                Asset::new("A", 0.001, 0.1, 0.1),
                Asset::new("B", 0.002, 0.1, 0.1),
            ],
            CovarianceTable::from_rows(
                vec!["A".into(), "B".into()],
                vec![vec![0.0001, 0.00002], vec![0.00002, 0.0002]],
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn handles() -> AssetVariables {
        let mut vars = VariableSet::new();
        AssetVariables::declare(&mut vars, "A")
    }

    #[test]
    fn test_variable_layout() {
        let model = PortfolioModelBuilder::new(&universe(), ModelConfig::default())
            .build()
            .unwrap();
        let names: Vec<&str> = model
            .instance
            .variables()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "long[A]", "short[A]", "long_on[A]", "short_on[A]",
                "long[B]", "short[B]", "long_on[B]", "short_on[B]",
            ]
        );
        assert_eq!(model.assets[1].0, "B");
        assert_eq!(model.assets[1].1.long.index(), 4);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = ModelConfig::default().with_risk_aversion(0.0);
        let result = PortfolioModelBuilder::new(&universe(), config).build();
        assert!(matches!(result, Err(PortfolioError::InvalidConfig(_))));
    }

    #[test]
    fn test_objective_matches_closed_form() {
        let u = universe();
        let model = PortfolioModelBuilder::new(&u, ModelConfig::default().with_risk_aversion(0.5))
            .build()
            .unwrap();
        // long A 0.1, short B 0.05
        let mut x = vec![0.0; 8];
        x[0] = 0.1;
        x[2] = 1.0;
        x[5] = 0.05;
        x[7] = 1.0;
        let (na, nb) = (0.1, -0.05);
        let ret = 0.001 * na + 0.002 * nb;
        let var = 0.0001 * na * na + 2.0 * 0.00002 * na * nb + 0.0002 * nb * nb;
        let expected = ret - 0.5 * var;
        let got = model.instance.evaluate_objective(&x);
        assert!((got - expected).abs() < 1e-15, "expected {}, got {}", expected, got);
    }

    #[test]
    fn test_long_bound() {
        let asset = Asset::new("A", 0.0, 0.1, 0.2);
        let v = handles();
        let c = long_bound_constraint(&asset, &v);
        assert_eq!(c.label, "long_bound[A]");
        // ℓ, s, d_l, d_s
        assert!(c.is_satisfied(&[0.1, 0.0, 1.0, 0.0], 1e-12));
        assert!(!c.is_satisfied(&[0.1, 0.0, 0.0, 0.0], 1e-12));
        assert!(!c.is_satisfied(&[0.2, 0.0, 1.0, 0.0], 1e-12));
    }

    #[test]
    fn test_short_bound_ceiling() {
        let asset = Asset::new("A", 0.0, 0.1, 0.2);
        let v = handles();
        let c = short_bound_constraint(&asset, &v, ShortBoundRule::Ceiling);
        assert_eq!(c.label, "short_bound[A]");
        assert!(c.is_satisfied(&[0.0, 0.2, 0.0, 1.0], 1e-12));
        assert!(c.is_satisfied(&[0.0, 0.0, 0.0, 0.0], 1e-12));
        assert!(!c.is_satisfied(&[0.0, 0.3, 0.0, 1.0], 1e-12));
        assert!(!c.is_satisfied(&[0.0, 0.1, 0.0, 0.0], 1e-12));
    }

    #[test]
    fn test_short_bound_as_formulated() {
        let asset = Asset::new("A", 0.0, 0.1, 0.2);
        let v = handles();
        let c = short_bound_constraint(&asset, &v, ShortBoundRule::AsFormulated);
        // -s >= d_s * 0.2 only holds with s = 0 and d_s = 0
        assert!(c.is_satisfied(&[0.0, 0.0, 0.0, 0.0], 1e-12));
        assert!(!c.is_satisfied(&[0.0, 0.0, 0.0, 1.0], 1e-12));
        assert!(!c.is_satisfied(&[0.0, 0.1, 0.0, 0.0], 1e-12));
    }

    #[test]
    fn test_exclusivity() {
        let asset = Asset::new("A", 0.0, 0.1, 0.2);
        let v = handles();
        let c = exclusivity_constraint(&asset, &v);
        assert!(c.is_satisfied(&[0.0, 0.0, 1.0, 0.0], 1e-12));
        assert!(!c.is_satisfied(&[0.0, 0.0, 1.0, 1.0], 1e-12));
    }

    #[test]
    fn test_aggregate_rows() {
        let v = handles();
        let [lo, hi] = net_long_constraints(&[v], ExposureBounds::new(0.5, 1.0));
        assert_eq!((lo.label.as_str(), hi.label.as_str()), ("net_long_lower", "net_long_upper"));
        assert!(!lo.is_satisfied(&[0.4, 0.0, 1.0, 0.0], 1e-12));
        assert!(hi.is_satisfied(&[0.4, 0.0, 1.0, 0.0], 1e-12));

        let [lo, hi] = net_short_constraints(&[v], ExposureBounds::new(0.0, 0.3));
        assert!(lo.is_satisfied(&[0.0, 0.0, 0.0, 0.0], 1e-12));
        assert!(!hi.is_satisfied(&[0.0, 0.4, 0.0, 1.0], 1e-12));
    }
}
