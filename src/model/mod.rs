//! Long/short mean-variance model formulation.

mod builder;
mod config;

pub use builder::{
    cardinality_constraint, exclusivity_constraint, long_bound_constraint,
    mean_variance_objective, net_long_constraints, net_short_constraints,
    short_bound_constraint, AssetVariables, PortfolioModel, PortfolioModelBuilder, VariableNames,
};
pub use config::{ExposureBounds, ModelConfig, ShortBoundRule};
