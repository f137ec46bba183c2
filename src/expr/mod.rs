//! Expression types for building MIQP instances.
//!
//! Decision variables are scalars identified by their column index. Affine
//! and quadratic expressions are sparse maps from variables to coefficients.

mod linear;
mod quadratic;
mod variable;

pub use linear::LinExpr;
pub use quadratic::QuadExpr;
pub use variable::{VarId, Variable, VariableBuilder, VariableDomain, VariableSet};
