//! Constraint types for MIQP instances.

mod constraint;

pub use constraint::{Cone, Constraint, ConstraintExt};
