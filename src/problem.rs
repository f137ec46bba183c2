//! MIQP instance definition.
//!
//! A `MiqpInstance` holds:
//! - An objective (minimize or maximize a quadratic expression)
//! - An ordered list of labelled linear constraints
//! - The variable table with each variable's domain
//!
//! Use the builder pattern to construct instances:
//! ```ignore
//! let instance = MiqpInstance::maximize(objective)
//!     .variables(vars)
//!     .subject_to([constraint1, constraint2])
//!     .build()?;
//! ```

use std::collections::HashSet;

use crate::constraints::Constraint;
use crate::error::{PortfolioError, Result};
use crate::expr::{QuadExpr, VarId, Variable, VariableSet};

/// Objective type for optimization problems.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Minimize the expression.
    Minimize(QuadExpr),
    /// Maximize the expression.
    Maximize(QuadExpr),
}

impl Objective {
    /// Get the expression being optimized.
    pub fn expr(&self) -> &QuadExpr {
        match self {
            Objective::Minimize(e) | Objective::Maximize(e) => e,
        }
    }

    /// Check if this is a minimization.
    pub fn is_minimize(&self) -> bool {
        matches!(self, Objective::Minimize(_))
    }
}

/// A mixed-integer quadratic program.
#[derive(Debug, Clone, PartialEq)]
pub struct MiqpInstance {
    objective: Objective,
    constraints: Vec<Constraint>,
    variables: Vec<Variable>,
}

impl MiqpInstance {
    /// Start building a minimization instance.
    pub fn minimize(expr: QuadExpr) -> InstanceBuilder {
        InstanceBuilder::new(Objective::Minimize(expr))
    }

    /// Start building a maximization instance.
    pub fn maximize(expr: QuadExpr) -> InstanceBuilder {
        InstanceBuilder::new(Objective::Maximize(expr))
    }

    /// The objective.
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Constraints in declaration order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Variables in column order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Number of variable columns.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Look up a variable by id.
    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    /// Look up a variable by name.
    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Ids of all variables with an integral domain.
    pub fn integer_variables(&self) -> Vec<VarId> {
        self.variables
            .iter()
            .filter(|v| v.domain.is_integer())
            .map(|v| v.id)
            .collect()
    }

    /// Evaluate the objective at a point given as one value per column.
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective.expr().evaluate(values)
    }

    /// Check domains and constraints at `values` within `tol`.
    pub fn is_feasible(&self, values: &[f64], tol: f64) -> bool {
        values.len() == self.variables.len()
            && self
                .variables
                .iter()
                .zip(values)
                .all(|(v, x)| v.domain.contains(*x, tol))
            && self.constraints.iter().all(|c| c.is_satisfied(values, tol))
    }
}

/// Builder for constructing instances.
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    objective: Objective,
    constraints: Vec<Constraint>,
    variables: VariableSet,
}

impl InstanceBuilder {
    fn new(objective: Objective) -> Self {
        InstanceBuilder {
            objective,
            constraints: Vec::new(),
            variables: VariableSet::new(),
        }
    }

    /// Set the variable table.
    pub fn variables(mut self, variables: VariableSet) -> Self {
        self.variables = variables;
        self
    }

    /// Add constraints to the instance.
    pub fn subject_to(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Add a single constraint.
    pub fn constraint(mut self, c: Constraint) -> Self {
        self.constraints.push(c);
        self
    }

    /// Build the instance.
    ///
    /// Fails if a variable name is repeated or an expression refers to an
    /// undeclared variable.
    pub fn build(self) -> Result<MiqpInstance> {
        let n = self.variables.len();

        let mut names = HashSet::with_capacity(n);
        for v in self.variables.iter() {
            if !names.insert(v.name.as_str()) {
                return Err(PortfolioError::Validation(format!(
                    "Duplicate variable name '{}'",
                    v.name
                )));
            }
        }

        let undeclared = |ids: Vec<VarId>| ids.into_iter().find(|id| id.index() >= n);
        if let Some(id) = undeclared(self.objective.expr().variables()) {
            return Err(PortfolioError::Validation(format!(
                "Objective refers to undeclared variable {}",
                id
            )));
        }
        for c in &self.constraints {
            if let Some(id) = undeclared(c.variables()) {
                return Err(PortfolioError::Validation(format!(
                    "Constraint '{}' refers to undeclared variable {}",
                    c.label, id
                )));
            }
        }

        Ok(MiqpInstance {
            objective: self.objective,
            constraints: self.constraints,
            variables: self.variables.into_vec(),
        })
    }
}
