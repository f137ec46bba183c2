//! Scalar decision variables with builder pattern.

use std::fmt;

/// Position of a variable in its owning [`VariableSet`].
///
/// Ids are handed out sequentially, so building the same model twice yields
/// the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    /// Get the column index of this variable.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Domain a variable is declared over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableDomain {
    /// Continuous, x >= 0.
    NonNegative,
    /// Integer, x in {0, 1}.
    Binary,
}

impl VariableDomain {
    /// Check if the domain requires integral values.
    pub fn is_integer(&self) -> bool {
        matches!(self, VariableDomain::Binary)
    }

    /// Check whether `value` lies in the domain within `tol`.
    pub fn contains(&self, value: f64, tol: f64) -> bool {
        match self {
            VariableDomain::NonNegative => value >= -tol,
            VariableDomain::Binary => value.abs() <= tol || (value - 1.0).abs() <= tol,
        }
    }
}

/// A declared decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Column index.
    pub id: VarId,
    /// Unique name, used as the key of solver assignments.
    pub name: String,
    /// Declared domain.
    pub domain: VariableDomain,
}

/// Builder for declaring variables.
#[derive(Debug, Clone)]
pub struct VariableBuilder {
    name: Option<String>,
    domain: VariableDomain,
}

impl Default for VariableBuilder {
    fn default() -> Self {
        Self {
            name: None,
            domain: VariableDomain::NonNegative,
        }
    }
}

impl VariableBuilder {
    /// Create a non-negative continuous variable builder.
    pub fn nonneg() -> Self {
        Self::default()
    }

    /// Create a binary variable builder.
    pub fn binary() -> Self {
        Self {
            domain: VariableDomain::Binary,
            ..Default::default()
        }
    }

    /// Set the name of the variable.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn build(self, id: VarId) -> Variable {
        Variable {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            domain: self.domain,
        }
    }
}

/// Ordered collection of declared variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    vars: Vec<Variable>,
}

impl VariableSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable and return its id.
    pub fn add(&mut self, builder: VariableBuilder) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(builder.build(id));
        id
    }

    /// Look up a variable by id.
    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.vars.get(id.0)
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if no variables are declared.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.iter()
    }

    /// Consume the set, returning the variables in declaration order.
    pub fn into_vec(self) -> Vec<Variable> {
        self.vars
    }
}
