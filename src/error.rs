//! Error types for mvportfolio.

use thiserror::Error;

use crate::solver::SolverStatus;

/// Error type for mvportfolio operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
    /// Asset data or covariance table is malformed or inconsistent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lookup of an identifier that is not part of the universe.
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Model configuration is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The solver did not return a usable solution.
    #[error("No solution available: solver status {0}")]
    NoSolution(SolverStatus),

    /// A variable expected by the analyzer is absent from the assignment.
    #[error("Variable missing from solution: {0}")]
    MissingVariable(String),

    /// A binary indicator came back too far from 0 or 1 to be rounded.
    #[error("Indicator {variable} has non-binary value {value}")]
    IndicatorPrecision {
        /// Variable name.
        variable: String,
        /// Value returned by the solver.
        value: f64,
    },

    /// Sharpe ratio requested for a portfolio with zero volatility.
    #[error("Sharpe ratio is undefined for zero volatility")]
    DegenerateRisk,

    /// Input file could not be read or parsed.
    #[error("Data error: {0}")]
    Data(String),

    /// Solver adapter failure outside the status taxonomy.
    #[error("Solver error: {0}")]
    Solver(String),
}

impl From<csv::Error> for PortfolioError {
    fn from(err: csv::Error) -> Self {
        PortfolioError::Data(err.to_string())
    }
}

impl From<std::io::Error> for PortfolioError {
    fn from(err: std::io::Error) -> Self {
        PortfolioError::Data(err.to_string())
    }
}

/// Result type for mvportfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
