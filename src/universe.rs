//! Asset data and covariance, validated once and read-only afterwards.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PortfolioError, Result};

/// Absolute tolerance for cov[i, j] == cov[j, i].
pub const SYMMETRY_TOL: f64 = 1e-9;

/// Relative tolerance on the smallest covariance eigenvalue.
pub const PSD_TOL: f64 = 1e-9;

/// Static per-asset data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier (ticker).
    pub id: String,
    /// Expected return per period.
    pub expected_return: f64,
    /// Ceiling on long allocation.
    pub upper_bound: f64,
    /// Magnitude of the short exposure bound.
    pub lower_bound: f64,
}

impl Asset {
    /// Create an asset record.
    pub fn new(
        id: impl Into<String>,
        expected_return: f64,
        upper_bound: f64,
        lower_bound: f64,
    ) -> Self {
        Asset {
            id: id.into(),
            expected_return,
            upper_bound,
            lower_bound,
        }
    }
}

/// Raw covariance table keyed by asset identifiers.
///
/// Labels name both rows and columns, in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceTable {
    /// Row/column labels.
    pub labels: Vec<String>,
    /// Dense values, `values[(i, j)]` = cov(labels[i], labels[j]).
    pub values: DMatrix<f64>,
}

impl CovarianceTable {
    /// Create a table from labels and a dense matrix.
    pub fn new(labels: Vec<String>, values: DMatrix<f64>) -> Self {
        CovarianceTable { labels, values }
    }

    /// Create a table from labels and row vectors.
    ///
    /// Fails when the rows are ragged or their count differs from the labels.
    pub fn from_rows(labels: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = labels.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(PortfolioError::Validation(format!(
                "Covariance table must be {}x{} to match its labels",
                n, n
            )));
        }
        let values = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Ok(CovarianceTable { labels, values })
    }
}

/// A validated set of assets with their covariance.
///
/// Assets keep the order they were supplied in; the covariance matrix is
/// indexed in that same order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetUniverse {
    assets: Vec<Asset>,
    index: HashMap<String, usize>,
    covariance: DMatrix<f64>,
}

impl AssetUniverse {
    /// Validate asset data and covariance, producing an immutable universe.
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::Validation`] if:
    /// - the universe is empty, or an id is empty or duplicated
    /// - a return, bound or covariance entry is not finite, or a bound is negative
    /// - the covariance table is not square over exactly the asset set
    /// - the covariance table is not symmetric or not positive semi-definite
    pub fn new(assets: Vec<Asset>, table: CovarianceTable) -> Result<Self> {
        if assets.is_empty() {
            return Err(PortfolioError::Validation(
                "Universe must contain at least one asset".into(),
            ));
        }

        let mut index = HashMap::with_capacity(assets.len());
        for (i, asset) in assets.iter().enumerate() {
            validate_asset(asset)?;
            if index.insert(asset.id.clone(), i).is_some() {
                return Err(PortfolioError::Validation(format!(
                    "Duplicate asset '{}'",
                    asset.id
                )));
            }
        }

        let covariance = align_covariance(&assets, &index, &table)?;
        check_symmetric(&assets, &covariance)?;
        check_psd(&covariance)?;

        debug!(assets = assets.len(), "asset universe validated");

        Ok(AssetUniverse {
            assets,
            index,
            covariance,
        })
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Always false for a constructed universe.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets in caller-supplied order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Covariance matrix, indexed in asset order.
    pub fn covariance_matrix(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Position of an asset.
    pub fn position(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| PortfolioError::UnknownAsset(id.to_string()))
    }

    /// Look up an asset.
    pub fn asset(&self, id: &str) -> Result<&Asset> {
        Ok(&self.assets[self.position(id)?])
    }

    /// Expected return of an asset.
    pub fn expected_return(&self, id: &str) -> Result<f64> {
        Ok(self.asset(id)?.expected_return)
    }

    /// Long allocation ceiling of an asset.
    pub fn upper_bound(&self, id: &str) -> Result<f64> {
        Ok(self.asset(id)?.upper_bound)
    }

    /// Short exposure bound magnitude of an asset.
    pub fn lower_bound(&self, id: &str) -> Result<f64> {
        Ok(self.asset(id)?.lower_bound)
    }

    /// Covariance between two assets.
    pub fn covariance(&self, i: &str, j: &str) -> Result<f64> {
        Ok(self.covariance[(self.position(i)?, self.position(j)?)])
    }
}

fn validate_asset(asset: &Asset) -> Result<()> {
    if asset.id.is_empty() {
        return Err(PortfolioError::Validation("Asset id must not be empty".into()));
    }
    let fields = [
        ("expected return", asset.expected_return),
        ("upper bound", asset.upper_bound),
        ("lower bound", asset.lower_bound),
    ];
    for (what, value) in fields {
        if !value.is_finite() {
            return Err(PortfolioError::Validation(format!(
                "Asset '{}' has non-finite {}",
                asset.id, what
            )));
        }
    }
    if asset.upper_bound < 0.0 || asset.lower_bound < 0.0 {
        return Err(PortfolioError::Validation(format!(
            "Asset '{}' has a negative exposure bound",
            asset.id
        )));
    }
    Ok(())
}

/// Re-index the raw table into asset order.
fn align_covariance(
    assets: &[Asset],
    index: &HashMap<String, usize>,
    table: &CovarianceTable,
) -> Result<DMatrix<f64>> {
    let n = assets.len();
    let (rows, cols) = table.values.shape();
    if rows != cols || rows != table.labels.len() {
        return Err(PortfolioError::Validation(format!(
            "Covariance table is {}x{} with {} labels; expected a square table",
            rows,
            cols,
            table.labels.len()
        )));
    }
    if rows != n {
        return Err(PortfolioError::Validation(format!(
            "Covariance table covers {} assets but the universe has {}",
            rows, n
        )));
    }

    // perm[asset position] = table position
    let mut perm = vec![usize::MAX; n];
    for (t, label) in table.labels.iter().enumerate() {
        let pos = index.get(label).copied().ok_or_else(|| {
            PortfolioError::Validation(format!(
                "Covariance table has no matching asset for '{}'",
                label
            ))
        })?;
        if perm[pos] != usize::MAX {
            return Err(PortfolioError::Validation(format!(
                "Covariance table repeats '{}'",
                label
            )));
        }
        perm[pos] = t;
    }

    let aligned = DMatrix::from_fn(n, n, |i, j| table.values[(perm[i], perm[j])]);
    if let Some(v) = aligned.iter().find(|v| !v.is_finite()) {
        return Err(PortfolioError::Validation(format!(
            "Covariance table contains non-finite entry {}",
            v
        )));
    }
    Ok(aligned)
}

fn check_symmetric(assets: &[Asset], cov: &DMatrix<f64>) -> Result<()> {
    let n = cov.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (cov[(i, j)] - cov[(j, i)]).abs() > SYMMETRY_TOL {
                return Err(PortfolioError::Validation(format!(
                    "Covariance is not symmetric: cov[{}, {}] = {} but cov[{}, {}] = {}",
                    assets[i].id,
                    assets[j].id,
                    cov[(i, j)],
                    assets[j].id,
                    assets[i].id,
                    cov[(j, i)]
                )));
            }
        }
    }
    Ok(())
}

fn check_psd(cov: &DMatrix<f64>) -> Result<()> {
    let sym = (cov + cov.transpose()) * 0.5;
    let eigenvalues = sym.symmetric_eigenvalues();
    let scale = eigenvalues.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let min = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if min < -PSD_TOL * scale {
        return Err(PortfolioError::Validation(format!(
            "Covariance is not positive semi-definite (smallest eigenvalue {})",
            min
        )));
    }
    Ok(())
}
