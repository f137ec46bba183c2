//! Loading asset data and covariance tables from tab-delimited text.
//!
//! Asset files have a header row and one row per asset:
//!
//! ```text
//! tickers  returns  ubounds  lbounds
//! AAPL     0.0011   0.10     0.05
//! ```
//!
//! Covariance files have a header row of tickers after an index column, and
//! one row per ticker:
//!
//! ```text
//!         AAPL     MSFT
//! AAPL    0.0004   0.0001
//! MSFT    0.0001   0.0003
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::debug;

use crate::error::{PortfolioError, Result};
use crate::universe::{Asset, AssetUniverse, CovarianceTable};

#[derive(Debug, Deserialize)]
struct AssetRecord {
    #[serde(rename = "tickers", alias = "ticker")]
    id: String,
    #[serde(rename = "returns")]
    expected_return: f64,
    #[serde(rename = "ubounds")]
    upper_bound: f64,
    #[serde(rename = "lbounds")]
    lower_bound: f64,
}

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(Trim::All)
        .from_reader(reader)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| PortfolioError::Data(format!("{}: {}", path.display(), e)))
}

/// Read asset rows from tab-delimited text.
pub fn read_assets<R: Read>(reader: R) -> Result<Vec<Asset>> {
    let mut rdr = tsv_reader(reader);
    let mut assets = Vec::new();
    for record in rdr.deserialize() {
        let r: AssetRecord = record?;
        assets.push(Asset::new(r.id, r.expected_return, r.upper_bound, r.lower_bound));
    }
    Ok(assets)
}

/// Read a covariance table from tab-delimited text.
///
/// Rows may appear in any order; they are arranged to follow the header.
pub fn read_covariance<R: Read>(reader: R) -> Result<CovarianceTable> {
    let mut rdr = tsv_reader(reader);
    let labels: Vec<String> = rdr.headers()?.iter().skip(1).map(str::to_string).collect();

    let mut rows: HashMap<String, Vec<f64>> = HashMap::with_capacity(labels.len());
    for record in rdr.records() {
        let record = record?;
        let label = record.get(0).unwrap_or_default().to_string();
        let values = record
            .iter()
            .skip(1)
            .map(|field| {
                field.parse::<f64>().map_err(|e| {
                    PortfolioError::Data(format!(
                        "Covariance row '{}' has invalid value '{}': {}",
                        label, field, e
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if rows.insert(label.clone(), values).is_some() {
            return Err(PortfolioError::Validation(format!(
                "Covariance row '{}' appears twice",
                label
            )));
        }
    }

    if rows.len() != labels.len() {
        return Err(PortfolioError::Validation(format!(
            "Covariance table has {} rows for {} columns",
            rows.len(),
            labels.len()
        )));
    }
    let ordered = labels
        .iter()
        .map(|label| {
            rows.remove(label).ok_or_else(|| {
                PortfolioError::Validation(format!("Covariance table has no row for '{}'", label))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    CovarianceTable::from_rows(labels, ordered)
}

/// Load asset rows from a file.
pub fn load_assets(path: impl AsRef<Path>) -> Result<Vec<Asset>> {
    read_assets(open(path.as_ref())?)
}

/// Load a covariance table from a file.
pub fn load_covariance(path: impl AsRef<Path>) -> Result<CovarianceTable> {
    read_covariance(open(path.as_ref())?)
}

/// Load and validate a universe from an asset file and a covariance file.
pub fn load_universe(
    assets_path: impl AsRef<Path>,
    covariance_path: impl AsRef<Path>,
) -> Result<AssetUniverse> {
    let assets = load_assets(assets_path.as_ref())?;
    let table = load_covariance(covariance_path.as_ref())?;
    debug!(
        assets = assets.len(),
        path = %assets_path.as_ref().display(),
        "loaded asset data"
    );
    AssetUniverse::new(assets, table)
}
