//! Price-index tables and inflation adjustment.
//!
//! Costs quoted in one year are moved to another with the ratio of index
//! values, `cost * index[target] / index[source]`. Tables are keyed by year
//! and read from CSV with a `year` column plus one column per index.

use crate::error::{H2iError, H2iResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Year → index value table (CEPCI, CPI, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceIndex {
    name: String,
    values: BTreeMap<i32, f64>,
}

impl PriceIndex {
    /// Build an index; every value must be positive and finite.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = (i32, f64)>) -> H2iResult<Self> {
        let name = name.into();
        let values: BTreeMap<i32, f64> = values.into_iter().collect();
        if values.is_empty() {
            return Err(H2iError::config(format!("price index '{name}' has no entries")));
        }
        if let Some((year, value)) = values.iter().find(|(_, v)| !(v.is_finite() && **v > 0.0)) {
            return Err(H2iError::domain(format!(
                "price index '{name}' has non-positive value {value} for {year}"
            )));
        }
        Ok(Self { name, values })
    }

    /// Read the `column` index from a CSV with a `year` header.
    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R, column: &str) -> H2iResult<Self> {
        let name = name.into();
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = csv.headers()?.clone();
        let year_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("year"))
            .ok_or_else(|| H2iError::config(format!("price index '{name}': no 'year' column")))?;
        let value_idx = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| H2iError::config(format!("price index '{name}': no '{column}' column")))?;

        let mut values = Vec::new();
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or_default();
            // blank cells are years the index was not published
            if field(value_idx).is_empty() {
                continue;
            }
            let year: i32 = field(year_idx).parse().map_err(|_| {
                H2iError::Parse(format!("price index '{name}' row {}: bad year '{}'", row + 1, field(year_idx)))
            })?;
            let value: f64 = field(value_idx).parse().map_err(|_| {
                H2iError::Parse(format!(
                    "price index '{name}' row {}: bad value '{}'",
                    row + 1,
                    field(value_idx)
                ))
            })?;
            values.push((year, value));
        }
        Self::new(name, values)
    }

    pub fn from_csv_path(name: impl Into<String>, path: &Path, column: &str) -> H2iResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(name, file, column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.values.keys().copied()
    }

    pub fn value(&self, year: i32) -> H2iResult<f64> {
        self.values
            .get(&year)
            .copied()
            .ok_or_else(|| H2iError::lookup(format!("year {year} not in price index '{}'", self.name)))
    }

    /// `index[target] / index[source]`.
    pub fn ratio(&self, source_year: i32, target_year: i32) -> H2iResult<f64> {
        Ok(self.value(target_year)? / self.value(source_year)?)
    }

    pub fn inflate(&self, cost: f64, source_year: i32, target_year: i32) -> H2iResult<f64> {
        Ok(cost * self.ratio(source_year, target_year)?)
    }

    pub fn inflate_series(&self, costs: &[f64], source_year: i32, target_year: i32) -> H2iResult<Vec<f64>> {
        let ratio = self.ratio(source_year, target_year)?;
        Ok(costs.iter().map(|c| c * ratio).collect())
    }
}

/// `cost * index[target_year] / index[source_year]`.
pub fn inflate(cost: f64, source_year: i32, target_year: i32, index: &PriceIndex) -> H2iResult<f64> {
    index.inflate(cost, source_year, target_year)
}
