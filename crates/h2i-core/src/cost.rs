//! Capital and operating cost building blocks.

use crate::error::{H2iError, H2iResult};
use crate::units::{Usd, UsdPerYear};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Power-law cost scaling, `coefficient * capacity^exponent`.
pub fn scaling_law(coefficient: f64, capacity: f64, exponent: f64) -> H2iResult<f64> {
    if !capacity.is_finite() || capacity < 0.0 {
        return Err(H2iError::domain(format!(
            "capacity must be a non-negative number, got {capacity}"
        )));
    }
    Ok(coefficient * capacity.powf(exponent))
}

/// Scaling-law CapEx moved between cost bases by `index_ratio`
/// (`index[target] / index[source]`).
pub fn scaled_capex(coefficient: f64, capacity: f64, exponent: f64, index_ratio: f64) -> H2iResult<Usd> {
    Ok(Usd(scaling_law(coefficient, capacity, exponent)? * index_ratio))
}

/// Operating cost split into a production-independent part and a part
/// proportional to annual production.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpexSplit {
    pub fixed: UsdPerYear,
    pub variable: UsdPerYear,
}

impl OpexSplit {
    /// `variable = Σ production * price_per_unit`.
    pub fn from_production(fixed: f64, production: &[f64], price_per_unit: f64) -> Self {
        Self {
            fixed: UsdPerYear(fixed),
            variable: UsdPerYear(production.iter().sum::<f64>() * price_per_unit),
        }
    }

    pub fn total(&self) -> UsdPerYear {
        self.fixed + self.variable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
struct CoefficientKey {
    technology: String,
    name: String,
    kind: String,
    coeff: String,
}

/// One row of a coefficient table, as stored in CSV files or inline config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRecord {
    pub technology: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub coeff: String,
    pub value: f64,
}

/// Cost-model coefficients keyed by `(technology, name, kind, coeff)`.
///
/// `kind` groups items (e.g. `capital`, `fixed opex`) and `coeff` names the
/// coefficient within an item (e.g. `lin`, `exp`, `constant`).
#[derive(Debug, Clone, Default)]
pub struct CoefficientTable {
    rows: BTreeMap<CoefficientKey, f64>,
}

impl CoefficientTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, technology: &str, name: &str, kind: &str, coeff: &str, value: f64) {
        self.rows.insert(
            CoefficientKey {
                technology: technology.to_string(),
                name: name.to_string(),
                kind: kind.to_string(),
                coeff: coeff.to_string(),
            },
            value,
        );
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CoefficientRecord>) -> Self {
        let mut table = Self::new();
        for row in records {
            table.insert(&row.technology, &row.name, &row.kind, &row.coeff, row.value);
        }
        table
    }

    /// Load from CSV with columns `technology,name,type,coeff,value`.
    pub fn from_csv_reader<R: Read>(reader: R) -> H2iResult<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut table = Self::new();
        for row in csv.deserialize() {
            let row: CoefficientRecord = row?;
            table.insert(&row.technology, &row.name, &row.kind, &row.coeff, row.value);
        }
        Ok(table)
    }

    pub fn from_csv_path(path: &Path) -> H2iResult<Self> {
        Self::from_csv_reader(std::fs::File::open(path)?)
    }

    pub fn get(&self, technology: &str, name: &str, kind: &str, coeff: &str) -> H2iResult<f64> {
        let key = CoefficientKey {
            technology: technology.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            coeff: coeff.to_string(),
        };
        self.rows.get(&key).copied().ok_or_else(|| {
            H2iError::lookup(format!(
                "no coefficient '{coeff}' for '{name}' ({kind}) of technology '{technology}'"
            ))
        })
    }

    /// Distinct item names of one kind for a technology, in sorted order.
    pub fn items(&self, technology: &str, kind: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .rows
            .keys()
            .filter(|key| key.technology == technology && key.kind == kind)
            .map(|key| key.name.as_str())
            .collect();
        names.dedup();
        names
    }

    pub fn technologies(&self) -> Vec<&str> {
        let mut techs: Vec<&str> = self.rows.keys().map(|key| key.technology.as_str()).collect();
        techs.dedup();
        techs
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_law_with_cepci_ratio() {
        let capex = scaled_capex(100.0, 1000.0, 0.6, 596.2 / 708.8).unwrap();
        let exact = 100.0 * 1000f64.powf(0.6) * 596.2 / 708.8;
        assert!((capex.value() - exact).abs() < 1e-9);
        // ~5308 USD
        assert!((capex.value() - 5308.4).abs() < 2.0, "{}", capex);
    }

    #[test]
    fn negative_capacity_is_domain_error() {
        assert!(matches!(
            scaling_law(1.0, -5.0, 0.6),
            Err(H2iError::Domain(_))
        ));
        assert_eq!(scaling_law(3.0, 0.0, 0.6).unwrap(), 0.0);
    }

    #[test]
    fn opex_split_totals() {
        let split = OpexSplit::from_production(100.0, &[1.0, 2.0, 3.0], 10.0);
        assert_eq!(split.variable.value(), 60.0);
        assert_eq!(split.total().value(), 160.0);
    }

    #[test]
    fn coefficient_table_lookup() {
        let data = "technology,name,type,coeff,value\n\
                    h2_dri,Shaft furnace,capital,lin,1.2e6\n\
                    h2_dri,Shaft furnace,capital,exp,0.6\n\
                    h2_dri,Reformer,capital,lin,5.0e5\n\
                    h2_dri,Reformer,capital,exp,0.7\n\
                    h2_dri,Labor rate,fixed opex,constant,50\n";
        let table = CoefficientTable::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.items("h2_dri", "capital"), vec!["Reformer", "Shaft furnace"]);
        assert!((table.get("h2_dri", "Shaft furnace", "capital", "exp").unwrap() - 0.6).abs() < 1e-12);

        let err = table.get("ng_dri", "Shaft furnace", "capital", "exp").unwrap_err();
        assert!(matches!(err, H2iError::Lookup(_)));
        assert!(err.to_string().contains("ng_dri"));
    }

    #[test]
    fn coefficient_table_from_inline_records() {
        let records: Vec<CoefficientRecord> = serde_json::from_str(
            r#"[{"technology": "h2_dri", "name": "Piping", "type": "capital", "coeff": "lin", "value": 2.0},
                {"technology": "h2_dri", "name": "Piping", "type": "capital", "coeff": "exp", "value": 0.5}]"#,
        )
        .unwrap();
        let table = CoefficientTable::from_records(&records);
        assert_eq!(table.technologies(), vec!["h2_dri"]);
        assert_eq!(table.items("h2_dri", "capital"), vec!["Piping"]);
        assert!((table.get("h2_dri", "Piping", "capital", "lin").unwrap() - 2.0).abs() < 1e-12);
    }
}
