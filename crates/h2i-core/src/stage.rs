//! The Performance → Cost → Finance stage interface.

use crate::error::{H2iError, H2iResult};
use crate::value::{Overrides, Values};
use crate::variable::{VariableSet, VariableSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a stage within a technology's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Performance,
    Cost,
    Finance,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Performance, StageKind::Cost, StageKind::Finance];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Performance => "performance",
            StageKind::Cost => "cost",
            StageKind::Finance => "finance",
        }
    }

    /// Key of the stage-specific block under `model_inputs`.
    pub fn parameters_key(&self) -> &'static str {
        match self {
            StageKind::Performance => "performance_parameters",
            StageKind::Cost => "cost_parameters",
            StageKind::Finance => "finance_parameters",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = H2iError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "performance" => Ok(StageKind::Performance),
            "cost" => Ok(StageKind::Cost),
            "finance" | "financial" => Ok(StageKind::Finance),
            other => Err(H2iError::config(format!(
                "unknown stage '{other}'; supported values: performance, cost, finance"
            ))),
        }
    }
}

/// One stage of a technology model.
///
/// A stage declares its inputs and outputs through [`Stage::variables`] and
/// maps input values to output values in [`Stage::compute`]. Stages hold only
/// configuration; every call is a pure, single-shot evaluation.
pub trait Stage: Send + Sync {
    /// Registry-facing identifier, e.g. `"methanol_performance"`.
    fn id(&self) -> &str;

    fn kind(&self) -> StageKind;

    /// Declared variables with their configured initial values.
    fn variables(&self) -> H2iResult<VariableSet>;

    /// Configuration keys the stage reads that are not declared variables
    /// (selectors, lookup tables, file paths).
    fn config_keys(&self) -> &[&'static str] {
        &[]
    }

    /// Evaluate the stage. Template stages keep this default.
    fn compute(&self, _inputs: &Values) -> H2iResult<Values> {
        Err(H2iError::not_implemented(format!(
            "{} stage '{}' declares variables only; use a concrete technology",
            self.kind(),
            self.id()
        )))
    }
}

/// A stage that only declares a table.
///
/// Shared base tables of a technology family are exposed this way so they
/// can be inspected, but evaluating one fails with `NotImplemented`.
#[derive(Debug, Clone)]
pub struct TemplateStage {
    id: String,
    kind: StageKind,
    table: &'static [VariableSpec],
    overrides: Overrides,
}

impl TemplateStage {
    pub fn new(
        id: impl Into<String>,
        kind: StageKind,
        table: &'static [VariableSpec],
        overrides: Overrides,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            table,
            overrides,
        }
    }
}

impl Stage for TemplateStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn variables(&self) -> H2iResult<VariableSet> {
        let mut set = VariableSet::new(self.id.clone());
        set.declare_from_table(self.table, None, &self.overrides, None)?;
        Ok(set)
    }
}
