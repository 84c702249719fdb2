//! Ammonia synthesis loop sized by a nameplate capacity and capacity factor.
//!
//! Capital cost follows a power law on daily capacity, optionally moved from
//! the cost basis year to the plant cost year with a price index supplied in
//! config, either inline (`cost_index: [[2010, 550.8], [2022, 816.0]]` or a
//! map keyed by quoted years) or as a CSV file (`cost_index_path` +
//! `cost_index_column`).

use crate::registry::{StageContext, Technology};
use crate::tables::{declare, hourly, scaled, Defaults, NO_DEFAULTS};
use h2i_core::config::{numeric_overrides, parse_stage_config, require_numbers};
use h2i_core::cost::{scaled_capex, OpexSplit};
use h2i_core::finance::{annual_total, LevelizedCost};
use h2i_core::value::{Overrides, Values};
use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
use h2i_core::{H2iError, H2iResult, PriceIndex, Stage, StageKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const SERIES: usize = HOURS_PER_YEAR;

const PERFORMANCE: &[VariableSpec] = &[
    VariableSpec::input("plant_capacity_kgpy", 1, Some("kg/year")),
    VariableSpec::input("capacity_factor", 1, None),
    VariableSpec::input("hydrogen_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::input("nitrogen_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::input("electricity_consume_ratio", 1, Some("kW*h/kg")),
    VariableSpec::output("ammonia", SERIES, Some("kg/h")),
    VariableSpec::output("hydrogen_consumption", SERIES, Some("kg/h")),
    VariableSpec::output("nitrogen_consumption", SERIES, Some("kg/h")),
    VariableSpec::output("electricity_consumption", SERIES, Some("kW")),
];

const COST: &[VariableSpec] = &[
    VariableSpec::input("plant_capacity_kgpy", 1, Some("kg/year")),
    VariableSpec::input("capex_coefficient", 1, Some("USD")),
    VariableSpec::input("capex_exponent", 1, None),
    VariableSpec::input("fixed_opex_fraction", 1, None),
    VariableSpec::input("voc_kg", 1, Some("USD/kg")),
    VariableSpec::input("hydrogen_price", 1, Some("USD/kg")),
    VariableSpec::input("nitrogen_price", 1, Some("USD/kg")),
    VariableSpec::input("electricity_price", 1, Some("USD/(kW*h)")),
    VariableSpec::input("ammonia", SERIES, Some("kg/h")),
    VariableSpec::input("hydrogen_consumption", SERIES, Some("kg/h")),
    VariableSpec::input("nitrogen_consumption", SERIES, Some("kg/h")),
    VariableSpec::input("electricity_consumption", SERIES, Some("kW")),
    VariableSpec::output("CapEx", 1, Some("USD")),
    VariableSpec::output("OpEx", 1, Some("USD/year")),
    VariableSpec::output("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::output("Variable_OpEx", 1, Some("USD/year")),
    VariableSpec::output("hydrogen_cost", 1, Some("USD/year")),
    VariableSpec::output("nitrogen_cost", 1, Some("USD/year")),
    VariableSpec::output("electricity_cost", 1, Some("USD/year")),
];

const FINANCE: &[VariableSpec] = &[
    VariableSpec::input("CapEx", 1, Some("USD")),
    VariableSpec::input("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::input("Variable_OpEx", 1, Some("USD/year")),
    VariableSpec::input("hydrogen_cost", 1, Some("USD/year")),
    VariableSpec::input("nitrogen_cost", 1, Some("USD/year")),
    VariableSpec::input("electricity_cost", 1, Some("USD/year")),
    VariableSpec::input("fixed_charge_rate", 1, None),
    VariableSpec::input("tasc_toc_multiplier", 1, None),
    VariableSpec::input("ammonia", SERIES, Some("kg/h")),
    VariableSpec::output("LCOA", 1, Some("USD/kg")),
    VariableSpec::output("LCOA_capex", 1, Some("USD/kg")),
    VariableSpec::output("LCOA_fopex", 1, Some("USD/kg")),
    VariableSpec::output("LCOA_vopex", 1, Some("USD/kg")),
    VariableSpec::output("LCOA_hydrogen", 1, Some("USD/kg")),
    VariableSpec::output("LCOA_nitrogen", 1, Some("USD/kg")),
    VariableSpec::output("LCOA_electricity", 1, Some("USD/kg")),
];

const PERFORMANCE_DEFAULTS: Defaults = &[("capacity_factor", 0.9)];
const FINANCE_DEFAULTS: Defaults = &[("fixed_charge_rate", 0.0707), ("tasc_toc_multiplier", 1.0)];

const INDEX_KEYS: &[&str] = &["base_year", "cost_index", "cost_index_path", "cost_index_column"];

/// Price-index settings of the cost stage.
#[derive(Debug, Clone, Deserialize)]
struct CostIndexConfig {
    #[serde(default = "default_cost_year")]
    cost_year: i32,
    #[serde(default)]
    base_year: Option<i32>,
    #[serde(default)]
    cost_index: Option<InlineIndex>,
    #[serde(default)]
    cost_index_path: Option<PathBuf>,
    #[serde(default = "default_index_column")]
    cost_index_column: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum InlineIndex {
    Pairs(Vec<(i32, f64)>),
    ByYear(BTreeMap<String, f64>),
}

fn default_cost_year() -> i32 {
    2022
}

fn default_index_column() -> String {
    "cepci".to_string()
}

impl CostIndexConfig {
    fn index(&self, owner: &str) -> H2iResult<Option<PriceIndex>> {
        match &self.cost_index {
            Some(InlineIndex::Pairs(pairs)) => {
                return PriceIndex::new("cost_index", pairs.iter().copied()).map(Some);
            }
            Some(InlineIndex::ByYear(entries)) => {
                let mut values = Vec::with_capacity(entries.len());
                for (year, value) in entries {
                    let year: i32 = year.trim().parse().map_err(|_| {
                        H2iError::config(format!("{owner}: cost_index year '{year}' is not an integer"))
                    })?;
                    values.push((year, *value));
                }
                return PriceIndex::new("cost_index", values).map(Some);
            }
            None => {}
        }
        match &self.cost_index_path {
            Some(path) => {
                PriceIndex::from_csv_path(self.cost_index_column.clone(), path, &self.cost_index_column)
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// Ratio moving the capital cost basis to the plant cost year.
    fn ratio(&self, owner: &str) -> H2iResult<f64> {
        match self.index(owner)? {
            Some(index) => {
                let base_year = self.base_year.unwrap_or(self.cost_year);
                let ratio = index.ratio(base_year, self.cost_year)?;
                debug!(
                    "{owner}: {} ratio {base_year} -> {} = {ratio:.4}",
                    index.name(),
                    self.cost_year
                );
                Ok(ratio)
            }
            None => Ok(1.0),
        }
    }
}

pub(crate) fn build(kind: StageKind, ctx: &StageContext<'_>) -> H2iResult<Arc<dyn Stage>> {
    let id = Technology::Ammonia.model_key(kind);
    let owner = ctx.owner(&id);
    let layer = ctx.parameters(kind);
    let required: &[&str] = match kind {
        StageKind::Performance => &[
            "plant_capacity_kgpy",
            "hydrogen_consume_ratio",
            "nitrogen_consume_ratio",
            "electricity_consume_ratio",
        ],
        StageKind::Cost => &[
            "plant_capacity_kgpy",
            "capex_coefficient",
            "capex_exponent",
            "fixed_opex_fraction",
        ],
        StageKind::Finance => &[],
    };
    require_numbers(&owner, &layer, required)?;

    let index_ratio = if kind == StageKind::Cost {
        let index: CostIndexConfig = parse_stage_config(&owner, &layer)?;
        index.ratio(&owner)?
    } else {
        1.0
    };

    Ok(Arc::new(AmmoniaStage {
        id,
        kind,
        index_ratio,
        configured: numeric_overrides(&layer),
    }))
}

#[derive(Debug, Clone)]
pub struct AmmoniaStage {
    id: String,
    kind: StageKind,
    index_ratio: f64,
    configured: Overrides,
}

impl AmmoniaStage {
    fn performance(&self, inputs: &Values) -> H2iResult<Values> {
        let capacity = inputs.scalar("plant_capacity_kgpy")?;
        if capacity < 0.0 {
            return Err(H2iError::domain(format!(
                "{}: plant_capacity_kgpy must be non-negative, got {capacity}",
                self.id
            )));
        }
        let ammonia = hourly(capacity * inputs.scalar("capacity_factor")? / HOURS_PER_YEAR as f64);
        Ok(Values::new()
            .with(
                "hydrogen_consumption",
                scaled(&ammonia, inputs.scalar("hydrogen_consume_ratio")?),
            )
            .with(
                "nitrogen_consumption",
                scaled(&ammonia, inputs.scalar("nitrogen_consume_ratio")?),
            )
            .with(
                "electricity_consumption",
                scaled(&ammonia, inputs.scalar("electricity_consume_ratio")?),
            )
            .with("ammonia", ammonia))
    }

    fn cost(&self, inputs: &Values) -> H2iResult<Values> {
        let capacity_tpd = inputs.scalar("plant_capacity_kgpy")? / 1000.0 / 365.0;
        let capex = scaled_capex(
            inputs.scalar("capex_coefficient")?,
            capacity_tpd,
            inputs.scalar("capex_exponent")?,
            self.index_ratio,
        )?;

        let feed = |series: &str, price: &str| -> H2iResult<f64> {
            Ok(OpexSplit::from_production(0.0, inputs.series(series)?, inputs.scalar(price)?)
                .variable
                .value())
        };
        let hydrogen = feed("hydrogen_consumption", "hydrogen_price")?;
        let nitrogen = feed("nitrogen_consumption", "nitrogen_price")?;
        let electricity = feed("electricity_consumption", "electricity_price")?;

        let opex = OpexSplit::from_production(
            inputs.scalar("fixed_opex_fraction")? * capex.value(),
            inputs.series("ammonia")?,
            inputs.scalar("voc_kg")?,
        );
        let fixed = opex.fixed.value();
        let variable = opex.variable.value() + hydrogen + nitrogen + electricity;

        Ok(Values::new()
            .with("CapEx", capex.value())
            .with("OpEx", fixed + variable)
            .with("Fixed_OpEx", fixed)
            .with("Variable_OpEx", variable)
            .with("hydrogen_cost", hydrogen)
            .with("nitrogen_cost", nitrogen)
            .with("electricity_cost", electricity))
    }

    fn finance(&self, inputs: &Values) -> H2iResult<Values> {
        let ammonia = annual_total(inputs.series("ammonia")?, "ammonia")?;
        let hydrogen = inputs.scalar("hydrogen_cost")?;
        let nitrogen = inputs.scalar("nitrogen_cost")?;
        let electricity = inputs.scalar("electricity_cost")?;
        let other_variable = inputs.scalar("Variable_OpEx")? - hydrogen - nitrogen - electricity;

        let lcoa = LevelizedCost::new("LCOA", ammonia)?
            .capital(
                "LCOA_capex",
                inputs.scalar("CapEx")?,
                inputs.scalar("fixed_charge_rate")?,
                inputs.scalar("tasc_toc_multiplier")?,
            )
            .annual("LCOA_fopex", inputs.scalar("Fixed_OpEx")?)
            .annual("LCOA_vopex", other_variable)
            .annual("LCOA_hydrogen", hydrogen)
            .annual("LCOA_nitrogen", nitrogen)
            .annual("LCOA_electricity", electricity)
            .finish();
        Ok(lcoa.to_values())
    }
}

impl Stage for AmmoniaStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn variables(&self) -> H2iResult<VariableSet> {
        let (table, defaults) = match self.kind {
            StageKind::Performance => (PERFORMANCE, PERFORMANCE_DEFAULTS),
            StageKind::Cost => (COST, NO_DEFAULTS),
            StageKind::Finance => (FINANCE, FINANCE_DEFAULTS),
        };
        declare(&self.id, table, None, defaults, &self.configured)
    }

    fn config_keys(&self) -> &[&'static str] {
        match self.kind {
            StageKind::Cost => INDEX_KEYS,
            _ => &[],
        }
    }

    fn compute(&self, inputs: &Values) -> H2iResult<Values> {
        match self.kind {
            StageKind::Performance => self.performance(inputs),
            StageKind::Cost => self.cost(inputs),
            StageKind::Finance => self.finance(inputs),
        }
    }
}
