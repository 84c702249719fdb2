//! Methanol plants.
//!
//! Every variant shares the base tables below. The `conversion_tech` key
//! selects the extra tables and the compute step:
//!
//! - `smr`: steam methane reforming fed by LNG, selling surplus electricity
//! - `co2h`: CO2 hydrogenation fed by upstream hydrogen and electricity
//!
//! Without a selector the stages declare the base tables only and refuse to
//! compute.

use crate::registry::{StageContext, Technology};
use crate::tables::{declare, default_overrides, hourly, scaled, Defaults};
use h2i_core::config::{numeric_overrides, require_numbers, ConfigMap};
use h2i_core::cost::OpexSplit;
use h2i_core::finance::{annual_total, LevelizedCost};
use h2i_core::units::convert;
use h2i_core::value::{merge_overrides, Overrides, Values};
use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
use h2i_core::{H2iError, H2iResult, Stage, StageKind, TemplateStage};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const SERIES: usize = HOURS_PER_YEAR;

pub const PERFORMANCE_BASE: &[VariableSpec] = &[
    VariableSpec::input("plant_capacity_kgpy", 1, Some("kg/year")),
    VariableSpec::input("capacity_factor", 1, None),
    VariableSpec::input("co2e_emit_ratio", 1, Some("kg/kg")),
    VariableSpec::input("h2o_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::output("methanol", SERIES, Some("kg/h")),
    VariableSpec::output("co2e_emissions", SERIES, Some("kg/h")),
    VariableSpec::output("h2o_consumption", SERIES, Some("kg/h")),
];

pub const COST_BASE: &[VariableSpec] = &[
    VariableSpec::input("toc_kg_y", 1, Some("USD/(kg/year)")),
    VariableSpec::input("foc_kg_y2", 1, Some("USD/(kg/year)/year")),
    VariableSpec::input("voc_kg", 1, Some("USD/kg")),
    VariableSpec::input("plant_capacity_kgpy", 1, Some("kg/year")),
    VariableSpec::input("methanol", SERIES, Some("kg/h")),
    VariableSpec::output("CapEx", 1, Some("USD")),
    VariableSpec::output("OpEx", 1, Some("USD/year")),
    VariableSpec::output("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::output("Variable_OpEx", 1, Some("USD/year")),
];

pub const FINANCE_BASE: &[VariableSpec] = &[
    VariableSpec::input("CapEx", 1, Some("USD")),
    VariableSpec::input("OpEx", 1, Some("USD/year")),
    VariableSpec::input("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::input("Variable_OpEx", 1, Some("USD/year")),
    VariableSpec::input("tasc_toc_multiplier", 1, None),
    VariableSpec::input("fixed_charge_rate", 1, None),
    VariableSpec::input("methanol", SERIES, Some("kg/h")),
    VariableSpec::output("LCOM", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_meoh", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_meoh_capex", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_meoh_fopex", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_meoh_vopex", 1, Some("USD/kg")),
];

const PERFORMANCE_DEFAULTS: Defaults = &[("plant_capacity_kgpy", 1.0e8), ("capacity_factor", 0.85)];
const COST_DEFAULTS: Defaults = &[("plant_capacity_kgpy", 1.0e8)];
const FINANCE_DEFAULTS: Defaults = &[("tasc_toc_multiplier", 1.093), ("fixed_charge_rate", 0.0707)];

const SMR_PERFORMANCE: &[VariableSpec] = &[
    VariableSpec::input("meoh_syn_cat_consume_ratio", 1, Some("ft**3/kg")),
    VariableSpec::input("meoh_atr_cat_consume_ratio", 1, Some("ft**3/kg")),
    VariableSpec::input("lng_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::input("elec_produce_ratio", 1, Some("kW*h/kg")),
    VariableSpec::output("meoh_syn_cat_consumption", 1, Some("ft**3/year")),
    VariableSpec::output("meoh_atr_cat_consumption", 1, Some("ft**3/year")),
    VariableSpec::output("lng_consumption", SERIES, Some("kg/h")),
    VariableSpec::output("electricity", SERIES, Some("kW*h/h")),
];

const SMR_COST: &[VariableSpec] = &[
    VariableSpec::input("meoh_syn_cat_consumption", 1, Some("ft**3/year")),
    VariableSpec::input("meoh_atr_cat_consumption", 1, Some("ft**3/year")),
    VariableSpec::input("lng_consumption", SERIES, Some("kg/h")),
    VariableSpec::input("electricity", SERIES, Some("kW*h/h")),
    VariableSpec::input("meoh_syn_cat_price", 1, Some("USD/ft**3")),
    VariableSpec::input("meoh_atr_cat_price", 1, Some("USD/ft**3")),
    VariableSpec::input("lng_price", 1, Some("USD/MBtu")),
    VariableSpec::input("elec_sales_price", 1, Some("USD/(kW*h)")),
    VariableSpec::output("meoh_syn_cat_cost", 1, Some("USD/year")),
    VariableSpec::output("meoh_atr_cat_cost", 1, Some("USD/year")),
    VariableSpec::output("lng_cost", 1, Some("USD/year")),
    VariableSpec::output("elec_revenue", 1, Some("USD/year")),
];

const SMR_FINANCE: &[VariableSpec] = &[
    VariableSpec::input("meoh_syn_cat_cost", 1, Some("USD/year")),
    VariableSpec::input("meoh_atr_cat_cost", 1, Some("USD/year")),
    VariableSpec::input("lng_cost", 1, Some("USD/year")),
    VariableSpec::input("elec_revenue", 1, Some("USD/year")),
    VariableSpec::output("LCOM_meoh_syn_cat", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_meoh_atr_cat", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_ng", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_elec", 1, Some("USD/kg")),
];

const CO2H_PERFORMANCE: &[VariableSpec] = &[
    VariableSpec::input("meoh_syn_cat_consume_ratio", 1, Some("ft**3/kg")),
    VariableSpec::input("ng_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::input("co2_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::input("h2_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::input("elec_consume_ratio", 1, Some("kW*h/kg")),
    VariableSpec::output("meoh_syn_cat_consumption", 1, Some("ft**3/year")),
    VariableSpec::output("ng_consumption", SERIES, Some("kg/h")),
    VariableSpec::output("carbon_dioxide", SERIES, Some("kg/h")),
    VariableSpec::output("hydrogen", SERIES, Some("kg/h")),
    VariableSpec::output("electricity", SERIES, Some("kW*h/h")),
];

const CO2H_COST: &[VariableSpec] = &[
    VariableSpec::input("ng_lhv", 1, Some("MJ/kg")),
    VariableSpec::input("meoh_syn_cat_consumption", 1, Some("ft**3/year")),
    VariableSpec::input("ng_consumption", SERIES, Some("kg/h")),
    VariableSpec::input("carbon_dioxide", SERIES, Some("kg/h")),
    VariableSpec::input("meoh_syn_cat_price", 1, Some("USD/ft**3")),
    VariableSpec::input("ng_price", 1, Some("USD/MBtu")),
    VariableSpec::input("co2_price", 1, Some("USD/kg")),
    VariableSpec::output("meoh_syn_cat_cost", 1, Some("USD/year")),
    VariableSpec::output("ng_cost", 1, Some("USD/year")),
    VariableSpec::output("co2_cost", 1, Some("USD/year")),
];

const CO2H_FINANCE: &[VariableSpec] = &[
    VariableSpec::input("meoh_syn_cat_cost", 1, Some("USD/year")),
    VariableSpec::input("ng_cost", 1, Some("USD/year")),
    VariableSpec::input("co2_cost", 1, Some("USD/year")),
    VariableSpec::input("LCOE", 1, Some("USD/(kW*h)")),
    VariableSpec::input("LCOH", 1, Some("USD/kg")),
    VariableSpec::input("electricity", SERIES, Some("kW*h/h")).connected(),
    VariableSpec::input("hydrogen", SERIES, Some("kg/h")).connected(),
    VariableSpec::output("LCOM_meoh_syn_cat", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_ng", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_elec", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_h2", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_co2", 1, Some("USD/kg")),
];

/// LNG lower heating value used by the SMR cost stage, GJ/kg.
const LNG_LHV_GJ_PER_KG: f64 = 0.0201;
/// Energy conversion applied to the LNG price, as calibrated for the SMR plant.
const MMBTU_PER_GJ: f64 = 1.055;

/// Methanol synthesis route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionTech {
    Smr,
    Co2h,
}

impl ConversionTech {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionTech::Smr => "smr",
            ConversionTech::Co2h => "co2h",
        }
    }

    fn extra_table(&self, kind: StageKind) -> &'static [VariableSpec] {
        match (self, kind) {
            (ConversionTech::Smr, StageKind::Performance) => SMR_PERFORMANCE,
            (ConversionTech::Smr, StageKind::Cost) => SMR_COST,
            (ConversionTech::Smr, StageKind::Finance) => SMR_FINANCE,
            (ConversionTech::Co2h, StageKind::Performance) => CO2H_PERFORMANCE,
            (ConversionTech::Co2h, StageKind::Cost) => CO2H_COST,
            (ConversionTech::Co2h, StageKind::Finance) => CO2H_FINANCE,
        }
    }

    /// Keys with no built-in default.
    fn required_keys(&self, kind: StageKind) -> &'static [&'static str] {
        match (self, kind) {
            (ConversionTech::Smr, StageKind::Performance) => &[
                "co2e_emit_ratio",
                "h2o_consume_ratio",
                "meoh_syn_cat_consume_ratio",
                "meoh_atr_cat_consume_ratio",
                "lng_consume_ratio",
                "elec_produce_ratio",
            ],
            (ConversionTech::Co2h, StageKind::Performance) => &[
                "co2e_emit_ratio",
                "h2o_consume_ratio",
                "meoh_syn_cat_consume_ratio",
                "ng_consume_ratio",
                "co2_consume_ratio",
                "h2_consume_ratio",
                "elec_consume_ratio",
            ],
            (ConversionTech::Smr, StageKind::Cost) => &[
                "toc_kg_y",
                "foc_kg_y2",
                "voc_kg",
                "meoh_syn_cat_price",
                "meoh_atr_cat_price",
                "lng_price",
                "elec_sales_price",
            ],
            (ConversionTech::Co2h, StageKind::Cost) => &[
                "toc_kg_y",
                "foc_kg_y2",
                "voc_kg",
                "ng_lhv",
                "meoh_syn_cat_price",
                "ng_price",
                "co2_price",
            ],
            (_, StageKind::Finance) => &[],
        }
    }
}

impl fmt::Display for ConversionTech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionTech {
    type Err = H2iError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "smr" => Ok(ConversionTech::Smr),
            "co2h" => Ok(ConversionTech::Co2h),
            other => Err(H2iError::config(format!(
                "unknown conversion_tech '{other}'; supported values: smr, co2h"
            ))),
        }
    }
}

fn base_table(kind: StageKind) -> (&'static [VariableSpec], Defaults) {
    match kind {
        StageKind::Performance => (PERFORMANCE_BASE, PERFORMANCE_DEFAULTS),
        StageKind::Cost => (COST_BASE, COST_DEFAULTS),
        StageKind::Finance => (FINANCE_BASE, FINANCE_DEFAULTS),
    }
}

/// `conversion_tech` of a merged layer, if one is set.
fn conversion_tech(owner: &str, layer: &ConfigMap) -> H2iResult<Option<ConversionTech>> {
    match layer.get("conversion_tech") {
        None => Ok(None),
        Some(serde_json::Value::String(tech)) => tech
            .parse::<ConversionTech>()
            .map(Some)
            .map_err(|err| match err {
                H2iError::Configuration(msg) => H2iError::config(format!("{owner}: {msg}")),
                other => other,
            }),
        Some(other) => Err(H2iError::config(format!(
            "{owner}: conversion_tech must be a string, got {other}"
        ))),
    }
}

pub(crate) fn build(kind: StageKind, ctx: &StageContext<'_>) -> H2iResult<Arc<dyn Stage>> {
    let id = Technology::Methanol.model_key(kind);
    let owner = ctx.owner(&id);
    let layer = ctx.parameters(kind);
    let configured = numeric_overrides(&layer);

    let Some(tech) = conversion_tech(&owner, &layer)? else {
        let (table, defaults) = base_table(kind);
        let overrides = merge_overrides(&default_overrides(defaults), Some(&configured));
        return Ok(Arc::new(TemplateStage::new(id, kind, table, overrides)));
    };

    require_numbers(&owner, &layer, tech.required_keys(kind))?;
    Ok(Arc::new(MethanolStage {
        id,
        kind,
        tech,
        configured,
    }))
}

/// One stage of a methanol plant with a concrete conversion route.
#[derive(Debug, Clone)]
pub struct MethanolStage {
    id: String,
    kind: StageKind,
    tech: ConversionTech,
    configured: Overrides,
}

impl MethanolStage {
    pub fn conversion_tech(&self) -> ConversionTech {
        self.tech
    }

    fn performance(&self, inputs: &Values) -> H2iResult<Values> {
        let rate = inputs.scalar("plant_capacity_kgpy")? * inputs.scalar("capacity_factor")?
            / HOURS_PER_YEAR as f64;
        let methanol = hourly(rate);
        let annual: f64 = methanol.iter().sum();

        let mut outputs = Values::new()
            .with("co2e_emissions", scaled(&methanol, inputs.scalar("co2e_emit_ratio")?))
            .with("h2o_consumption", scaled(&methanol, inputs.scalar("h2o_consume_ratio")?))
            .with(
                "meoh_syn_cat_consumption",
                annual * inputs.scalar("meoh_syn_cat_consume_ratio")?,
            );

        match self.tech {
            ConversionTech::Smr => {
                outputs.insert(
                    "meoh_atr_cat_consumption",
                    annual * inputs.scalar("meoh_atr_cat_consume_ratio")?,
                );
                outputs.insert("lng_consumption", scaled(&methanol, inputs.scalar("lng_consume_ratio")?));
                outputs.insert("electricity", scaled(&methanol, inputs.scalar("elec_produce_ratio")?));
            }
            ConversionTech::Co2h => {
                outputs.insert("ng_consumption", scaled(&methanol, inputs.scalar("ng_consume_ratio")?));
                outputs.insert("carbon_dioxide", scaled(&methanol, inputs.scalar("co2_consume_ratio")?));
                outputs.insert("hydrogen", scaled(&methanol, inputs.scalar("h2_consume_ratio")?));
                outputs.insert("electricity", scaled(&methanol, inputs.scalar("elec_consume_ratio")?));
            }
        }
        outputs.insert("methanol", methanol);
        Ok(outputs)
    }

    fn cost(&self, inputs: &Values) -> H2iResult<Values> {
        let capacity = inputs.scalar("plant_capacity_kgpy")?;
        let opex = OpexSplit::from_production(
            capacity * inputs.scalar("foc_kg_y2")?,
            inputs.series("methanol")?,
            inputs.scalar("voc_kg")?,
        );
        let syn_cat_cost = inputs.scalar("meoh_syn_cat_consumption")? * inputs.scalar("meoh_syn_cat_price")?;

        let mut outputs = Values::new()
            .with("CapEx", capacity * inputs.scalar("toc_kg_y")?)
            .with("OpEx", opex.total().value())
            .with("Fixed_OpEx", opex.fixed.value())
            .with("Variable_OpEx", opex.variable.value())
            .with("meoh_syn_cat_cost", syn_cat_cost);

        match self.tech {
            ConversionTech::Smr => {
                outputs.insert(
                    "meoh_atr_cat_cost",
                    inputs.scalar("meoh_atr_cat_consumption")? * inputs.scalar("meoh_atr_cat_price")?,
                );
                outputs.insert(
                    "lng_cost",
                    inputs.total("lng_consumption")?
                        * MMBTU_PER_GJ
                        * LNG_LHV_GJ_PER_KG
                        * inputs.scalar("lng_price")?,
                );
                outputs.insert(
                    "elec_revenue",
                    inputs.total("electricity")? * inputs.scalar("elec_sales_price")?,
                );
            }
            ConversionTech::Co2h => {
                let lhv_mmbtu = convert(inputs.scalar("ng_lhv")?, "MJ", "MBtu")?;
                outputs.insert(
                    "ng_cost",
                    inputs.total("ng_consumption")? * lhv_mmbtu * inputs.scalar("ng_price")?,
                );
                outputs.insert(
                    "co2_cost",
                    inputs.total("carbon_dioxide")? * inputs.scalar("co2_price")?,
                );
            }
        }
        Ok(outputs)
    }

    fn finance(&self, inputs: &Values) -> H2iResult<Values> {
        let methanol = annual_total(inputs.series("methanol")?, "methanol")?;
        let capex = inputs.scalar("CapEx")?;
        let fcr = inputs.scalar("fixed_charge_rate")?;
        let tasc = inputs.scalar("tasc_toc_multiplier")?;
        let variable = inputs.scalar("Variable_OpEx")?;
        let syn_cat = inputs.scalar("meoh_syn_cat_cost")?;

        // Variable OpEx already carries the catalyst; it is reported separately.
        let (meoh, lcom) = match self.tech {
            ConversionTech::Smr => {
                let atr_cat = inputs.scalar("meoh_atr_cat_cost")?;
                let meoh = LevelizedCost::new("LCOM_meoh", methanol)?
                    .capital("LCOM_meoh_capex", capex, fcr, tasc)
                    .annual("LCOM_meoh_fopex", inputs.scalar("Fixed_OpEx")?)
                    .annual("LCOM_meoh_vopex", variable - syn_cat - atr_cat)
                    .annual("LCOM_meoh_syn_cat", syn_cat)
                    .annual("LCOM_meoh_atr_cat", atr_cat)
                    .finish();
                let lcom = LevelizedCost::new("LCOM", methanol)?
                    .per_unit("LCOM_meoh", meoh.total)
                    .annual("LCOM_ng", inputs.scalar("lng_cost")?)
                    .credit("LCOM_elec", inputs.scalar("elec_revenue")?)
                    .finish();
                (meoh, lcom)
            }
            ConversionTech::Co2h => {
                let meoh = LevelizedCost::new("LCOM_meoh", methanol)?
                    .capital("LCOM_meoh_capex", capex, fcr, tasc)
                    .annual("LCOM_meoh_fopex", inputs.scalar("Fixed_OpEx")?)
                    .annual("LCOM_meoh_vopex", variable - syn_cat)
                    .annual("LCOM_meoh_syn_cat", syn_cat)
                    .finish();
                let electricity_cost = inputs.scalar("LCOE")? * inputs.total("electricity")?;
                let hydrogen_cost = inputs.scalar("LCOH")? * inputs.total("hydrogen")?;
                let lcom = LevelizedCost::new("LCOM", methanol)?
                    .per_unit("LCOM_meoh", meoh.total)
                    .annual("LCOM_ng", inputs.scalar("ng_cost")?)
                    .annual("LCOM_elec", electricity_cost)
                    .annual("LCOM_h2", hydrogen_cost)
                    .annual("LCOM_co2", inputs.scalar("co2_cost")?)
                    .finish();
                (meoh, lcom)
            }
        };

        let mut outputs = meoh.to_values();
        outputs.extend(lcom.to_values());
        Ok(outputs)
    }
}

impl Stage for MethanolStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn variables(&self) -> H2iResult<VariableSet> {
        let (base, defaults) = base_table(self.kind);
        declare(
            &self.id,
            base,
            Some(self.tech.extra_table(self.kind)),
            defaults,
            &self.configured,
        )
    }

    fn config_keys(&self) -> &[&'static str] {
        &["conversion_tech"]
    }

    fn compute(&self, inputs: &Values) -> H2iResult<Values> {
        match self.kind {
            StageKind::Performance => self.performance(inputs),
            StageKind::Cost => self.cost(inputs),
            StageKind::Finance => self.finance(inputs),
        }
    }
}
