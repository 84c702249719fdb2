//! Hydrogen direct-reduced iron plant.
//!
//! Plant capacity follows from the hydrogen available to it. Capital and
//! labor costs come from a [`CoefficientTable`]: every `capital` item scales
//! as `model_cepci / equation_cepci * lin * capacity^exp`, and operating
//! labor follows the Peters power law on daily throughput. Owner's costs
//! (five months of labor, preproduction, a 60-day consumables inventory,
//! spare parts, land) are capitalized alongside the plant, and every
//! per-tonne feedstock is costed on the annual iron output. An optional
//! electrowinning section is costed with [`crate::electrowinning`] and
//! escalated from its 2018 basis with the same CEPCI as the plant.

use crate::electrowinning::ElectrowinningParams;
use crate::registry::{StageContext, Technology};
use crate::tables::{declare, hourly, scaled, Defaults};
use h2i_core::config::{numeric_overrides, parse_stage_config, require_numbers};
use h2i_core::cost::{scaling_law, CoefficientRecord, CoefficientTable};
use h2i_core::finance::{annual_total, LevelizedCost};
use h2i_core::value::{Overrides, Values};
use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
use h2i_core::{H2iError, H2iResult, Stage, StageKind};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const SERIES: usize = HOURS_PER_YEAR;

const PERFORMANCE: &[VariableSpec] = &[
    VariableSpec::input("hydrogen_kgpy", 1, Some("kg/year")),
    VariableSpec::input("hydrogen_consume_ratio", 1, Some("t/t")),
    VariableSpec::input("capacity_factor", 1, None),
    VariableSpec::output("plant_capacity_mtpy", 1, Some("t/year")),
    VariableSpec::output("iron", SERIES, Some("kg/h")),
    VariableSpec::output("hydrogen_consumption", SERIES, Some("kg/h")),
];

const COST: &[VariableSpec] = &[
    VariableSpec::input("model_cepci", 1, None),
    VariableSpec::input("equation_cepci", 1, None),
    VariableSpec::input("electrowinning_cepci", 1, None),
    VariableSpec::input("skilled_labor_cost", 1, Some("USD/h")),
    VariableSpec::input("unskilled_labor_cost", 1, Some("USD/h")),
    VariableSpec::input("hydrogen_price", 1, Some("USD/kg")),
    VariableSpec::input("maintenance_materials_unitcost", 1, Some("USD/t")),
    VariableSpec::input("raw_water_consumption", 1, Some("t/t")),
    VariableSpec::input("raw_water_unitcost", 1, Some("USD/t")),
    VariableSpec::input("lime_consumption", 1, Some("t/t")),
    VariableSpec::input("lime_unitcost", 1, Some("USD/t")),
    VariableSpec::input("carbon_consumption", 1, Some("t/t")),
    VariableSpec::input("carbon_unitcost", 1, Some("USD/t")),
    VariableSpec::input("iron_ore_consumption", 1, Some("t/t")),
    VariableSpec::input("iron_ore_pellet_unitcost", 1, Some("USD/t")),
    VariableSpec::input("natural_gas_consumption", 1, Some("GJ/t")),
    VariableSpec::input("natural_gas_price", 1, Some("USD/GJ")),
    VariableSpec::input("electricity_consumption", 1, Some("MWh/t")),
    VariableSpec::input("electricity_price", 1, Some("USD/MWh")),
    VariableSpec::input("slag_production", 1, Some("t/t")),
    VariableSpec::input("slag_disposal_unitcost", 1, Some("USD/t")),
    VariableSpec::input("plant_capacity_mtpy", 1, Some("t/year")),
    VariableSpec::input("iron", SERIES, Some("kg/h")),
    VariableSpec::input("hydrogen_consumption", SERIES, Some("kg/h")),
    VariableSpec::output("total_plant_cost", 1, Some("USD")),
    VariableSpec::output("electrowinning_capex", 1, Some("USD")),
    VariableSpec::output("labor_cost_fivemonth", 1, Some("USD")),
    VariableSpec::output("maintenance_materials_onemonth", 1, Some("USD")),
    VariableSpec::output("non_fuel_consumables_onemonth", 1, Some("USD")),
    VariableSpec::output("waste_disposal_onemonth", 1, Some("USD")),
    VariableSpec::output("monthly_energy_cost", 1, Some("USD")),
    VariableSpec::output("preproduction_cost", 1, Some("USD")),
    VariableSpec::output("fuel_consumables_60day_supply_cost", 1, Some("USD")),
    VariableSpec::output("spare_parts_cost", 1, Some("USD")),
    VariableSpec::output("misc_owners_costs", 1, Some("USD")),
    VariableSpec::output("installation_cost", 1, Some("USD")),
    VariableSpec::output("land_cost", 1, Some("USD")),
    VariableSpec::output("CapEx", 1, Some("USD")),
    VariableSpec::output("labor_cost_operation", 1, Some("USD/year")),
    VariableSpec::output("labor_cost_maintenance", 1, Some("USD/year")),
    VariableSpec::output("labor_cost_admin_support", 1, Some("USD/year")),
    VariableSpec::output("property_tax_insurance", 1, Some("USD/year")),
    VariableSpec::output("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::output("hydrogen_cost", 1, Some("USD/year")),
    VariableSpec::output("maintenance_materials_cost", 1, Some("USD/year")),
    VariableSpec::output("raw_water_cost", 1, Some("USD/year")),
    VariableSpec::output("lime_cost", 1, Some("USD/year")),
    VariableSpec::output("carbon_cost", 1, Some("USD/year")),
    VariableSpec::output("iron_ore_cost", 1, Some("USD/year")),
    VariableSpec::output("natural_gas_cost", 1, Some("USD/year")),
    VariableSpec::output("electricity_cost", 1, Some("USD/year")),
    VariableSpec::output("slag_disposal_cost", 1, Some("USD/year")),
    VariableSpec::output("Variable_OpEx", 1, Some("USD/year")),
    VariableSpec::output("OpEx", 1, Some("USD/year")),
];

const FINANCE: &[VariableSpec] = &[
    VariableSpec::input("CapEx", 1, Some("USD")),
    VariableSpec::input("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::input("Variable_OpEx", 1, Some("USD/year")),
    VariableSpec::input("hydrogen_cost", 1, Some("USD/year")),
    VariableSpec::input("iron_ore_cost", 1, Some("USD/year")),
    VariableSpec::input("natural_gas_cost", 1, Some("USD/year")),
    VariableSpec::input("electricity_cost", 1, Some("USD/year")),
    VariableSpec::input("fixed_charge_rate", 1, None),
    VariableSpec::input("tasc_toc_multiplier", 1, None),
    VariableSpec::input("iron", SERIES, Some("kg/h")),
    VariableSpec::output("LCOI", 1, Some("USD/t")),
    VariableSpec::output("LCOI_capex", 1, Some("USD/t")),
    VariableSpec::output("LCOI_fopex", 1, Some("USD/t")),
    VariableSpec::output("LCOI_vopex", 1, Some("USD/t")),
    VariableSpec::output("LCOI_hydrogen", 1, Some("USD/t")),
    VariableSpec::output("LCOI_ore", 1, Some("USD/t")),
    VariableSpec::output("LCOI_ng", 1, Some("USD/t")),
    VariableSpec::output("LCOI_elec", 1, Some("USD/t")),
];

const PERFORMANCE_DEFAULTS: Defaults = &[("capacity_factor", 0.9)];
// 2018 CEPCI is the basis of the electrowinning cost correlation
const COST_DEFAULTS: Defaults = &[
    ("model_cepci", 596.2),
    ("equation_cepci", 708.8),
    ("electrowinning_cepci", 603.1),
];
const FINANCE_DEFAULTS: Defaults = &[("fixed_charge_rate", 0.0707), ("tasc_toc_multiplier", 1.093)];

const TABLE_KEYS: &[&str] = &[
    "coefficients",
    "coeffs_path",
    "table_technology",
    "electrowinning",
    "o2_heat_integration",
];

const CAPITAL: &str = "capital";
const LABOR: &str = "labor";
const OWNER: &str = "owner";
const OPERATING_LABOR: &str = "Annual Operating Labor Cost";
const PREHEATING: &str = "H2 Pre-heating";

/// Share of the H2 pre-heating capital left when oxygen heat is recovered.
const O2_INTEGRATED_PREHEATING: f64 = 0.6;

/// Days of non-fuel consumables held as start-up inventory.
const CONSUMABLES_INVENTORY_DAYS: f64 = 60.0;

/// Per-tonne feedstocks: usage key, unit-cost key, annual cost output.
const FEEDSTOCKS: &[(&str, &str, &str)] = &[
    ("raw_water_consumption", "raw_water_unitcost", "raw_water_cost"),
    ("lime_consumption", "lime_unitcost", "lime_cost"),
    ("carbon_consumption", "carbon_unitcost", "carbon_cost"),
    ("iron_ore_consumption", "iron_ore_pellet_unitcost", "iron_ore_cost"),
    ("natural_gas_consumption", "natural_gas_price", "natural_gas_cost"),
    ("electricity_consumption", "electricity_price", "electricity_cost"),
    ("slag_production", "slag_disposal_unitcost", "slag_disposal_cost"),
];

/// Coefficient source and optional electrowinning section of the cost stage.
#[derive(Debug, Clone, Deserialize)]
struct IronCostConfig {
    #[serde(default)]
    coefficients: Vec<CoefficientRecord>,
    #[serde(default)]
    coeffs_path: Option<PathBuf>,
    #[serde(default = "default_table_technology")]
    table_technology: String,
    #[serde(default)]
    electrowinning: Option<ElectrowinningParams>,
    #[serde(default)]
    o2_heat_integration: bool,
}

fn default_table_technology() -> String {
    "h2_dri".to_string()
}

impl IronCostConfig {
    fn table(&self, owner: &str) -> H2iResult<CoefficientTable> {
        let table = if !self.coefficients.is_empty() {
            CoefficientTable::from_records(&self.coefficients)
        } else if let Some(path) = &self.coeffs_path {
            CoefficientTable::from_csv_path(path)?
        } else {
            return Err(H2iError::config(format!(
                "{owner}: needs inline 'coefficients' or a 'coeffs_path'"
            )));
        };
        if table.items(&self.table_technology, CAPITAL).is_empty() {
            return Err(H2iError::lookup(format!(
                "{owner}: no capital items for technology '{}'",
                self.table_technology
            )));
        }
        Ok(table)
    }
}

pub(crate) fn build(kind: StageKind, ctx: &StageContext<'_>) -> H2iResult<Arc<dyn Stage>> {
    let id = Technology::Iron.model_key(kind);
    let owner = ctx.owner(&id);
    let layer = ctx.parameters(kind);
    let required: &[&str] = match kind {
        StageKind::Performance => &["hydrogen_kgpy", "hydrogen_consume_ratio"],
        StageKind::Cost => &["skilled_labor_cost", "unskilled_labor_cost"],
        StageKind::Finance => &[],
    };
    require_numbers(&owner, &layer, required)?;

    let costing = if kind == StageKind::Cost {
        let config: IronCostConfig = parse_stage_config(&owner, &layer)?;
        let electrowinning_capex = match &config.electrowinning {
            Some(params) => params.cost()?.total(),
            None => 0.0,
        };
        Some(IronCosting {
            table: config.table(&owner)?,
            technology: config.table_technology,
            electrowinning_capex,
            o2_heat_integration: config.o2_heat_integration,
        })
    } else {
        None
    };

    Ok(Arc::new(IronStage {
        id,
        kind,
        costing,
        configured: numeric_overrides(&layer),
    }))
}

#[derive(Debug, Clone)]
struct IronCosting {
    table: CoefficientTable,
    technology: String,
    /// Stinn–Allanore cost in its own 2018 basis.
    electrowinning_capex: f64,
    o2_heat_integration: bool,
}

impl IronCosting {
    fn coeff(&self, name: &str, kind: &str, coeff: &str) -> H2iResult<f64> {
        self.table.get(&self.technology, name, kind, coeff)
    }

    /// Sum of every capital item at `capacity` t/year, in model-year dollars.
    fn total_plant_cost(&self, capacity: f64, cepci_ratio: f64) -> H2iResult<f64> {
        let mut total = 0.0;
        for item in self.table.items(&self.technology, CAPITAL) {
            let lin = self.coeff(item, CAPITAL, "lin")?;
            let exp = self.coeff(item, CAPITAL, "exp")?;
            let share = if self.o2_heat_integration && item == PREHEATING {
                O2_INTEGRATED_PREHEATING
            } else {
                1.0
            };
            total += cepci_ratio * share * scaling_law(lin, capacity, exp)?;
        }
        Ok(total)
    }

    /// Peters model: employee-hours per day per processing step.
    fn operating_labor(&self, capacity: f64, skilled_rate: f64, unskilled_rate: f64) -> H2iResult<f64> {
        let skilled = self.coeff("% Skilled Labor", LABOR, "constant")? / 100.0;
        let unskilled = self.coeff("% Unskilled Labor", LABOR, "constant")? / 100.0;
        let steps = self.coeff("Processing Steps", LABOR, "constant")?;
        let hours_per_day = scaling_law(
            self.coeff(OPERATING_LABOR, LABOR, "lin")?,
            capacity / 365.0 * 1000.0,
            self.coeff(OPERATING_LABOR, LABOR, "exp")?,
        )?;
        Ok(365.0 * (skilled * skilled_rate + unskilled * unskilled_rate) * steps * hours_per_day)
    }
}

/// Owner's costs incurred before the first tonne is sold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct OwnersCosts {
    labor_fivemonth: f64,
    maintenance_materials_onemonth: f64,
    non_fuel_consumables_onemonth: f64,
    waste_disposal_onemonth: f64,
    monthly_energy: f64,
    preproduction: f64,
    consumables_inventory: f64,
    spare_parts: f64,
    misc: f64,
    land: f64,
}

impl OwnersCosts {
    /// Capitalized at start-up; land is carried separately.
    fn installation(&self) -> f64 {
        self.labor_fivemonth + self.preproduction + self.consumables_inventory + self.spare_parts + self.misc
    }

    fn insert_into(self, values: &mut Values) {
        values.insert("labor_cost_fivemonth", self.labor_fivemonth);
        values.insert("maintenance_materials_onemonth", self.maintenance_materials_onemonth);
        values.insert("non_fuel_consumables_onemonth", self.non_fuel_consumables_onemonth);
        values.insert("waste_disposal_onemonth", self.waste_disposal_onemonth);
        values.insert("monthly_energy_cost", self.monthly_energy);
        values.insert("preproduction_cost", self.preproduction);
        values.insert("fuel_consumables_60day_supply_cost", self.consumables_inventory);
        values.insert("spare_parts_cost", self.spare_parts);
        values.insert("misc_owners_costs", self.misc);
        values.insert("installation_cost", self.installation());
        values.insert("land_cost", self.land);
    }
}

#[derive(Debug, Clone)]
pub struct IronStage {
    id: String,
    kind: StageKind,
    costing: Option<IronCosting>,
    configured: Overrides,
}

impl IronStage {
    fn performance(&self, inputs: &Values) -> H2iResult<Values> {
        let ratio = inputs.scalar("hydrogen_consume_ratio")?;
        if ratio <= 0.0 {
            return Err(H2iError::domain(format!(
                "{}: hydrogen_consume_ratio must be positive, got {ratio}",
                self.id
            )));
        }
        let capacity = inputs.scalar("hydrogen_kgpy")? / 1000.0 / ratio * inputs.scalar("capacity_factor")?;
        let iron = hourly(capacity * 1000.0 / HOURS_PER_YEAR as f64);
        Ok(Values::new()
            .with("plant_capacity_mtpy", capacity)
            .with("hydrogen_consumption", scaled(&iron, ratio))
            .with("iron", iron))
    }

    fn cost(&self, costing: &IronCosting, inputs: &Values) -> H2iResult<Values> {
        let capacity = inputs.scalar("plant_capacity_mtpy")?;
        let model_cepci = inputs.scalar("model_cepci")?;
        let cepci_ratio = model_cepci / inputs.scalar("equation_cepci")?;
        let electrowinning = costing.electrowinning_capex * model_cepci / inputs.scalar("electrowinning_cepci")?;

        let total_plant_cost = costing.total_plant_cost(capacity, cepci_ratio)?;

        let operation = costing.operating_labor(
            capacity,
            inputs.scalar("skilled_labor_cost")?,
            inputs.scalar("unskilled_labor_cost")?,
        )?;
        let maintenance = costing.coeff("Maintenance Labor Cost", LABOR, "constant")? * total_plant_cost;
        let admin = costing.coeff("Administrative & Support Labor Cost", LABOR, "constant")?
            * (operation + maintenance);
        let property = costing.coeff("Property Tax & Insurance", LABOR, "constant")? * total_plant_cost;
        let fixed = operation + maintenance + admin + property;

        let tonnes = inputs.total("iron")? / 1000.0;
        let hydrogen = inputs.total("hydrogen_consumption")? * inputs.scalar("hydrogen_price")?;
        let materials_unitcost = inputs.scalar("maintenance_materials_unitcost")?;
        let mut per_tonne = Values::new();
        for (usage, price, _) in FEEDSTOCKS {
            per_tonne.insert(*usage, inputs.scalar(usage)? * inputs.scalar(price)?);
        }

        let non_fuel_onemonth = capacity
            * (per_tonne.scalar("raw_water_consumption")?
                + per_tonne.scalar("lime_consumption")?
                + per_tonne.scalar("carbon_consumption")?
                + per_tonne.scalar("iron_ore_consumption")?)
            / 12.0;
        let energy_per_tonne =
            per_tonne.scalar("natural_gas_consumption")? + per_tonne.scalar("electricity_consumption")?;
        let owners = OwnersCosts {
            labor_fivemonth: 5.0 / 12.0 * (operation + maintenance + admin),
            maintenance_materials_onemonth: materials_unitcost * capacity / 12.0,
            non_fuel_consumables_onemonth: non_fuel_onemonth,
            waste_disposal_onemonth: capacity * per_tonne.scalar("slag_production")? / 12.0,
            monthly_energy: (hydrogen + capacity * energy_per_tonne) / 12.0,
            preproduction: costing.coeff("Preproduction", OWNER, "constant")? * total_plant_cost,
            consumables_inventory: non_fuel_onemonth * 12.0 / 365.0 * CONSUMABLES_INVENTORY_DAYS,
            spare_parts: costing.coeff("Spare Parts", OWNER, "constant")? * total_plant_cost,
            misc: costing.coeff("Other Owner's Costs", OWNER, "constant")? * total_plant_cost,
            land: costing.coeff("Land", OWNER, "constant")? * capacity,
        };
        let capex = total_plant_cost + owners.installation() + owners.land + electrowinning;

        let mut values = Values::new()
            .with("total_plant_cost", total_plant_cost)
            .with("electrowinning_capex", electrowinning)
            .with("CapEx", capex)
            .with("labor_cost_operation", operation)
            .with("labor_cost_maintenance", maintenance)
            .with("labor_cost_admin_support", admin)
            .with("property_tax_insurance", property)
            .with("Fixed_OpEx", fixed)
            .with("hydrogen_cost", hydrogen)
            .with("maintenance_materials_cost", tonnes * materials_unitcost);
        owners.insert_into(&mut values);

        let mut variable = hydrogen + tonnes * materials_unitcost;
        for (usage, _, output) in FEEDSTOCKS {
            let annual = tonnes * per_tonne.scalar(usage)?;
            variable += annual;
            values.insert(*output, annual);
        }

        debug!(
            "{}: TPC {total_plant_cost:.0} USD at {capacity:.0} t/year, installation {:.0} USD, fixed O&M {fixed:.0} USD/year",
            self.id,
            owners.installation()
        );

        Ok(values
            .with("Variable_OpEx", variable)
            .with("OpEx", fixed + variable))
    }

    fn finance(&self, inputs: &Values) -> H2iResult<Values> {
        let tonnes = annual_total(inputs.series("iron")?, "iron")? / 1000.0;
        let hydrogen = inputs.scalar("hydrogen_cost")?;
        let ore = inputs.scalar("iron_ore_cost")?;
        let gas = inputs.scalar("natural_gas_cost")?;
        let elec = inputs.scalar("electricity_cost")?;
        let lcoi = LevelizedCost::new("LCOI", tonnes)?
            .capital(
                "LCOI_capex",
                inputs.scalar("CapEx")?,
                inputs.scalar("fixed_charge_rate")?,
                inputs.scalar("tasc_toc_multiplier")?,
            )
            .annual("LCOI_fopex", inputs.scalar("Fixed_OpEx")?)
            .annual("LCOI_vopex", inputs.scalar("Variable_OpEx")? - hydrogen - ore - gas - elec)
            .annual("LCOI_hydrogen", hydrogen)
            .annual("LCOI_ore", ore)
            .annual("LCOI_ng", gas)
            .annual("LCOI_elec", elec)
            .finish();
        Ok(lcoi.to_values())
    }
}

impl Stage for IronStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn variables(&self) -> H2iResult<VariableSet> {
        let (table, defaults) = match self.kind {
            StageKind::Performance => (PERFORMANCE, PERFORMANCE_DEFAULTS),
            StageKind::Cost => (COST, COST_DEFAULTS),
            StageKind::Finance => (FINANCE, FINANCE_DEFAULTS),
        };
        declare(&self.id, table, None, defaults, &self.configured)
    }

    fn config_keys(&self) -> &[&'static str] {
        match self.kind {
            StageKind::Cost => TABLE_KEYS,
            _ => &[],
        }
    }

    fn compute(&self, inputs: &Values) -> H2iResult<Values> {
        match (self.kind, &self.costing) {
            (StageKind::Performance, _) => self.performance(inputs),
            (StageKind::Cost, Some(costing)) => self.cost(costing, inputs),
            (StageKind::Cost, None) => Err(H2iError::config(format!(
                "{}: cost stage built without a coefficient table",
                self.id
            ))),
            (StageKind::Finance, _) => self.finance(inputs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2i_core::chain::SignalPool;
    use h2i_core::config::{ConfigMap, ModelInputs};
    use h2i_core::{ChainOutputs, Signal, StageChain};
    use serde_json::json;
    use std::io::Write;

    const RATIO: f64 = 596.2 / 708.8;

    fn record(name: &str, kind: &str, coeff: &str, value: f64) -> serde_json::Value {
        json!({"technology": "h2_dri", "name": name, "type": kind, "coeff": coeff, "value": value})
    }

    fn coefficients() -> serde_json::Value {
        json!([
            record("Shaft Furnace", "capital", "lin", 1.0e5),
            record("Shaft Furnace", "capital", "exp", 0.8),
            record("EAF & Casting", "capital", "lin", 2.0e5),
            record("EAF & Casting", "capital", "exp", 0.7),
            record("H2 Pre-heating", "capital", "lin", 5.0e4),
            record("H2 Pre-heating", "capital", "exp", 0.6),
            record("% Skilled Labor", "labor", "constant", 30.0),
            record("% Unskilled Labor", "labor", "constant", 70.0),
            record("Processing Steps", "labor", "constant", 4.0),
            record("Annual Operating Labor Cost", "labor", "lin", 2.0),
            record("Annual Operating Labor Cost", "labor", "exp", 0.25),
            record("Maintenance Labor Cost", "labor", "constant", 0.02),
            record("Administrative & Support Labor Cost", "labor", "constant", 0.25),
            record("Property Tax & Insurance", "labor", "constant", 0.01),
            record("Preproduction", "owner", "constant", 0.02),
            record("Spare Parts", "owner", "constant", 0.005),
            record("Other Owner's Costs", "owner", "constant", 0.15),
            record("Land", "owner", "constant", 0.775)
        ])
    }

    fn capital_items(preheating_share: f64) -> f64 {
        RATIO
            * (1.0e5 * 1.0e6f64.powf(0.8)
                + 2.0e5 * 1.0e6f64.powf(0.7)
                + preheating_share * 5.0e4 * 1.0e6f64.powf(0.6))
    }

    fn inputs(cost: serde_json::Value) -> ModelInputs {
        serde_json::from_value(json!({
            "performance_parameters": {
                "hydrogen_kgpy": 6.0e7,
                "hydrogen_consume_ratio": 0.06,
                "capacity_factor": 1.0
            },
            "cost_parameters": cost
        }))
        .unwrap()
    }

    fn cost_block() -> serde_json::Value {
        json!({
            "skilled_labor_cost": 40.0,
            "unskilled_labor_cost": 30.0,
            "coefficients": coefficients()
        })
    }

    fn with_feedstocks() -> serde_json::Value {
        let mut cost = cost_block();
        let feedstocks = json!({
            "maintenance_materials_unitcost": 7.7,
            "raw_water_consumption": 0.8,
            "raw_water_unitcost": 0.44,
            "lime_consumption": 0.02,
            "lime_unitcost": 122.0,
            "carbon_consumption": 0.01,
            "carbon_unitcost": 236.0,
            "iron_ore_consumption": 1.63,
            "iron_ore_pellet_unitcost": 127.0,
            "natural_gas_consumption": 0.15,
            "natural_gas_price": 4.0,
            "electricity_consumption": 0.56,
            "electricity_price": 50.0,
            "slag_production": 0.1,
            "slag_disposal_unitcost": 37.0
        });
        for (key, value) in feedstocks.as_object().unwrap() {
            cost[key] = value.clone();
        }
        cost
    }

    fn run(inputs: &ModelInputs, pool: &SignalPool) -> H2iResult<ChainOutputs> {
        let plant = ConfigMap::new();
        let ctx = StageContext::new("dri", &plant, inputs);
        StageChain::new(
            "dri",
            build(StageKind::Performance, &ctx)?,
            build(StageKind::Cost, &ctx)?,
            build(StageKind::Finance, &ctx)?,
        )?
        .run(pool)
    }

    fn close(a: f64, b: f64) -> bool {
        (a / b - 1.0).abs() < 1e-12
    }

    #[test]
    fn capacity_from_hydrogen_supply() {
        let outputs = run(&inputs(cost_block()), &SignalPool::new()).unwrap();
        // 60,000 t H2 at 0.06 t/t feeds a 1 Mt/year plant
        assert!((outputs.scalar("plant_capacity_mtpy").unwrap() - 1.0e6).abs() < 1e-6);
        let iron = outputs.get("iron").unwrap().value.sum();
        assert!((iron / 1.0e9 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn table_driven_capital_and_labor() {
        let mut pool = SignalPool::new();
        pool.insert("hydrogen_price".into(), Signal::new(3.0, Some("USD/kg")));
        let outputs = run(&inputs(cost_block()), &pool).unwrap();

        let tpc = capital_items(1.0);
        assert!(close(outputs.scalar("total_plant_cost").unwrap(), tpc));
        assert!(outputs.scalar("electrowinning_capex").unwrap().abs() < 1e-12);

        let daily: f64 = 1.0e6 / 365.0 * 1000.0;
        let operation = 365.0 * (0.3 * 40.0 + 0.7 * 30.0) * 4.0 * 2.0 * daily.powf(0.25);
        assert!(close(outputs.scalar("labor_cost_operation").unwrap(), operation));

        let maintenance = 0.02 * tpc;
        let admin = 0.25 * (operation + maintenance);
        let fixed = operation + maintenance + admin + 0.01 * tpc;
        assert!(close(outputs.scalar("Fixed_OpEx").unwrap(), fixed));

        // no consumables priced, so the inventory term is zero
        let installation = 5.0 / 12.0 * (operation + maintenance + admin) + (0.02 + 0.005 + 0.15) * tpc;
        assert!(close(outputs.scalar("installation_cost").unwrap(), installation));
        assert!(close(outputs.scalar("land_cost").unwrap(), 0.775 * 1.0e6));
        let capex = tpc + installation + 0.775 * 1.0e6;
        assert!(close(outputs.scalar("CapEx").unwrap(), capex));

        let lcoi_h2 = outputs.scalar("LCOI_hydrogen").unwrap();
        // 60 kg of H2 per tonne at 3 USD/kg
        assert!((lcoi_h2 - 180.0).abs() < 1e-6);

        let lcoi = outputs.scalar("LCOI").unwrap();
        let expected = capex * 0.0707 * 1.093 / 1.0e6 + fixed / 1.0e6 + 180.0;
        assert!((lcoi - expected).abs() < 1e-6);
    }

    #[test]
    fn feedstocks_and_owners_costs() {
        let mut pool = SignalPool::new();
        pool.insert("hydrogen_price".into(), Signal::new(3.0, Some("USD/kg")));
        let outputs = run(&inputs(with_feedstocks()), &pool).unwrap();
        let tonnes = 1.0e6;

        let water = 0.8 * 0.44;
        let lime = 0.02 * 122.0;
        let carbon = 0.01 * 236.0;
        let ore = 1.63 * 127.0;
        assert!(close(outputs.scalar("iron_ore_cost").unwrap(), tonnes * ore));
        assert!(close(outputs.scalar("slag_disposal_cost").unwrap(), tonnes * 0.1 * 37.0));

        let non_fuel = tonnes * (water + lime + carbon + ore) / 12.0;
        assert!(close(outputs.scalar("non_fuel_consumables_onemonth").unwrap(), non_fuel));
        let inventory = non_fuel * 12.0 / 365.0 * 60.0;
        assert!(close(outputs.scalar("fuel_consumables_60day_supply_cost").unwrap(), inventory));
        assert!(close(outputs.scalar("maintenance_materials_onemonth").unwrap(), 7.7 * tonnes / 12.0));
        assert!(close(outputs.scalar("waste_disposal_onemonth").unwrap(), tonnes * 3.7 / 12.0));
        let energy = (6.0e7 * 3.0 + tonnes * (0.15 * 4.0 + 0.56 * 50.0)) / 12.0;
        assert!(close(outputs.scalar("monthly_energy_cost").unwrap(), energy));

        let per_tonne = 7.7 + water + lime + carbon + ore + 0.15 * 4.0 + 0.56 * 50.0 + 0.1 * 37.0;
        let variable = 6.0e7 * 3.0 + tonnes * per_tonne;
        assert!(close(outputs.scalar("Variable_OpEx").unwrap(), variable));

        assert!((outputs.scalar("LCOI_ore").unwrap() - ore).abs() < 1e-9);
        assert!((outputs.scalar("LCOI_elec").unwrap() - 28.0).abs() < 1e-9);
        assert!((outputs.scalar("LCOI_ng").unwrap() - 0.6).abs() < 1e-9);
        let rest = 7.7 + water + lime + carbon + 3.7;
        assert!((outputs.scalar("LCOI_vopex").unwrap() - rest).abs() < 1e-9);
        let shares: f64 = ["LCOI_capex", "LCOI_fopex", "LCOI_vopex", "LCOI_hydrogen", "LCOI_ore", "LCOI_ng", "LCOI_elec"]
            .iter()
            .map(|name| outputs.scalar(name).unwrap())
            .sum();
        assert!(close(outputs.scalar("LCOI").unwrap(), shares));
    }

    #[test]
    fn oxygen_heat_integration_trims_preheating() {
        let mut cost = cost_block();
        cost["o2_heat_integration"] = json!(true);
        let integrated = run(&inputs(cost), &SignalPool::new()).unwrap();
        let plain = run(&inputs(cost_block()), &SignalPool::new()).unwrap();

        assert!(close(integrated.scalar("total_plant_cost").unwrap(), capital_items(0.6)));
        let saved = plain.scalar("total_plant_cost").unwrap() - integrated.scalar("total_plant_cost").unwrap();
        let preheating = RATIO * 0.4 * 5.0e4 * 1.0e6f64.powf(0.6);
        assert!((saved / preheating - 1.0).abs() < 1e-9);
    }

    #[test]
    fn electrowinning_escalated_into_capex() {
        let mut cost = cost_block();
        let params = json!({
            "temperature": 1600.0,
            "pressure": 1.0,
            "production_rate": 31.7,
            "electron_moles": 2,
            "current_density": 5000.0,
            "electrode_area": 30.0,
            "current_efficiency": 0.95,
            "molar_mass": 0.0558,
            "installed_capacity": 500.0,
            "cell_voltage": 1.8,
            "rectifier_lines": 3
        });
        cost["electrowinning"] = params.clone();
        let outputs = run(&inputs(cost), &SignalPool::new()).unwrap();

        let basis: ElectrowinningParams = serde_json::from_value(params).unwrap();
        let basis_2018 = basis.cost().unwrap().total();
        let ew = outputs.scalar("electrowinning_capex").unwrap();
        assert!(close(ew, basis_2018 * 596.2 / 603.1));

        let capex = outputs.scalar("CapEx").unwrap();
        let rest = outputs.scalar("total_plant_cost").unwrap()
            + outputs.scalar("installation_cost").unwrap()
            + outputs.scalar("land_cost").unwrap();
        assert!(close(capex, rest + ew));
    }

    #[test]
    fn coefficients_from_csv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "technology,name,type,coeff,value").unwrap();
        for row in coefficients().as_array().unwrap() {
            writeln!(
                file,
                "{},{},{},{},{}",
                row["technology"].as_str().unwrap(),
                row["name"].as_str().unwrap(),
                row["type"].as_str().unwrap(),
                row["coeff"].as_str().unwrap(),
                row["value"]
            )
            .unwrap();
        }
        let cost = json!({
            "skilled_labor_cost": 40.0,
            "unskilled_labor_cost": 30.0,
            "coeffs_path": file.path()
        });
        let from_file = run(&inputs(cost), &SignalPool::new()).unwrap();
        let inline = run(&inputs(cost_block()), &SignalPool::new()).unwrap();
        let a = from_file.scalar("LCOI").unwrap();
        let b = inline.scalar("LCOI").unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn missing_rows_are_lookup_errors() {
        let mut cost = cost_block();
        cost["table_technology"] = json!("ng_dri");
        assert!(matches!(
            run(&inputs(cost), &SignalPool::new()),
            Err(H2iError::Lookup(_))
        ));

        for missing in ["Processing Steps", "Spare Parts"] {
            let mut cost = cost_block();
            let rows: Vec<serde_json::Value> = coefficients()
                .as_array()
                .unwrap()
                .iter()
                .filter(|row| row["name"] != missing)
                .cloned()
                .collect();
            cost["coefficients"] = json!(rows);
            let err = run(&inputs(cost), &SignalPool::new()).unwrap_err();
            assert!(matches!(err, H2iError::Lookup(_)));
            assert!(err.to_string().contains(missing));
        }
    }
}
