//! Geologic hydrogen wells.
//!
//! Natural wells produce hydrogen accumulated in a gas reservoir. Combined
//! wells add stimulated hydrogen from serpentinization of iron(II)-bearing
//! rock, modeled as shrinking reactive grains. Both share the cost and
//! finance stages; capital costs follow the NETL-PUB-22580 multipliers.

use crate::registry::{StageContext, Technology};
use crate::tables::{declare, hourly, NO_DEFAULTS};
use h2i_core::config::{numeric_overrides, require_numbers};
use h2i_core::finance::{
    annual_total, netl_fixed_charge_rate, LevelizedCost, NETL_ATWACC, NETL_EFFECTIVE_TAX_RATE,
};
use h2i_core::value::{Overrides, Values};
use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
use h2i_core::{H2iError, H2iResult, Stage, StageKind};
use std::sync::Arc;

const SERIES: usize = HOURS_PER_YEAR;

const PERFORMANCE: &[VariableSpec] = &[
    VariableSpec::input("well_lifetime", 1, Some("year")),
    VariableSpec::input("site_prospectivity", 1, None),
    VariableSpec::input("initial_wellhead_flow", 1, Some("kg/h")),
    VariableSpec::input("gas_reservoir_size", 1, Some("t")),
    VariableSpec::output("wellhead_h2_conc", 1, Some("percent")),
    VariableSpec::output("lifetime_wellhead_flow", 1, Some("kg/h")),
    VariableSpec::output("hydrogen_accumulated", SERIES, Some("kg/h")),
    VariableSpec::output("hydrogen", SERIES, Some("kg/h")),
];

const STIMULATED_PERFORMANCE: &[VariableSpec] = &[
    VariableSpec::input("grain_size", 1, Some("m")),
    VariableSpec::input("serp_rate", 1, Some("1/s")),
    VariableSpec::input("caprock_depth", 1, Some("m")),
    VariableSpec::input("borehole_depth", 1, Some("m")),
    VariableSpec::input("inj_prod_distance", 1, Some("m")),
    VariableSpec::input("reaction_zone_width", 1, Some("m")),
    VariableSpec::input("bulk_density", 1, Some("kg/m**3")),
    VariableSpec::input("iron_II_conc", 1, Some("percent")),
    VariableSpec::output("hydrogen_produced", SERIES, Some("kg/h")),
];

const COST: &[VariableSpec] = &[
    VariableSpec::input("test_drill_cost", 1, Some("USD")),
    VariableSpec::input("permit_fees", 1, Some("USD")),
    VariableSpec::input("acreage", 1, Some("acre")),
    VariableSpec::input("rights_cost", 1, Some("USD/acre")),
    VariableSpec::input("completion_cost", 1, Some("USD")),
    VariableSpec::input("success_chance", 1, Some("percent")),
    VariableSpec::input("fixed_opex", 1, Some("USD/year")),
    VariableSpec::input("variable_opex", 1, Some("USD/kg")),
    VariableSpec::input("hydrogen", SERIES, Some("kg/h")),
    VariableSpec::output("bare_capital_cost", 1, Some("USD")),
    VariableSpec::output("CapEx", 1, Some("USD")),
    VariableSpec::output("OpEx", 1, Some("USD/year")),
    VariableSpec::output("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::output("Variable_OpEx", 1, Some("USD/year")),
];

const FINANCE: &[VariableSpec] = &[
    VariableSpec::input("well_lifetime", 1, Some("year")),
    VariableSpec::input("CapEx", 1, Some("USD")),
    VariableSpec::input("OpEx", 1, Some("USD/year")),
    VariableSpec::input("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::input("Variable_OpEx", 1, Some("USD/year")),
    VariableSpec::input("hydrogen", SERIES, Some("kg/h")),
    VariableSpec::output("LCOH", 1, Some("USD/kg")),
    VariableSpec::output("LCOH_capex", 1, Some("USD/kg")),
    VariableSpec::output("LCOH_fopex", 1, Some("USD/kg")),
    VariableSpec::output("LCOH_vopex", 1, Some("USD/kg")),
];

/// Fit of wellhead H2 concentration (%) against site prospectivity.
const CONC_COEFFICIENT: f64 = 58.929_817_51;
const CONC_EXPONENT: f64 = 2.460_718_753;

const FE_MOLAR_MASS: f64 = 55.8;
const H2_PER_FE_MASS: f64 = 1.00;
const SECONDS_PER_YEAR: f64 = 3600.0 * 8760.0;

// NETL-PUB-22580 capital cost multipliers
const CONTRACTING_FRACTION: f64 = 0.20;
const CONTINGENCY_FRACTION: f64 = 0.50;
const PREPRODUCTION_FRACTION: f64 = 0.50;
const TASC_TOC_MULTIPLIER: f64 = 1.10;

/// Expected wellhead H2 concentration in percent.
pub fn wellhead_h2_concentration(prospectivity: f64) -> H2iResult<f64> {
    if !prospectivity.is_finite() || prospectivity < 0.0 {
        return Err(H2iError::domain(format!(
            "site prospectivity must be non-negative, got {prospectivity}"
        )));
    }
    Ok(CONC_COEFFICIENT * prospectivity.powf(CONC_EXPONENT))
}

/// Whole years of well life; at least one.
fn lifetime_years(lifetime: f64) -> H2iResult<u32> {
    if !lifetime.is_finite() || lifetime < 1.0 {
        return Err(H2iError::domain(format!(
            "well lifetime must be at least one year, got {lifetime}"
        )));
    }
    Ok(lifetime.floor() as u32)
}

/// Rock deposit reacting with injected water.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Serpentinization {
    pub grain_size: f64,
    pub serp_rate: f64,
    pub caprock_depth: f64,
    pub borehole_depth: f64,
    pub inj_prod_distance: f64,
    pub reaction_zone_width: f64,
    pub bulk_density: f64,
    pub iron_ii_conc: f64,
}

impl Serpentinization {
    fn from_inputs(inputs: &Values) -> H2iResult<Self> {
        Ok(Self {
            grain_size: inputs.scalar("grain_size")?,
            serp_rate: inputs.scalar("serp_rate")?,
            caprock_depth: inputs.scalar("caprock_depth")?,
            borehole_depth: inputs.scalar("borehole_depth")?,
            inj_prod_distance: inputs.scalar("inj_prod_distance")?,
            reaction_zone_width: inputs.scalar("reaction_zone_width")?,
            bulk_density: inputs.scalar("bulk_density")?,
            iron_ii_conc: inputs.scalar("iron_II_conc")?,
        })
    }

    /// Cumulative hydrogen (kg) released after `years` of reaction.
    ///
    /// Each grain's unreacted core shrinks at twice the penetration rate
    /// `grain_size * serp_rate`; the reacted shell releases H2 in proportion
    /// to its iron(II) content.
    pub fn hydrogen_released(&self, years: u32) -> H2iResult<f64> {
        if self.grain_size <= 0.0 {
            return Err(H2iError::domain(format!(
                "grain size must be positive, got {}",
                self.grain_size
            )));
        }
        let height = self.borehole_depth - self.caprock_depth;
        if height < 0.0 {
            return Err(H2iError::domain(format!(
                "borehole depth {} is above caprock depth {}",
                self.borehole_depth, self.caprock_depth
            )));
        }
        let rock_volume = height * self.inj_prod_distance * self.reaction_zone_width;
        let n_grains = rock_volume / self.grain_size.powi(3);

        let penetration_rate = self.grain_size * self.serp_rate;
        let elapsed = years as f64 * SECONDS_PER_YEAR;
        let core = (self.grain_size - 2.0 * penetration_rate * elapsed).max(0.0);
        let reacted_volume = n_grains * (self.grain_size.powi(3) - core.powi(3));
        let reacted_mass = reacted_volume * self.bulk_density * self.iron_ii_conc / 100.0;
        Ok(reacted_mass * H2_PER_FE_MASS / FE_MOLAR_MASS)
    }
}

pub(crate) fn build(
    tech: Technology,
    kind: StageKind,
    ctx: &StageContext<'_>,
) -> H2iResult<Arc<dyn Stage>> {
    let id = tech.model_key(kind);
    let layer = ctx.parameters(kind);
    let required: &[&str] = match (tech, kind) {
        (Technology::CombinedGeoH2, StageKind::Performance) => &[
            "well_lifetime",
            "site_prospectivity",
            "initial_wellhead_flow",
            "gas_reservoir_size",
            "grain_size",
            "serp_rate",
            "caprock_depth",
            "borehole_depth",
            "inj_prod_distance",
            "reaction_zone_width",
            "bulk_density",
            "iron_II_conc",
        ],
        (_, StageKind::Performance) => &[
            "well_lifetime",
            "site_prospectivity",
            "initial_wellhead_flow",
            "gas_reservoir_size",
        ],
        (_, StageKind::Cost) => &[
            "test_drill_cost",
            "permit_fees",
            "acreage",
            "rights_cost",
            "completion_cost",
            "success_chance",
            "fixed_opex",
            "variable_opex",
        ],
        (_, StageKind::Finance) => &["well_lifetime"],
    };
    require_numbers(&ctx.owner(&id), &layer, required)?;
    Ok(Arc::new(GeoH2Stage {
        id,
        kind,
        stimulated: tech == Technology::CombinedGeoH2,
        configured: numeric_overrides(&layer),
    }))
}

/// One stage of a natural or combined geologic hydrogen well.
#[derive(Debug, Clone)]
pub struct GeoH2Stage {
    id: String,
    kind: StageKind,
    stimulated: bool,
    configured: Overrides,
}

impl GeoH2Stage {
    fn performance(&self, inputs: &Values) -> H2iResult<Values> {
        let conc = wellhead_h2_concentration(inputs.scalar("site_prospectivity")?)?;
        let lifetime = lifetime_years(inputs.scalar("well_lifetime")?)?;
        let reservoir = inputs.scalar("gas_reservoir_size")?;
        let initial_flow = inputs.scalar("initial_wellhead_flow")?;
        if reservoir < 0.0 || initial_flow < 0.0 {
            return Err(H2iError::domain(format!(
                "{}: reservoir size and wellhead flow must be non-negative",
                self.id
            )));
        }

        // reservoir drained evenly over the well life, capped by the initial flow
        let avg_flow = initial_flow.min(reservoir / lifetime as f64 * 1000.0 / HOURS_PER_YEAR as f64);
        let accumulated = conc / 100.0 * avg_flow;

        let mut outputs = Values::new()
            .with("wellhead_h2_conc", conc)
            .with("lifetime_wellhead_flow", avg_flow)
            .with("hydrogen_accumulated", hourly(accumulated));

        let mut total = accumulated;
        if self.stimulated {
            let deposit = Serpentinization::from_inputs(inputs)?;
            let produced =
                deposit.hydrogen_released(lifetime)? / lifetime as f64 / HOURS_PER_YEAR as f64;
            outputs.insert("hydrogen_produced", hourly(produced));
            total += produced;
        }
        outputs.insert("hydrogen", hourly(total));
        Ok(outputs)
    }

    fn cost(&self, inputs: &Values) -> H2iResult<Values> {
        let success = inputs.scalar("success_chance")?;
        if success <= 0.0 {
            return Err(H2iError::domain(format!(
                "{}: success_chance must be positive, got {success}",
                self.id
            )));
        }
        let cap_well = inputs.scalar("test_drill_cost")?
            + inputs.scalar("permit_fees")?
            + inputs.scalar("acreage")? * inputs.scalar("rights_cost")?;
        // capital per successful well
        let bare = cap_well / success * 100.0 + inputs.scalar("completion_cost")?;

        let fixed = inputs.scalar("fixed_opex")?;
        let variable = inputs.scalar("variable_opex")? * inputs.total("hydrogen")?;

        let epc = bare * (1.0 + CONTRACTING_FRACTION);
        let total_plant_cost = epc * (1.0 + CONTINGENCY_FRACTION);
        let total_overnight_cost = total_plant_cost + fixed * PREPRODUCTION_FRACTION;
        let capex = total_overnight_cost * TASC_TOC_MULTIPLIER;

        Ok(Values::new()
            .with("bare_capital_cost", bare)
            .with("CapEx", capex)
            .with("OpEx", fixed + variable)
            .with("Fixed_OpEx", fixed)
            .with("Variable_OpEx", variable))
    }

    fn finance(&self, inputs: &Values) -> H2iResult<Values> {
        let lifetime = lifetime_years(inputs.scalar("well_lifetime")?)?;
        let fcr = netl_fixed_charge_rate(lifetime, NETL_EFFECTIVE_TAX_RATE, NETL_ATWACC)?;
        let hydrogen = annual_total(inputs.series("hydrogen")?, "hydrogen")?;
        // CapEx already includes the TASC multiplier
        let lcoh = LevelizedCost::new("LCOH", hydrogen)?
            .capital("LCOH_capex", inputs.scalar("CapEx")?, fcr, 1.0)
            .annual("LCOH_fopex", inputs.scalar("Fixed_OpEx")?)
            .annual("LCOH_vopex", inputs.scalar("Variable_OpEx")?)
            .finish();
        Ok(lcoh.to_values())
    }
}

impl Stage for GeoH2Stage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn variables(&self) -> H2iResult<VariableSet> {
        let (table, extra) = match self.kind {
            StageKind::Performance if self.stimulated => (PERFORMANCE, Some(STIMULATED_PERFORMANCE)),
            StageKind::Performance => (PERFORMANCE, None),
            StageKind::Cost => (COST, None),
            StageKind::Finance => (FINANCE, None),
        };
        declare(&self.id, table, extra, NO_DEFAULTS, &self.configured)
    }

    fn compute(&self, inputs: &Values) -> H2iResult<Values> {
        match self.kind {
            StageKind::Performance => self.performance(inputs),
            StageKind::Cost => self.cost(inputs),
            StageKind::Finance => self.finance(inputs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2i_core::chain::SignalPool;
    use h2i_core::config::{ConfigMap, ModelInputs};
    use h2i_core::{ChainOutputs, StageChain};
    use serde_json::json;

    fn inputs(prospectivity: f64) -> ModelInputs {
        serde_json::from_value(json!({
            "shared_parameters": {"well_lifetime": 30},
            "performance_parameters": {
                "site_prospectivity": prospectivity,
                "initial_wellhead_flow": 4000.0,
                "gas_reservoir_size": 1.0e6,
                "grain_size": 0.01,
                "serp_rate": 1.0e-11,
                "caprock_depth": 500.0,
                "borehole_depth": 1500.0,
                "inj_prod_distance": 100.0,
                "reaction_zone_width": 10.0,
                "bulk_density": 2800.0,
                "iron_II_conc": 3.0
            },
            "cost_parameters": {
                "test_drill_cost": 5.0e5,
                "permit_fees": 1.0e4,
                "acreage": 1000.0,
                "rights_cost": 100.0,
                "completion_cost": 1.0e6,
                "success_chance": 25.0,
                "fixed_opex": 2.5e5,
                "variable_opex": 0.01
            }
        }))
        .unwrap()
    }

    fn run(tech: Technology, inputs: &ModelInputs) -> H2iResult<ChainOutputs> {
        let plant = ConfigMap::new();
        let ctx = StageContext::new("geoh2", &plant, inputs);
        StageChain::new(
            "geoh2",
            build(tech, StageKind::Performance, &ctx)?,
            build(tech, StageKind::Cost, &ctx)?,
            build(tech, StageKind::Finance, &ctx)?,
        )?
        .run(&SignalPool::new())
    }

    #[test]
    fn wellhead_concentration_at_full_prospectivity() {
        let conc = wellhead_h2_concentration(1.0).unwrap();
        assert!((conc - 58.92981751).abs() < 1e-12);
        assert!(matches!(
            wellhead_h2_concentration(-0.5),
            Err(H2iError::Domain(_))
        ));
    }

    #[test]
    fn natural_well_chain() {
        let outputs = run(Technology::NaturalGeoH2, &inputs(1.0)).unwrap();
        // 1e6 t over 30 years is ~3805 kg/h, below the initial flow
        let avg = 1.0e6 / 30.0 * 1000.0 / 8760.0;
        assert!((outputs.scalar("lifetime_wellhead_flow").unwrap() - avg).abs() < 1e-9);
        let hydrogen = outputs.get("hydrogen").unwrap().value.as_series().unwrap();
        assert!((hydrogen[0] - 0.5892981751 * avg).abs() < 1e-9);
        assert!(outputs.get("hydrogen_produced").is_none());

        let bare = (5.0e5 + 1.0e4 + 1000.0 * 100.0) / 25.0 * 100.0 + 1.0e6;
        assert!((outputs.scalar("bare_capital_cost").unwrap() - bare).abs() < 1e-6);
        let capex = (bare * 1.2 * 1.5 + 2.5e5 * 0.5) * 1.1;
        assert!((outputs.scalar("CapEx").unwrap() - capex).abs() < 1e-6);

        let lcoh = outputs.scalar("LCOH").unwrap();
        let parts = outputs.scalar("LCOH_capex").unwrap()
            + outputs.scalar("LCOH_fopex").unwrap()
            + outputs.scalar("LCOH_vopex").unwrap();
        assert!((lcoh - parts).abs() < 1e-12);
        // variable opex is charged per kg
        assert!((outputs.scalar("LCOH_vopex").unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn combined_well_adds_stimulated_hydrogen() {
        let natural = run(Technology::NaturalGeoH2, &inputs(1.0)).unwrap();
        let combined = run(Technology::CombinedGeoH2, &inputs(1.0)).unwrap();

        let deposit = Serpentinization {
            grain_size: 0.01,
            serp_rate: 1.0e-11,
            caprock_depth: 500.0,
            borehole_depth: 1500.0,
            inj_prod_distance: 100.0,
            reaction_zone_width: 10.0,
            bulk_density: 2800.0,
            iron_ii_conc: 3.0,
        };
        let produced = deposit.hydrogen_released(30).unwrap() / 30.0 / 8760.0;
        assert!(produced > 0.0);

        let h_nat = natural.get("hydrogen").unwrap().value.as_series().unwrap()[0];
        let h_comb = combined.get("hydrogen").unwrap().value.as_series().unwrap()[0];
        assert!((h_comb - h_nat - produced).abs() < 1e-9);
        assert!(combined.scalar("LCOH").unwrap() < natural.scalar("LCOH").unwrap());
    }

    #[test]
    fn fully_reacted_grains_release_everything() {
        let deposit = Serpentinization {
            grain_size: 0.001,
            serp_rate: 1.0,
            caprock_depth: 0.0,
            borehole_depth: 1.0,
            inj_prod_distance: 1.0,
            reaction_zone_width: 1.0,
            bulk_density: 1000.0,
            iron_ii_conc: 100.0,
        };
        // 1 m3 of rock at 1000 kg/m3, all iron
        let released = deposit.hydrogen_released(1).unwrap();
        assert!((released - 1000.0 / 55.8).abs() < 1e-6);
    }

    #[test]
    fn invalid_physical_inputs() {
        let mut bad = inputs(1.0);
        bad.shared_parameters.insert("well_lifetime".into(), json!(0));
        assert!(matches!(
            run(Technology::NaturalGeoH2, &bad),
            Err(H2iError::Domain(_))
        ));

        let mut bad = inputs(1.0);
        bad.cost_parameters.insert("success_chance".into(), json!(0.0));
        assert!(matches!(
            run(Technology::NaturalGeoH2, &bad),
            Err(H2iError::Domain(_))
        ));

        let mut missing = inputs(1.0);
        missing.cost_parameters.remove("acreage");
        assert!(matches!(
            run(Technology::NaturalGeoH2, &missing),
            Err(H2iError::Configuration(_))
        ));
    }
}
