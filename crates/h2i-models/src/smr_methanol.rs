//! LNG-fed steam methane reforming methanol plant.
//!
//! A lumped model: methanol output follows from the LNG supply, capital cost
//! scales linearly with nameplate capacity and the only operating cost is
//! the LNG purchase.

use crate::registry::{StageContext, Technology};
use crate::tables::{declare, hourly, Defaults, NO_DEFAULTS};
use h2i_core::config::{numeric_overrides, require_numbers};
use h2i_core::finance::{annual_total, LevelizedCost};
use h2i_core::value::{Overrides, Values};
use h2i_core::variable::{VariableSet, VariableSpec, HOURS_PER_YEAR};
use h2i_core::{H2iError, H2iResult, Stage, StageKind};
use std::sync::Arc;

const PERFORMANCE: &[VariableSpec] = &[
    VariableSpec::input("lng", 1, Some("kg/year")),
    VariableSpec::input("lng_consume_ratio", 1, Some("kg/kg")),
    VariableSpec::output("methanol", HOURS_PER_YEAR, Some("kg/h")),
];

const COST: &[VariableSpec] = &[
    VariableSpec::input("plant_capacity_kgpy", 1, Some("kg/year")),
    VariableSpec::input("capex_factor", 1, Some("USD/(kg/year)")),
    VariableSpec::input("lng", 1, Some("kg/year")),
    VariableSpec::input("lng_cost", 1, Some("USD/kg")),
    VariableSpec::output("CapEx", 1, Some("USD")),
    VariableSpec::output("OpEx", 1, Some("USD/year")),
    VariableSpec::output("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::output("Variable_OpEx", 1, Some("USD/year")),
];

const FINANCE: &[VariableSpec] = &[
    VariableSpec::input("CapEx", 1, Some("USD")),
    VariableSpec::input("Fixed_OpEx", 1, Some("USD/year")),
    VariableSpec::input("Variable_OpEx", 1, Some("USD/year")),
    VariableSpec::input("fixed_charge_rate", 1, None),
    VariableSpec::input("tasc_toc_multiplier", 1, None),
    VariableSpec::input("methanol", HOURS_PER_YEAR, Some("kg/h")),
    VariableSpec::output("LCOM", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_capex", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_fopex", 1, Some("USD/kg")),
    VariableSpec::output("LCOM_vopex", 1, Some("USD/kg")),
];

const COST_DEFAULTS: Defaults = &[("capex_factor", 1.0e3)];
const FINANCE_DEFAULTS: Defaults = &[("fixed_charge_rate", 0.07), ("tasc_toc_multiplier", 1.0)];

pub(crate) fn build(kind: StageKind, ctx: &StageContext<'_>) -> H2iResult<Arc<dyn Stage>> {
    let id = Technology::SmrMethanol.model_key(kind);
    let layer = ctx.parameters(kind);
    let required: &[&str] = match kind {
        StageKind::Performance => &["lng", "lng_consume_ratio"],
        StageKind::Cost => &["plant_capacity_kgpy", "lng", "lng_cost"],
        StageKind::Finance => &[],
    };
    require_numbers(&ctx.owner(&id), &layer, required)?;
    Ok(Arc::new(SmrMethanolStage {
        id,
        kind,
        configured: numeric_overrides(&layer),
    }))
}

#[derive(Debug, Clone)]
pub struct SmrMethanolStage {
    id: String,
    kind: StageKind,
    configured: Overrides,
}

impl Stage for SmrMethanolStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn variables(&self) -> H2iResult<VariableSet> {
        let (table, defaults) = match self.kind {
            StageKind::Performance => (PERFORMANCE, NO_DEFAULTS),
            StageKind::Cost => (COST, COST_DEFAULTS),
            StageKind::Finance => (FINANCE, FINANCE_DEFAULTS),
        };
        declare(&self.id, table, None, defaults, &self.configured)
    }

    fn compute(&self, inputs: &Values) -> H2iResult<Values> {
        match self.kind {
            StageKind::Performance => {
                let ratio = inputs.scalar("lng_consume_ratio")?;
                if ratio <= 0.0 {
                    return Err(H2iError::domain(format!(
                        "{}: lng_consume_ratio must be positive, got {ratio}",
                        self.id
                    )));
                }
                let annual = inputs.scalar("lng")? / ratio;
                Ok(Values::new().with("methanol", hourly(annual / HOURS_PER_YEAR as f64)))
            }
            StageKind::Cost => {
                let lng_cost = inputs.scalar("lng")? * inputs.scalar("lng_cost")?;
                Ok(Values::new()
                    .with(
                        "CapEx",
                        inputs.scalar("plant_capacity_kgpy")? * inputs.scalar("capex_factor")?,
                    )
                    .with("OpEx", lng_cost)
                    .with("Fixed_OpEx", 0.0)
                    .with("Variable_OpEx", lng_cost))
            }
            StageKind::Finance => {
                let methanol = annual_total(inputs.series("methanol")?, "methanol")?;
                let lcom = LevelizedCost::new("LCOM", methanol)?
                    .capital(
                        "LCOM_capex",
                        inputs.scalar("CapEx")?,
                        inputs.scalar("fixed_charge_rate")?,
                        inputs.scalar("tasc_toc_multiplier")?,
                    )
                    .annual("LCOM_fopex", inputs.scalar("Fixed_OpEx")?)
                    .annual("LCOM_vopex", inputs.scalar("Variable_OpEx")?)
                    .finish();
                Ok(lcom.to_values())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2i_core::chain::SignalPool;
    use h2i_core::config::{ConfigMap, ModelInputs};
    use h2i_core::StageChain;
    use serde_json::json;

    fn inputs(lng: f64) -> ModelInputs {
        serde_json::from_value(json!({
            "shared_parameters": {
                "lng": lng,
                "lng_consume_ratio": 1.61561859,
                "plant_capacity_kgpy": 1.0e6
            },
            "cost_parameters": {"lng_cost": 0.25}
        }))
        .unwrap()
    }

    fn run(inputs: &ModelInputs) -> H2iResult<h2i_core::ChainOutputs> {
        let plant = ConfigMap::new();
        let ctx = StageContext::new("meoh", &plant, inputs);
        let chain = StageChain::new(
            "meoh",
            build(StageKind::Performance, &ctx)?,
            build(StageKind::Cost, &ctx)?,
            build(StageKind::Finance, &ctx)?,
        )?;
        chain.run(&SignalPool::new())
    }

    #[test]
    fn hourly_methanol_from_lng() {
        let outputs = run(&inputs(1_615_618.59)).unwrap();
        let methanol = outputs.get("methanol").unwrap().value.as_series().unwrap();
        let expected = 1_615_618.59 / 1.61561859 / 8760.0;
        assert!((methanol[0] - expected).abs() < 1e-9);
        assert!((methanol[8759] - 114.08).abs() < 0.1);
        assert!(methanol.iter().all(|v| (*v - methanol[0]).abs() < 1e-12));
    }

    #[test]
    fn lcom_from_capex_and_lng() {
        let outputs = run(&inputs(1_615_618.59)).unwrap();
        let annual = 1_615_618.59 / 1.61561859;
        let expected = (1.0e6 * 1.0e3 * 0.07 + 1_615_618.59 * 0.25) / annual;
        assert!((outputs.scalar("LCOM").unwrap() - expected).abs() < 1e-6);
        assert!(outputs.scalar("LCOM_fopex").unwrap().abs() < 1e-12);
    }

    #[test]
    fn no_lng_means_no_methanol_to_levelize() {
        assert!(matches!(run(&inputs(0.0)), Err(H2iError::Domain(_))));
    }
}
