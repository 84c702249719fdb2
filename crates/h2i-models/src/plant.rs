//! Plant assembly: one stage chain per technology, evaluated in topological
//! order with interconnected variables forwarded between chains.

use crate::registry::build_chain;
use h2i_config::PlantConfig;
use h2i_core::chain::{ChainOutputs, SignalPool};
use h2i_core::topology::PlantGraph;
use h2i_core::value::Value;
use h2i_core::{Diagnostics, H2iError, H2iResult, StageChain};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A validated, ready-to-run plant.
#[derive(Debug)]
pub struct PlantModel {
    name: String,
    chains: BTreeMap<String, StageChain>,
    graph: PlantGraph,
    order: Vec<String>,
    diagnostics: Diagnostics,
}

/// Plant-wide cost totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlantTotals {
    pub total_capex: f64,
    pub total_opex: f64,
}

/// Outcome of one plant run.
#[derive(Debug, Clone, Serialize)]
pub struct PlantResults {
    pub plant: String,
    pub order: Vec<String>,
    pub technologies: BTreeMap<String, ChainOutputs>,
    pub totals: PlantTotals,
    /// Every levelized cost output, keyed `"<technology>.<LCO*>"`.
    pub levelized: BTreeMap<String, f64>,
    pub diagnostics: Diagnostics,
}

impl PlantResults {
    pub fn levelized_cost(&self, technology: &str, name: &str) -> H2iResult<f64> {
        self.levelized
            .get(&format!("{technology}.{name}"))
            .copied()
            .ok_or_else(|| H2iError::lookup(format!("no levelized cost '{name}' for technology '{technology}'")))
    }
}

impl PlantModel {
    pub fn build(config: &PlantConfig) -> H2iResult<Self> {
        config.validate()?;
        let plant_layer = config.plant.as_layer();

        let mut chains = BTreeMap::new();
        for (name, tech) in &config.technologies {
            let chain = build_chain(name, tech, &plant_layer)?;
            debug!(
                "Built chain '{}' ({}, {}, {})",
                name, tech.performance_model.model, tech.cost_model.model, tech.financial_model.model
            );
            chains.insert(name.clone(), chain);
        }

        let mut graph = PlantGraph::new(config.technologies.keys().cloned())?;
        for conn in config.connections() {
            graph.connect(conn.clone())?;
        }
        let order = graph.evaluation_order()?;

        let declared = declared_names(&chains)?;
        let mut diagnostics = check_interconnections(config, &declared);
        diagnostics.merge(check_plant(config, &chains, &declared)?);
        diagnostics.merge(check_totals(&declared));
        for issue in diagnostics.warnings() {
            warn!("{}", issue);
        }
        if diagnostics.has_errors() {
            let messages: Vec<String> = diagnostics.errors().map(|issue| issue.to_string()).collect();
            return Err(H2iError::config(format!(
                "plant '{}' has {} invalid interconnection(s): {}",
                config.name,
                diagnostics.error_count(),
                messages.join("; ")
            )));
        }

        info!(
            "Built plant '{}' with {} technologies and {} interconnections",
            config.name,
            chains.len(),
            graph.edge_count()
        );
        Ok(Self {
            name: config.name.clone(),
            chains,
            graph,
            order,
            diagnostics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluation_order(&self) -> &[String] {
        &self.order
    }

    pub fn chain(&self, technology: &str) -> Option<&StageChain> {
        self.chains.get(technology)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn render_dot(&self) -> String {
        self.graph.render_dot()
    }

    /// Evaluate every technology once, upstream first.
    pub fn run(&self) -> H2iResult<PlantResults> {
        let start = Instant::now();
        let mut outputs: BTreeMap<String, ChainOutputs> = BTreeMap::new();

        for tech in &self.order {
            let chain = self
                .chains
                .get(tech)
                .ok_or_else(|| H2iError::lookup(format!("no chain for technology '{tech}'")))?;

            let mut external = SignalPool::new();
            for conn in self.graph.incoming(tech)? {
                let signal = outputs
                    .get(&conn.source)
                    .and_then(|upstream| upstream.get(&conn.source_var))
                    .ok_or_else(|| {
                        H2iError::config(format!(
                            "'{}' of technology '{}' was not produced before '{}' ran",
                            conn.source_var, conn.source, tech
                        ))
                    })?;
                external.insert(conn.dest_var.clone(), signal.clone());
            }

            let result = chain.run(&external)?;
            debug!("Ran '{}' with {} forwarded inputs", tech, external.len());
            outputs.insert(tech.clone(), result);
        }

        let mut totals = PlantTotals::default();
        let mut levelized = BTreeMap::new();
        for (tech, result) in &outputs {
            // technologies without cost outputs were flagged when the plant was built
            if result.get("CapEx").is_some() {
                totals.total_capex += result.scalar("CapEx")?;
            }
            if result.get("OpEx").is_some() {
                totals.total_opex += result.scalar("OpEx")?;
            }
            for (name, signal) in result.promoted.iter().filter(|(name, _)| name.starts_with("LCO")) {
                if let Some(value) = signal.value.as_scalar() {
                    levelized.insert(format!("{tech}.{name}"), value);
                }
            }
        }

        info!(
            "Ran plant '{}' ({} technologies) in {:?}",
            self.name,
            outputs.len(),
            start.elapsed()
        );
        Ok(PlantResults {
            plant: self.name.clone(),
            order: self.order.clone(),
            technologies: outputs,
            totals,
            levelized,
            diagnostics: self.diagnostics.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct DeclaredNames {
    inputs: BTreeSet<&'static str>,
    outputs: BTreeSet<&'static str>,
    /// Declared variables with their configured values.
    values: BTreeMap<&'static str, Value>,
}

fn declared_names(chains: &BTreeMap<String, StageChain>) -> H2iResult<BTreeMap<String, DeclaredNames>> {
    let mut declared = BTreeMap::new();
    for (name, chain) in chains {
        let mut names = DeclaredNames::default();
        for set in chain.declarations()? {
            for var in set.inputs() {
                names.inputs.insert(var.spec.name);
                names.values.insert(var.spec.name, var.value.clone());
            }
            for var in set.outputs() {
                names.outputs.insert(var.spec.name);
            }
        }
        declared.insert(name.clone(), names);
    }
    Ok(declared)
}

/// Every forwarded variable must be produced upstream and consumed, but not
/// produced, downstream.
fn check_interconnections(config: &PlantConfig, declared: &BTreeMap<String, DeclaredNames>) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    for conn in config.connections() {
        // unknown technologies were rejected by `PlantConfig::validate`
        let (Some(source), Some(dest)) = (declared.get(&conn.source), declared.get(&conn.dest)) else {
            continue;
        };
        if !source.outputs.contains(conn.source_var.as_str()) {
            diagnostics.add_error_with_entity(
                "interconnection",
                &format!(
                    "technology '{}' has no output '{}' to forward to '{}'",
                    conn.source, conn.source_var, conn.dest
                ),
                &conn.source,
            );
        }
        if !dest.inputs.contains(conn.dest_var.as_str()) {
            diagnostics.add_error_with_entity(
                "interconnection",
                &format!(
                    "technology '{}' has no input '{}' to receive from '{}'",
                    conn.dest, conn.dest_var, conn.source
                ),
                &conn.dest,
            );
        } else if dest.outputs.contains(conn.dest_var.as_str()) {
            diagnostics.add_error_with_entity(
                "interconnection",
                &format!(
                    "'{}' of technology '{}' is produced by its own stages and cannot also come from '{}'",
                    conn.dest_var, conn.dest, conn.source
                ),
                &conn.dest,
            );
        }
    }
    diagnostics
}

/// Technologies that declare no CapEx or OpEx are left out of plant totals.
fn check_totals(declared: &BTreeMap<String, DeclaredNames>) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for (name, names) in declared {
        for output in ["CapEx", "OpEx"] {
            if !names.outputs.contains(output) {
                diagnostics.add_warning_with_entity(
                    "totals",
                    &format!("technology '{name}' declares no {output} output and is left out of plant totals"),
                    name,
                );
            }
        }
    }
    diagnostics
}

/// Physical-range and unused-key checks that do not stop the build.
fn check_plant(
    config: &PlantConfig,
    chains: &BTreeMap<String, StageChain>,
    declared: &BTreeMap<String, DeclaredNames>,
) -> H2iResult<Diagnostics> {
    let mut diagnostics = Diagnostics::new();

    for (name, tech) in &config.technologies {
        let names = declared
            .get(name)
            .ok_or_else(|| H2iError::lookup(format!("no declarations for technology '{name}'")))?;

        if let Some(cf) = names.values.get("capacity_factor").and_then(Value::as_scalar) {
            if !(0.0..=1.0).contains(&cf) {
                diagnostics.add_warning_with_entity(
                    "physical",
                    &format!("capacity_factor {cf} is outside [0, 1]"),
                    name,
                );
            }
        }

        let consumed: BTreeSet<&str> = chains
            .get(name)
            .map(|chain| {
                chain
                    .stages()
                    .iter()
                    .flat_map(|stage| stage.config_keys().iter().copied())
                    .collect()
            })
            .unwrap_or_default();
        let unused: BTreeSet<&str> = tech
            .model_inputs
            .keys()
            .filter(|key| !names.inputs.contains(key) && !consumed.contains(key))
            .collect();
        for key in unused {
            diagnostics.add_warning_with_entity(
                "config",
                &format!("model input '{key}' is not used by any stage"),
                name,
            );
        }
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2i_core::variable::VariableSpec;
    use h2i_core::{Overrides, StageKind, TemplateStage};
    use std::sync::Arc;

    fn config(yaml: &str) -> PlantConfig {
        h2i_config::parse_plant_config(yaml).unwrap()
    }

    const GEOH2_TO_AMMONIA: &str = r#"
name: geoh2_ammonia
plant:
  cost_year: 2022
technologies:
  well:
    performance_model: {model: natural_geoh2_performance}
    cost_model: {model: natural_geoh2_cost}
    financial_model: {model: natural_geoh2_financial}
    model_inputs:
      shared_parameters:
        well_lifetime: 30
      performance_parameters:
        site_prospectivity: 0.7
        initial_wellhead_flow: 4000.0
        gas_reservoir_size: 1.0e6
      cost_parameters:
        test_drill_cost: 5.0e5
        permit_fees: 1.0e4
        acreage: 1000.0
        rights_cost: 100.0
        completion_cost: 1.0e6
        success_chance: 25.0
        fixed_opex: 2.5e5
        variable_opex: 0.01
  nh3:
    performance_model: {model: ammonia_performance}
    cost_model: {model: ammonia_cost}
    financial_model: {model: ammonia_financial}
    model_inputs:
      shared_parameters:
        plant_capacity_kgpy: 3.65e7
        favourite_colour: 3
      performance_parameters:
        capacity_factor: 1.2
        hydrogen_consume_ratio: 0.197
        nitrogen_consume_ratio: 0.82
        electricity_consume_ratio: 0.12
      cost_parameters:
        capex_coefficient: 1.0e6
        capex_exponent: 0.6
        fixed_opex_fraction: 0.03
technology_interconnections:
  - [well, nh3, LCOH, hydrogen_price]
"#;

    #[test]
    fn forwards_lcoh_downstream() {
        let plant = PlantModel::build(&config(GEOH2_TO_AMMONIA)).unwrap();
        assert_eq!(plant.evaluation_order(), ["well", "nh3"]);
        let results = plant.run().unwrap();

        let lcoh = results.levelized_cost("well", "LCOH").unwrap();
        let lcoa_h2 = results.levelized_cost("nh3", "LCOA_hydrogen").unwrap();
        assert!((lcoa_h2 - 0.197 * lcoh).abs() < 1e-9);

        let capex = results.technologies["well"].scalar("CapEx").unwrap()
            + results.technologies["nh3"].scalar("CapEx").unwrap();
        assert!((results.totals.total_capex - capex).abs() < 1e-6);
        assert!(matches!(
            results.levelized_cost("nh3", "LCOH"),
            Err(H2iError::Lookup(_))
        ));
    }

    #[test]
    fn diagnostics_flag_range_and_unused_keys() {
        let plant = PlantModel::build(&config(GEOH2_TO_AMMONIA)).unwrap();
        let diagnostics = plant.diagnostics();
        assert_eq!(diagnostics.warning_count(), 2, "{}", diagnostics.summary());
        let physical: Vec<_> = diagnostics.issues_by_category("physical").collect();
        assert_eq!(physical.len(), 1);
        assert_eq!(physical[0].entity.as_deref(), Some("nh3"));
        let unused: Vec<_> = diagnostics.issues_by_category("config").collect();
        assert!(unused[0].message.contains("favourite_colour"));
    }

    #[test]
    fn unknown_variable_in_interconnection() {
        let yaml = GEOH2_TO_AMMONIA.replace("[well, nh3, LCOH, hydrogen_price]", "[well, nh3, LCOH, argon_price]");
        let err = PlantModel::build(&config(&yaml)).unwrap_err();
        assert!(matches!(err, H2iError::Configuration(_)));
        assert!(err.to_string().contains("argon_price"));
    }

    #[test]
    fn every_bad_interconnection_is_reported() {
        let yaml = GEOH2_TO_AMMONIA.replace(
            "  - [well, nh3, LCOH, hydrogen_price]",
            "  - [well, nh3, LCOH, hydrogen_price]\n  - [well, nh3, LCOX, nitrogen_price]\n  - [well, nh3, hydrogen, ammonia]",
        );
        let Err(err) = PlantModel::build(&config(&yaml)) else {
            panic!("bad interconnections accepted");
        };
        assert!(matches!(err, H2iError::Configuration(_)));
        let message = err.to_string();
        assert!(message.contains("2 invalid interconnection(s)"), "{message}");
        assert!(message.contains("[error:interconnection]"));
        assert!(message.contains("no output 'LCOX'"));
        assert!(message.contains("'ammonia' of technology 'nh3' is produced by its own stages"));
    }

    const BARE_PERFORMANCE: &[VariableSpec] = &[VariableSpec::output("flow", 1, Some("kg/year"))];
    const BARE_COST: &[VariableSpec] = &[
        VariableSpec::input("flow", 1, Some("kg/year")),
        VariableSpec::output("OpEx", 1, Some("USD/year")),
    ];
    const BARE_FINANCE: &[VariableSpec] = &[
        VariableSpec::input("OpEx", 1, Some("USD/year")),
        VariableSpec::output("LCOX", 1, Some("USD/kg")),
    ];

    #[test]
    fn technology_without_capex_is_flagged_for_totals() {
        let chain = StageChain::new(
            "bare",
            Arc::new(TemplateStage::new("bare_performance", StageKind::Performance, BARE_PERFORMANCE, Overrides::new())),
            Arc::new(TemplateStage::new("bare_cost", StageKind::Cost, BARE_COST, Overrides::new())),
            Arc::new(TemplateStage::new("bare_finance", StageKind::Finance, BARE_FINANCE, Overrides::new())),
        )
        .unwrap();
        let chains = BTreeMap::from([("bare".to_string(), chain)]);
        let diagnostics = check_totals(&declared_names(&chains).unwrap());
        assert_eq!(diagnostics.warning_count(), 1);
        let issue = diagnostics.issues_by_category("totals").next().unwrap();
        assert!(issue.message.contains("CapEx"));
        assert_eq!(issue.entity.as_deref(), Some("bare"));
    }

    #[test]
    fn dot_lists_technologies_and_edges() {
        let plant = PlantModel::build(&config(GEOH2_TO_AMMONIA)).unwrap();
        let dot = plant.render_dot();
        assert!(dot.starts_with("digraph h2i_plant {"));
        assert!(dot.contains("label=\"well\""));
        assert!(dot.contains("LCOH -> hydrogen_price"));
    }
}
