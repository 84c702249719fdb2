use h2i_core::config::{ConfigMap, ModelInputs};
use h2i_core::stage::StageKind;
use h2i_core::topology::Connection;
use h2i_core::{H2iError, H2iResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A whole plant: technologies plus the variables they exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Plant-wide parameters, the lowest configuration layer of every stage.
    #[serde(default)]
    pub plant: PlantSettings,
    pub technologies: BTreeMap<String, TechnologyConfig>,
    #[serde(default)]
    pub technology_interconnections: Vec<Interconnection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantSettings {
    #[serde(default = "default_cost_year")]
    pub cost_year: i32,
    #[serde(default = "default_plant_life")]
    pub plant_life: u32,
    /// Any further plant-wide parameter, e.g. a default `capacity_factor`.
    #[serde(flatten)]
    pub parameters: ConfigMap,
}

fn default_cost_year() -> i32 {
    2022
}

fn default_plant_life() -> u32 {
    30
}

impl Default for PlantSettings {
    fn default() -> Self {
        Self {
            cost_year: default_cost_year(),
            plant_life: default_plant_life(),
            parameters: ConfigMap::new(),
        }
    }
}

impl PlantSettings {
    /// The plant layer as an untyped config map.
    pub fn as_layer(&self) -> ConfigMap {
        let mut layer = self.parameters.clone();
        layer.insert("cost_year".into(), self.cost_year.into());
        layer.insert("plant_life".into(), self.plant_life.into());
        layer
    }
}

/// Registry key of one stage implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub model: String,
}

impl ModelRef {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

/// One technology of the plant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyConfig {
    pub performance_model: ModelRef,
    pub cost_model: ModelRef,
    #[serde(alias = "finance_model")]
    pub financial_model: ModelRef,
    #[serde(default)]
    pub model_inputs: ModelInputs,
}

impl TechnologyConfig {
    pub fn model(&self, kind: StageKind) -> &str {
        match kind {
            StageKind::Performance => &self.performance_model.model,
            StageKind::Cost => &self.cost_model.model,
            StageKind::Finance => &self.financial_model.model,
        }
    }
}

/// `[source, dest, variable]` or `[source, dest, source_var, dest_var]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Interconnection(pub Connection);

impl TryFrom<Vec<String>> for Interconnection {
    type Error = String;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(source), Some(dest), Some(var), None, None) => {
                Ok(Interconnection(Connection::same_name(source, dest, var)))
            }
            (Some(source), Some(dest), Some(source_var), Some(dest_var), None) => {
                Ok(Interconnection(Connection {
                    source,
                    dest,
                    source_var,
                    dest_var,
                }))
            }
            _ => Err("interconnection must be [source, dest, variable] or \
                      [source, dest, source_variable, dest_variable]"
                .to_string()),
        }
    }
}

impl From<Interconnection> for Vec<String> {
    fn from(value: Interconnection) -> Self {
        let conn = value.0;
        if conn.source_var == conn.dest_var {
            vec![conn.source, conn.dest, conn.source_var]
        } else {
            vec![conn.source, conn.dest, conn.source_var, conn.dest_var]
        }
    }
}

impl PlantConfig {
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.technology_interconnections.iter().map(|ic| &ic.0)
    }

    /// Structural checks that need no registry: names, references, duplicates.
    pub fn validate(&self) -> H2iResult<()> {
        if self.name.trim().is_empty() {
            return Err(H2iError::config("plant name cannot be empty"));
        }
        if self.technologies.is_empty() {
            return Err(H2iError::config(format!(
                "plant '{}' declares no technologies",
                self.name
            )));
        }
        for (name, tech) in &self.technologies {
            if name.trim().is_empty() {
                return Err(H2iError::config("technology name cannot be empty"));
            }
            for kind in StageKind::ALL {
                if tech.model(kind).trim().is_empty() {
                    return Err(H2iError::config(format!(
                        "technology '{name}' has an empty {kind} model key"
                    )));
                }
            }
        }
        let mut seen = HashSet::new();
        for conn in self.connections() {
            for end in [&conn.source, &conn.dest] {
                if !self.technologies.contains_key(end) {
                    return Err(H2iError::config(format!(
                        "interconnection references unknown technology '{end}'"
                    )));
                }
            }
            if !seen.insert((&conn.dest, &conn.dest_var)) {
                return Err(H2iError::config(format!(
                    "'{}' of technology '{}' is fed by more than one interconnection",
                    conn.dest_var, conn.dest
                )));
            }
        }
        Ok(())
    }
}
