//! Static registry of technology stage models.
//!
//! Model keys follow `<technology>_<performance|cost|financial>`; the
//! registry is built once per process and never mutated.

use crate::{ammonia, geoh2, iron, methanol, smr_methanol};
use h2i_config::TechnologyConfig;
use h2i_core::config::{merge_layers, ConfigMap, ModelInputs};
use h2i_core::{H2iError, H2iResult, Stage, StageChain, StageKind};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported technology families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technology {
    Methanol,
    SmrMethanol,
    NaturalGeoH2,
    CombinedGeoH2,
    Ammonia,
    Iron,
}

impl Technology {
    pub const ALL: [Technology; 6] = [
        Technology::Methanol,
        Technology::SmrMethanol,
        Technology::NaturalGeoH2,
        Technology::CombinedGeoH2,
        Technology::Ammonia,
        Technology::Iron,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Methanol => "methanol",
            Technology::SmrMethanol => "smr_methanol",
            Technology::NaturalGeoH2 => "natural_geoh2",
            Technology::CombinedGeoH2 => "combined_geoh2",
            Technology::Ammonia => "ammonia",
            Technology::Iron => "iron",
        }
    }

    pub fn available() -> &'static [&'static str] {
        &[
            "methanol",
            "smr_methanol",
            "natural_geoh2",
            "combined_geoh2",
            "ammonia",
            "iron",
        ]
    }

    /// Registry key of this technology's `kind` stage.
    pub fn model_key(&self, kind: StageKind) -> String {
        let suffix = match kind {
            StageKind::Performance => "performance",
            StageKind::Cost => "cost",
            StageKind::Finance => "financial",
        };
        format!("{}_{}", self.as_str(), suffix)
    }

    fn build(self, kind: StageKind, ctx: &StageContext<'_>) -> H2iResult<Arc<dyn Stage>> {
        match self {
            Technology::Methanol => methanol::build(kind, ctx),
            Technology::SmrMethanol => smr_methanol::build(kind, ctx),
            Technology::NaturalGeoH2 | Technology::CombinedGeoH2 => geoh2::build(self, kind, ctx),
            Technology::Ammonia => ammonia::build(kind, ctx),
            Technology::Iron => iron::build(kind, ctx),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = H2iError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.to_ascii_lowercase();
        Technology::ALL
            .into_iter()
            .find(|tech| tech.as_str() == normalized)
            .ok_or_else(|| {
                H2iError::config(format!(
                    "unknown technology '{}'; supported values: {}",
                    input,
                    Technology::available().join(", ")
                ))
            })
    }
}

/// Everything a stage constructor may read.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// Plant-level name of the technology, e.g. `"methanol_plant"`.
    pub technology: &'a str,
    /// Plant-wide parameters, the lowest configuration layer.
    pub plant: &'a ConfigMap,
    pub model_inputs: &'a ModelInputs,
}

impl<'a> StageContext<'a> {
    pub fn new(technology: &'a str, plant: &'a ConfigMap, model_inputs: &'a ModelInputs) -> Self {
        Self {
            technology,
            plant,
            model_inputs,
        }
    }

    /// Plant layer, then shared parameters, then the `kind` block.
    pub fn parameters(&self, kind: StageKind) -> ConfigMap {
        merge_layers(&[
            self.plant,
            &self.model_inputs.shared_parameters,
            self.model_inputs.stage_parameters(kind),
        ])
    }

    /// Prefix for messages about stage `id` of this technology.
    pub fn owner(&self, id: &str) -> String {
        format!("{}/{}", self.technology, id)
    }
}

static REGISTRY: Lazy<BTreeMap<String, (Technology, StageKind)>> = Lazy::new(|| {
    let mut models = BTreeMap::new();
    for tech in Technology::ALL {
        for kind in StageKind::ALL {
            models.insert(tech.model_key(kind), (tech, kind));
        }
    }
    models
});

/// Every registered model key, sorted.
pub fn supported_models() -> Vec<&'static str> {
    REGISTRY.keys().map(String::as_str).collect()
}

/// Technology and stage kind behind a model key.
pub fn lookup(key: &str) -> H2iResult<(Technology, StageKind)> {
    REGISTRY.get(key).copied().ok_or_else(|| {
        H2iError::config(format!(
            "unknown model '{key}'; supported models: {}",
            supported_models().join(", ")
        ))
    })
}

/// Construct the stage registered under `key`.
pub fn build_stage(key: &str, ctx: &StageContext<'_>) -> H2iResult<Arc<dyn Stage>> {
    let (tech, kind) = lookup(key).map_err(|err| match err {
        H2iError::Configuration(msg) => H2iError::config(format!("{}: {msg}", ctx.technology)),
        other => other,
    })?;
    tech.build(kind, ctx)
}

/// Build the three-stage chain of one configured technology.
pub fn build_chain(name: &str, config: &TechnologyConfig, plant: &ConfigMap) -> H2iResult<StageChain> {
    let ctx = StageContext::new(name, plant, &config.model_inputs);
    let performance = build_stage(config.model(StageKind::Performance), &ctx)?;
    let cost = build_stage(config.model(StageKind::Cost), &ctx)?;
    let finance = build_stage(config.model(StageKind::Finance), &ctx)?;
    StageChain::new(name, performance, cost, finance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technology_parsing_supports_all_variants() {
        for tech in Technology::ALL {
            assert_eq!(tech.as_str().parse::<Technology>().unwrap(), tech);
        }
        assert_eq!(Technology::available().len(), Technology::ALL.len());
        assert!(matches!(
            "fusion".parse::<Technology>(),
            Err(H2iError::Configuration(_))
        ));
    }

    #[test]
    fn registry_keys() {
        let models = supported_models();
        assert_eq!(models.len(), 18);
        assert!(models.contains(&"methanol_performance"));
        assert!(models.contains(&"natural_geoh2_financial"));
        assert!(models.contains(&"smr_methanol_cost"));
        let mut sorted = models.clone();
        sorted.sort_unstable();
        assert_eq!(models, sorted);

        assert_eq!(
            lookup("combined_geoh2_cost").unwrap(),
            (Technology::CombinedGeoH2, StageKind::Cost)
        );
    }

    #[test]
    fn unknown_key_is_configuration_error() {
        let plant = ConfigMap::new();
        let inputs = ModelInputs::default();
        let ctx = StageContext::new("reactor", &plant, &inputs);
        let Err(err) = build_stage("fusion_performance", &ctx) else {
            panic!("unknown model key accepted");
        };
        assert!(matches!(err, H2iError::Configuration(_)));
        let msg = err.to_string();
        assert!(msg.contains("fusion_performance"), "{msg}");
        assert!(msg.contains("reactor"), "{msg}");
    }
}
