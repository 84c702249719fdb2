//! Layered configuration merging.
//!
//! A technology's `model_inputs` block carries shared keys and one block per
//! stage. The stage a model is built for sees the shared keys with its own
//! block laid on top. Merging never mutates its inputs; each layer produces a
//! new map.

use crate::error::{H2iError, H2iResult};
use crate::stage::StageKind;
use crate::value::{Overrides, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Untyped configuration layer.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// The `model_inputs` block of one technology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInputs {
    #[serde(default)]
    pub shared_parameters: ConfigMap,
    #[serde(default)]
    pub performance_parameters: ConfigMap,
    #[serde(default)]
    pub cost_parameters: ConfigMap,
    #[serde(default)]
    pub finance_parameters: ConfigMap,
}

impl ModelInputs {
    pub fn stage_parameters(&self, kind: StageKind) -> &ConfigMap {
        match kind {
            StageKind::Performance => &self.performance_parameters,
            StageKind::Cost => &self.cost_parameters,
            StageKind::Finance => &self.finance_parameters,
        }
    }

    /// Every key across all blocks.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.shared_parameters
            .keys()
            .chain(self.performance_parameters.keys())
            .chain(self.cost_parameters.keys())
            .chain(self.finance_parameters.keys())
            .map(String::as_str)
    }
}

/// Overlay `layers` left to right; on a key collision the later layer wins.
pub fn merge_layers(layers: &[&ConfigMap]) -> ConfigMap {
    let mut merged = ConfigMap::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Shared parameters with the `kind` stage's block laid on top.
pub fn merge_shared_inputs(inputs: &ModelInputs, kind: StageKind) -> ConfigMap {
    merge_layers(&[&inputs.shared_parameters, inputs.stage_parameters(kind)])
}

/// Deserialize a merged layer into a typed stage config.
///
/// A missing or mistyped key fails with a configuration error naming the key
/// and the stage it was needed for.
pub fn parse_stage_config<T: DeserializeOwned>(owner: &str, merged: &ConfigMap) -> H2iResult<T> {
    serde_json::from_value(serde_json::Value::Object(merged.clone()))
        .map_err(|err| H2iError::config(format!("{owner}: {err}")))
}

/// Numeric entries of a config layer as declaration overrides.
///
/// Numbers become scalars and arrays of numbers become series; every other
/// entry (strings, nested maps, mixed arrays) is skipped.
pub fn numeric_overrides(map: &ConfigMap) -> Overrides {
    let mut overrides = Overrides::new();
    for (key, value) in map {
        match value {
            serde_json::Value::Number(number) => {
                if let Some(v) = number.as_f64() {
                    overrides.insert(key.clone(), Value::Scalar(v));
                }
            }
            serde_json::Value::Array(items) if !items.is_empty() => {
                let series: Option<Vec<f64>> = items.iter().map(|item| item.as_f64()).collect();
                if let Some(series) = series {
                    overrides.insert(key.clone(), Value::Series(series));
                }
            }
            _ => {}
        }
    }
    overrides
}

/// Check that every key in `keys` is present and numeric (a number or an
/// array of numbers).
pub fn require_numbers(owner: &str, map: &ConfigMap, keys: &[&str]) -> H2iResult<()> {
    for key in keys {
        match map.get(*key) {
            Some(serde_json::Value::Number(_)) => {}
            Some(serde_json::Value::Array(items)) if items.iter().all(|item| item.is_number()) => {}
            Some(other) => {
                return Err(H2iError::config(format!(
                    "{owner}: key '{key}' must be numeric, got {other}"
                )))
            }
            None => {
                return Err(H2iError::config(format!(
                    "{owner}: missing required key '{key}'"
                )))
            }
        }
    }
    Ok(())
}

/// Required string entry, e.g. the `conversion_tech` selector.
pub fn required_str<'a>(owner: &str, map: &'a ConfigMap, key: &str) -> H2iResult<&'a str> {
    map.get(key)
        .and_then(|value| value.as_str())
        .ok_or_else(|| H2iError::config(format!("{owner}: missing required string key '{key}'")))
}
