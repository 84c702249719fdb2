use crate::schema::PlantConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a plant file, dispatching on the extension (`yaml`/`yml`/`json`),
/// then trying YAML and JSON for anything else.
pub fn load_plant_config(path: &Path) -> Result<PlantConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading plant config '{}'", path.display()))?;
    let config: PlantConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing plant config yaml")?
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing plant config json")?
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing plant config")?,
    };
    config
        .validate()
        .with_context(|| format!("validating plant config '{}'", path.display()))?;
    Ok(config)
}

/// Parse and validate a YAML document (JSON is a subset, so it works too).
pub fn parse_plant_config(text: &str) -> Result<PlantConfig> {
    let config: PlantConfig = serde_yaml::from_str(text).context("parsing plant config")?;
    config.validate().context("validating plant config")?;
    Ok(config)
}
