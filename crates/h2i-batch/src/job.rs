use anyhow::{Context, Result};
use h2i_config::{load_plant_config, PlantConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One independent plant scenario.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub job_id: String,
    pub config: PlantConfig,
}

impl BatchJob {
    pub fn new(job_id: impl Into<String>, config: PlantConfig) -> Self {
        Self {
            job_id: job_id.into(),
            config,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJobRecord {
    pub job_id: String,
    pub plant: String,
    pub status: String,
    pub error: Option<String>,
    /// Error category such as `domain` or `configuration`, when known.
    #[serde(default)]
    pub error_kind: Option<String>,
    /// Levelized cost outputs keyed `"<technology>.<LCO*>"`.
    #[serde(default)]
    pub levelized: BTreeMap<String, f64>,
    pub output: Option<String>,
}

/// One job per plant file, identified by the file stem.
pub fn jobs_from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<BatchJob>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let config = load_plant_config(path)?;
            let job_id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .with_context(|| format!("plant file '{}' has no usable name", path.display()))?;
            Ok(BatchJob::new(job_id, config))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PLANT: &str = r#"
name: lng_methanol
technologies:
  meoh:
    performance_model: {model: smr_methanol_performance}
    cost_model: {model: smr_methanol_cost}
    financial_model: {model: smr_methanol_financial}
"#;

    #[test]
    fn jobs_from_paths_uses_file_stems() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("texas.yaml");
        fs::write(&path, PLANT).unwrap();
        let jobs = jobs_from_paths(&[&path]).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, "texas");
        assert_eq!(jobs[0].config.name, "lng_methanol");
    }

    #[test]
    fn unreadable_path_fails_the_listing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(jobs_from_paths(&[dir.path().join("missing.yaml")]).is_err());
    }
}
