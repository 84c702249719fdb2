use crate::job::{BatchJob, BatchJobRecord};
use crate::manifest::{write_batch_manifest, BatchManifest};
use anyhow::{Context, Result};
use chrono::Utc;
use h2i_core::H2iError;
use h2i_models::{PlantModel, PlantResults};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct BatchRunnerConfig {
    pub jobs: Vec<BatchJob>,
    pub output_root: PathBuf,
    /// Worker threads; `0` uses every CPU.
    pub threads: usize,
}

/// Success/failure counts, manifest location and per-job records.
#[derive(Debug)]
pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<BatchJobRecord>,
}

pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root)
        .with_context(|| format!("creating batch output root '{}'", config.output_root.display()))?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for batch runs")?;

    // plants share nothing, so each job builds and runs its own model
    let job_records: Vec<BatchJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, &config.output_root))
            .collect()
    });

    let success = job_records.iter().filter(|record| record.status == "ok").count();
    let failure = job_records.len() - success;
    info!(
        "Batch finished: {} ok, {} failed on {} threads",
        success, failure, thread_count
    );

    let manifest = BatchManifest {
        created_at: Utc::now(),
        num_jobs: job_records.len(),
        success,
        failure,
        jobs: job_records.clone(),
    };
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;
    Ok(BatchSummary {
        success,
        failure,
        manifest_path,
        jobs: job_records,
    })
}

/// Build, run and persist one plant; failures become an `error` record.
fn run_job(job: &BatchJob, output_root: &Path) -> BatchJobRecord {
    let output_file = output_root.join(&job.job_id).join("results.json");

    let runner = || -> Result<PlantResults> {
        let plant = PlantModel::build(&job.config)
            .with_context(|| format!("building plant '{}'", job.config.name))?;
        let results = plant
            .run()
            .with_context(|| format!("running plant '{}'", job.config.name))?;
        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating job directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&results).context("serializing plant results")?;
        fs::write(&output_file, json)
            .with_context(|| format!("writing plant results '{}'", output_file.display()))?;
        Ok(results)
    };

    match runner() {
        Ok(results) => BatchJobRecord {
            job_id: job.job_id.clone(),
            plant: job.config.name.clone(),
            status: "ok".to_string(),
            error: None,
            error_kind: None,
            levelized: results.levelized,
            output: Some(output_file.display().to_string()),
        },
        Err(err) => {
            warn!("batch job {} failed: {err:#}", job.job_id);
            BatchJobRecord {
                job_id: job.job_id.clone(),
                plant: job.config.name.clone(),
                status: "error".to_string(),
                error: Some(format!("{err:#}")),
                error_kind: err
                    .downcast_ref::<H2iError>()
                    .map(|inner| inner.category().to_string()),
                levelized: Default::default(),
                output: None,
            }
        }
    }
}
