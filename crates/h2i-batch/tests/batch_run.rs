use h2i_batch::{jobs_from_paths, load_batch_manifest, run_batch, BatchRunnerConfig};
use std::fs;
use std::path::Path;

fn plant(lng: f64) -> String {
    format!(
        r#"
name: lng_methanol
technologies:
  meoh:
    performance_model: {{model: smr_methanol_performance}}
    cost_model: {{model: smr_methanol_cost}}
    financial_model: {{model: smr_methanol_financial}}
    model_inputs:
      shared_parameters:
        lng: {lng}
        lng_consume_ratio: 1.61561859
        plant_capacity_kgpy: 1.0e6
      cost_parameters:
        lng_cost: 0.25
"#
    )
}

fn write_plant(dir: &Path, stem: &str, lng: f64) -> std::path::PathBuf {
    let path = dir.join(format!("{stem}.yaml"));
    fs::write(&path, plant(lng)).unwrap();
    path
}

#[test]
fn batch_records_successes_and_failures() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let good = write_plant(inputs.path(), "texas", 1_615_618.59);
    let dry = write_plant(inputs.path(), "dry_well", 0.0);

    let config = BatchRunnerConfig {
        jobs: jobs_from_paths(&[good, dry]).unwrap(),
        output_root: output.path().join("runs"),
        threads: 2,
    };
    let summary = run_batch(&config).unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 1);
    assert!(summary.manifest_path.exists());

    let texas = summary.jobs.iter().find(|job| job.job_id == "texas").unwrap();
    assert_eq!(texas.status, "ok");
    let annual = 1_615_618.59 / 1.61561859;
    let expected = (1.0e6 * 1.0e3 * 0.07 + 1_615_618.59 * 0.25) / annual;
    assert!((texas.levelized["meoh.LCOM"] - expected).abs() < 1e-6);
    let results = texas.output.as_ref().unwrap();
    assert!(Path::new(results).exists());

    let dry = summary.jobs.iter().find(|job| job.job_id == "dry_well").unwrap();
    assert_eq!(dry.status, "error");
    assert!(dry.error.is_some());
    assert_eq!(dry.error_kind.as_deref(), Some("domain"));
    assert!(dry.output.is_none());
    assert!(!config.output_root.join("dry_well").join("results.json").exists());

    let manifest = load_batch_manifest(&summary.manifest_path).unwrap();
    assert_eq!(manifest.num_jobs, 2);
    assert_eq!(manifest.success, 1);
    assert_eq!(manifest.failure, 1);
}

#[test]
fn zero_threads_uses_every_cpu() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let good = write_plant(inputs.path(), "texas", 1_615_618.59);
    let config = BatchRunnerConfig {
        jobs: jobs_from_paths(&[good]).unwrap(),
        output_root: output.path().to_path_buf(),
        threads: 0,
    };
    let summary = run_batch(&config).unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 0);
}

#[test]
fn empty_batch_still_writes_a_manifest() {
    let output = tempfile::tempdir().unwrap();
    let config = BatchRunnerConfig {
        jobs: Vec::new(),
        output_root: output.path().to_path_buf(),
        threads: 1,
    };
    let summary = run_batch(&config).unwrap();
    let manifest = load_batch_manifest(&summary.manifest_path).unwrap();
    assert_eq!(manifest.num_jobs, 0);
    assert!(manifest.jobs.is_empty());
}
