pub mod job;
pub mod logging;
pub mod manifest;
pub mod runner;

pub use job::{jobs_from_paths, BatchJob, BatchJobRecord};
pub use logging::init_tracing;
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest};
pub use runner::{run_batch, BatchRunnerConfig, BatchSummary};
