use anyhow::{anyhow, Result};
use std::io;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber for hosts that run batches from the command
/// line. Honors `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {err}"))
}
