//! Tracing subscriber setup for the `upkeep` binary.
//!
//! One-shot commands log to stderr. The panel owns the terminal, so it logs
//! to a file in the config directory instead.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive (`info`, `upkeep_core=debug`, ...).
pub const LOG_ENV: &str = "UPKEEP_LOG";

/// Log file written by the panel, relative to the config directory.
pub const LOG_FILE: &str = "upkeep.log";

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr. Defaults to `warn` so command output stays readable.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Append to `<config_dir>/upkeep.log` at `info` unless overridden.
pub fn init_file(config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating {}", config_dir.display()))?;
    let path = config_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {}", e))
}
