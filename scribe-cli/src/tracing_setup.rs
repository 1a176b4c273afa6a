//! Tracing setup for the scribe CLI
//!
//! Usage:
//!   scribe --debug ...                  # Debug logging to stderr
//!   RUST_LOG=scribe_orm=debug scribe    # Fine-grained log control
//!
//! Filter precedence: `RUST_LOG`, then `--debug`, then `[log] level` from
//! the config file, then `info`.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (sets the filter to debug if RUST_LOG is unset)
    pub debug: bool,
    /// Filter from the config file
    pub level: Option<String>,
}

impl TracingConfig {
    fn fallback_filter(&self) -> EnvFilter {
        if self.debug {
            return EnvFilter::new("debug");
        }
        self.level
            .as_deref()
            .and_then(|level| EnvFilter::try_new(level).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Initialize tracing with compact output on stderr
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.fallback_filter());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug) // Show targets in debug mode
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
