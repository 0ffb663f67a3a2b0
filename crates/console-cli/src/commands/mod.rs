//! CLI command handlers.

pub mod plugins;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use console_plugins::{PluginDescriptor, load_descriptors};
use tracing_subscriber::EnvFilter;

use crate::opts::GlobalOpts;

/// Logs go to stderr so stdout stays machine-readable.
pub fn setup_logging(opts: &GlobalOpts) {
    let default = if opts.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn load_plugins(files: &[PathBuf]) -> Result<Vec<PluginDescriptor>> {
    let descriptors = load_descriptors(files).context("load plugin descriptors")?;
    tracing::debug!(count = descriptors.len(), "loaded plugin descriptors");
    Ok(descriptors)
}
