//! `console plugins`: fold descriptors and show the result without starting
//! the shell.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console_plugins::{PredicateTable, build};
use indexmap::IndexMap;
use serde_json::json;

use crate::opts::GlobalOpts;
use crate::output::print_success;

#[derive(Args, Debug)]
pub struct PluginsArgs {
    /// Plugin descriptor files, applied in order (env: CONSOLE_PLUGINS, comma separated)
    #[arg(required = true, env = "CONSOLE_PLUGINS", value_delimiter = ',')]
    pub files: Vec<PathBuf>,

    /// Namespace used to qualify short controller ids (env: CONSOLE_APP_NAMESPACE)
    #[arg(long, env = "CONSOLE_APP_NAMESPACE", default_value = "NX")]
    pub namespace: String,
}

pub fn cmd_plugins(opts: &GlobalOpts, args: &PluginsArgs) -> Result<()> {
    let descriptors = super::load_plugins(&args.files)?;
    let (aggregate, registry) =
        build::<()>(&descriptors, &PredicateTable::with_builtins()).context("build controller registry")?;

    let controllers: Vec<_> = registry
        .iter()
        .map(|d| json!({ "id": d.id(), "activation": d.activation().source().to_string() }))
        .collect();
    let data = json!({
        "plugins": descriptors.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        "namespaces": aggregate.namespaces.iter().collect::<Vec<_>>(),
        "controllers": controllers,
        "requires": aggregate.requires(&args.namespace),
    });
    let warnings = duplicate_ids(&aggregate.controller_ids)
        .into_iter()
        .map(|(id, count)| format!("controller '{id}' declared {count} times; last declaration wins"))
        .collect();
    print_success(opts, data, warnings)
}

/// Ids declared more than once, with their counts, in first-declaration order.
fn duplicate_ids(ids: &[String]) -> Vec<(&str, usize)> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for id in ids {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    counts.into_iter().filter(|(_, count)| *count > 1).collect()
}
