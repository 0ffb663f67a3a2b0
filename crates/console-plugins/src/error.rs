use std::path::PathBuf;

use console_state::StateError;
use thiserror::Error;

/// Malformed plugin configuration. Fatal at bootstrap.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read plugin descriptor {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("plugin '{plugin}' is not valid JSON: {source}")]
    Parse {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid customization; plugin: {plugin}, property: {property}, found {found}")]
    InvalidProperty {
        plugin: String,
        property: &'static str,
        found: &'static str,
    },
    #[error("invalid customization; plugin: {plugin}, property: controllers, value: {value}")]
    InvalidContribution { plugin: String, value: String },
    #[error(
        "invalid customization; plugin: {plugin}, property: controllers, value: {id} active: \
         must be a boolean, a predicate, or the name of a registered predicate"
    )]
    InvalidActivation { plugin: String, id: String },
    #[error("plugin '{plugin}' controller '{id}' references unknown predicate '{name}'")]
    UnknownPredicate {
        plugin: String,
        id: String,
        name: String,
    },
    #[error("plugin '{plugin}' declares a controller with an empty id")]
    EmptyControllerId { plugin: String },
}

/// Raised by an activation predicate while it is being evaluated.
#[derive(Debug, Error)]
pub enum PredicateError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("activation predicate for controller '{id}' failed: {source}")]
    Predicate {
        id: String,
        #[source]
        source: PredicateError,
    },
}
