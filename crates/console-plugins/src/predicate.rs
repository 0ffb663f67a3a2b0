use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use console_state::{StateRead, keys};

use crate::error::PredicateError;

/// Decides whether a controller should currently be instantiated.
pub type ActivationPredicate =
    Arc<dyn Fn(&dyn StateRead) -> Result<bool, PredicateError> + Send + Sync>;

pub const ALWAYS_ACTIVE: &str = "alwaysActive";
pub const DEFAULT_ACTIVATION: &str = "defaultActivation";
pub const SUPPORTED_BROWSER: &str = "supportedBrowser";
pub const UNSUPPORTED_BROWSER: &str = "unsupportedBrowser";
pub const LICENSED: &str = "licensed";
pub const UNLICENSED: &str = "unlicensed";
pub const DEBUG_MODE: &str = "debugMode";

/// Where an activation came from; kept for diagnostics and reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationSource {
    Default,
    Constant(bool),
    Named(String),
    Custom,
}

impl fmt::Display for ActivationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationSource::Default => f.write_str("default"),
            ActivationSource::Constant(value) => write!(f, "constant:{value}"),
            ActivationSource::Named(name) => write!(f, "named:{name}"),
            ActivationSource::Custom => f.write_str("custom"),
        }
    }
}

#[derive(Clone)]
pub struct Activation {
    source: ActivationSource,
    predicate: ActivationPredicate,
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Activation {
    /// Supported client and licensed; applied to bare controller ids.
    pub fn default_activation() -> Self {
        Self {
            source: ActivationSource::Default,
            predicate: Arc::new(default_activation),
        }
    }

    pub fn constant(value: bool) -> Self {
        Self {
            source: ActivationSource::Constant(value),
            predicate: Arc::new(move |_: &dyn StateRead| -> Result<bool, PredicateError> { Ok(value) }),
        }
    }

    pub fn named(name: impl Into<String>, predicate: ActivationPredicate) -> Self {
        Self {
            source: ActivationSource::Named(name.into()),
            predicate,
        }
    }

    pub fn custom(predicate: ActivationPredicate) -> Self {
        Self {
            source: ActivationSource::Custom,
            predicate,
        }
    }

    pub fn source(&self) -> &ActivationSource {
        &self.source
    }

    pub fn evaluate(&self, state: &dyn StateRead) -> Result<bool, PredicateError> {
        (self.predicate)(state)
    }
}

/// Name → predicate lookup used to resolve `"active": "<name>"` declarations.
#[derive(Clone, Default)]
pub struct PredicateTable {
    predicates: HashMap<String, ActivationPredicate>,
}

impl fmt::Debug for PredicateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.predicates.keys().collect();
        names.sort();
        f.debug_struct("PredicateTable").field("names", &names).finish()
    }
}

impl PredicateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.register(ALWAYS_ACTIVE, |_| Ok(true));
        table.register(DEFAULT_ACTIVATION, default_activation);
        table.register(SUPPORTED_BROWSER, |state| {
            Ok(keys::browser_supported(state)?)
        });
        table.register(UNSUPPORTED_BROWSER, |state| {
            Ok(!keys::browser_supported(state)?)
        });
        table.register(LICENSED, |state| Ok(keys::licensed(state)?));
        table.register(UNLICENSED, |state| Ok(!keys::licensed(state)?));
        table.register(DEBUG_MODE, |state| Ok(keys::debug_mode(state)?));
        table
    }

    /// Registers `predicate` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&dyn StateRead) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    pub fn resolve(&self, name: &str) -> Option<ActivationPredicate> {
        self.predicates.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

fn default_activation(state: &dyn StateRead) -> Result<bool, PredicateError> {
    Ok(keys::browser_supported(state)? && keys::licensed(state)?)
}

/// Active while the plugin with `coordinates` is installed.
pub fn plugin_active(coordinates: impl Into<String>) -> ActivationPredicate {
    let coordinates = coordinates.into();
    Arc::new(move |state: &dyn StateRead| -> Result<bool, PredicateError> {
        Ok(keys::plugin_active(state, &coordinates)?)
    })
}
