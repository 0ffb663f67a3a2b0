//! Plugin descriptors: the namespaces and controllers one plugin contributes.
//!
//! Descriptors are either assembled in code with the builder methods on
//! [`PluginDescriptor`] or read from JSON:
//!
//! ```json
//! {
//!   "name": "coreui",
//!   "namespaces": ["NX.coreui"],
//!   "controllers": [
//!     "AnalyticsSettings",
//!     { "id": "dev.Permissions", "active": "debugMode" },
//!     { "id": "Legacy", "active": false }
//!   ]
//! }
//! ```
//!
//! Both `namespaces` and `controllers` accept a single string or a list.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigurationError;
use crate::predicate::ActivationPredicate;

const ANONYMOUS_PLUGIN: &str = "<anonymous>";

/// How a `{id, active}` declaration decides activation.
#[derive(Clone)]
pub enum ActiveSpec {
    Flag(bool),
    Named(String),
    Predicate(ActivationPredicate),
}

impl fmt::Debug for ActiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveSpec::Flag(value) => f.debug_tuple("Flag").field(value).finish(),
            ActiveSpec::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ActiveSpec::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControllerContribution {
    /// Bare id; activated by the default activation.
    Id(String),
    Declared { id: String, active: ActiveSpec },
}

impl ControllerContribution {
    pub fn id(&self) -> &str {
        match self {
            ControllerContribution::Id(id) => id,
            ControllerContribution::Declared { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub name: String,
    pub namespaces: Vec<String>,
    pub controllers: Vec<ControllerContribution>,
}

#[derive(Debug, Deserialize)]
struct RawPluginDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    namespaces: Option<Value>,
    #[serde(default)]
    controllers: Option<Value>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaces: Vec::new(),
            controllers: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }

    pub fn controller(mut self, id: impl Into<String>) -> Self {
        self.controllers.push(ControllerContribution::Id(id.into()));
        self
    }

    pub fn controller_when(mut self, id: impl Into<String>, active: ActiveSpec) -> Self {
        self.controllers.push(ControllerContribution::Declared {
            id: id.into(),
            active,
        });
        self
    }

    /// Parses a JSON descriptor. `fallback_name` is used when the document
    /// carries no `name`.
    pub fn from_json_str(fallback_name: &str, text: &str) -> Result<Self, ConfigurationError> {
        let raw: RawPluginDescriptor =
            serde_json::from_str(text).map_err(|source| ConfigurationError::Parse {
                plugin: fallback_name.to_string(),
                source,
            })?;
        Self::from_raw(fallback_name, raw)
    }

    pub fn from_value(fallback_name: &str, value: Value) -> Result<Self, ConfigurationError> {
        let raw: RawPluginDescriptor =
            serde_json::from_value(value).map_err(|source| ConfigurationError::Parse {
                plugin: fallback_name.to_string(),
                source,
            })?;
        Self::from_raw(fallback_name, raw)
    }

    fn from_raw(fallback_name: &str, raw: RawPluginDescriptor) -> Result<Self, ConfigurationError> {
        let name = raw
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let mut namespaces = Vec::new();
        for item in one_or_many(&name, "namespaces", raw.namespaces)? {
            match item {
                Value::String(ns) => namespaces.push(ns),
                other => {
                    return Err(ConfigurationError::InvalidProperty {
                        plugin: name,
                        property: "namespaces",
                        found: json_kind(&other),
                    });
                }
            }
        }

        let mut controllers = Vec::new();
        for item in one_or_many(&name, "controllers", raw.controllers)? {
            controllers.push(parse_contribution(&name, item)?);
        }

        log::debug!(
            "parsed plugin '{name}': {} namespace(s), {} controller(s)",
            namespaces.len(),
            controllers.len()
        );
        Ok(Self {
            name,
            namespaces,
            controllers,
        })
    }
}

fn one_or_many(
    plugin: &str,
    property: &'static str,
    value: Option<Value>,
) -> Result<Vec<Value>, ConfigurationError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![Value::String(s)]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ConfigurationError::InvalidProperty {
            plugin: plugin.to_string(),
            property,
            found: json_kind(&other),
        }),
    }
}

fn parse_contribution(plugin: &str, item: Value) -> Result<ControllerContribution, ConfigurationError> {
    match item {
        Value::String(id) => Ok(ControllerContribution::Id(id)),
        Value::Object(mut fields) => {
            let id = match fields.remove("id") {
                Some(Value::String(id)) => id,
                _ => {
                    return Err(ConfigurationError::InvalidContribution {
                        plugin: plugin.to_string(),
                        value: Value::Object(fields).to_string(),
                    });
                }
            };
            let active = match fields.remove("active") {
                Some(Value::Bool(flag)) => ActiveSpec::Flag(flag),
                Some(Value::String(name)) if !name.is_empty() => ActiveSpec::Named(name),
                _ => {
                    return Err(ConfigurationError::InvalidActivation {
                        plugin: plugin.to_string(),
                        id,
                    });
                }
            };
            Ok(ControllerContribution::Declared { id, active })
        }
        other => Err(ConfigurationError::InvalidContribution {
            plugin: plugin.to_string(),
            value: other.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads one descriptor file. The file stem names the plugin unless the
/// document sets `name`.
pub fn load_descriptor(path: &Path) -> Result<PluginDescriptor, ConfigurationError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let fallback = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(ANONYMOUS_PLUGIN);
    PluginDescriptor::from_json_str(fallback, &text)
}

/// Reads descriptors in the given order; order decides duplicate-id winners.
pub fn load_descriptors<P: AsRef<Path>>(
    paths: &[P],
) -> Result<Vec<PluginDescriptor>, ConfigurationError> {
    paths.iter().map(|p| load_descriptor(p.as_ref())).collect()
}
