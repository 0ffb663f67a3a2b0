use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::descriptor::{ActiveSpec, ControllerContribution, PluginDescriptor};
use crate::error::ConfigurationError;
use crate::predicate::{Activation, PredicateTable};

/// Everything the plugins contributed, folded together. Built once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatePluginConfig {
    pub namespaces: IndexSet<String>,
    /// Every declared controller id in declaration order, duplicates included.
    pub controller_ids: Vec<String>,
}

impl AggregatePluginConfig {
    /// Fully qualified controller names. Ids containing a `.` are taken as
    /// already qualified; others live under `<app_namespace>.controller`.
    pub fn requires(&self, app_namespace: &str) -> Vec<String> {
        let mut seen = IndexSet::new();
        for id in &self.controller_ids {
            let name = if id.contains('.') {
                id.clone()
            } else {
                format!("{app_namespace}.controller.{id}")
            };
            seen.insert(name);
        }
        seen.into_iter().collect()
    }
}

pub struct ControllerDescriptor<H> {
    id: String,
    activation: Activation,
    pub(crate) instance: Option<H>,
}

impl<H> fmt::Debug for ControllerDescriptor<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("id", &self.id)
            .field("activation", &self.activation)
            .field("live", &self.instance.is_some())
            .finish()
    }
}

impl<H> ControllerDescriptor<H> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn instance(&self) -> Option<&H> {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> Option<&mut H> {
        self.instance.as_mut()
    }

    pub fn is_live(&self) -> bool {
        self.instance.is_some()
    }
}

/// Ordered id → descriptor map. Iteration follows first insertion.
pub struct ControllerRegistry<H> {
    entries: IndexMap<String, ControllerDescriptor<H>>,
}

impl<H> Default for ControllerRegistry<H> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<H> fmt::Debug for ControllerRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.values()).finish()
    }
}

impl<H> ControllerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `id`. An existing entry keeps its position and instance but
    /// takes the new activation; the replaced activation is returned.
    pub fn declare(&mut self, id: impl Into<String>, activation: Activation) -> Option<Activation> {
        let id = id.into();
        if let Some(existing) = self.entries.get_mut(&id) {
            return Some(std::mem::replace(&mut existing.activation, activation));
        }
        self.entries.insert(
            id.clone(),
            ControllerDescriptor {
                id,
                activation,
                instance: None,
            },
        );
        None
    }

    pub fn get(&self, id: &str) -> Option<&ControllerDescriptor<H>> {
        self.entries.get(id)
    }

    pub fn instance(&self, id: &str) -> Option<&H> {
        self.entries.get(id).and_then(|d| d.instance.as_ref())
    }

    pub fn instance_mut(&mut self, id: &str) -> Option<&mut H> {
        self.entries.get_mut(id).and_then(|d| d.instance.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControllerDescriptor<H>> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ControllerDescriptor<H>> {
        self.entries.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Ids with a live instance, in registry order.
    pub fn live_ids(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|d| d.instance.is_some())
            .map(|d| d.id.clone())
            .collect()
    }

    /// Takes every live instance out of the registry, in registry order.
    pub fn drain_instances(&mut self) -> Vec<(String, H)> {
        self.entries
            .values_mut()
            .filter_map(|d| d.instance.take().map(|h| (d.id.clone(), h)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Folds plugin descriptors into the aggregate configuration and a registry
/// with no live instances. Later descriptors win on duplicate ids.
pub fn build<H>(
    descriptors: &[PluginDescriptor],
    predicates: &PredicateTable,
) -> Result<(AggregatePluginConfig, ControllerRegistry<H>), ConfigurationError> {
    let mut aggregate = AggregatePluginConfig::default();
    let mut registry = ControllerRegistry::new();

    for descriptor in descriptors {
        log::debug!("processing plugin '{}'", descriptor.name);
        aggregate
            .namespaces
            .extend(descriptor.namespaces.iter().cloned());

        for contribution in &descriptor.controllers {
            let id = contribution.id();
            if id.is_empty() {
                return Err(ConfigurationError::EmptyControllerId {
                    plugin: descriptor.name.clone(),
                });
            }
            let activation = resolve_activation(&descriptor.name, contribution, predicates)?;
            aggregate.controller_ids.push(id.to_string());
            if registry.declare(id, activation).is_some() {
                log::debug!(
                    "plugin '{}' redeclares controller '{id}'; later declaration wins",
                    descriptor.name
                );
            }
        }
    }

    log::debug!(
        "aggregated {} namespace(s), {} managed controller(s)",
        aggregate.namespaces.len(),
        registry.len()
    );
    Ok((aggregate, registry))
}

fn resolve_activation(
    plugin: &str,
    contribution: &ControllerContribution,
    predicates: &PredicateTable,
) -> Result<Activation, ConfigurationError> {
    let (id, active) = match contribution {
        ControllerContribution::Id(_) => return Ok(Activation::default_activation()),
        ControllerContribution::Declared { id, active } => (id, active),
    };
    match active {
        ActiveSpec::Flag(value) => Ok(Activation::constant(*value)),
        ActiveSpec::Predicate(predicate) => Ok(Activation::custom(predicate.clone())),
        ActiveSpec::Named(name) => predicates
            .resolve(name)
            .map(|predicate| Activation::named(name.clone(), predicate))
            .ok_or_else(|| ConfigurationError::UnknownPredicate {
                plugin: plugin.to_string(),
                id: id.clone(),
                name: name.clone(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ActivationSource;
    use console_state::StateMap;
    use serde_json::json;
    use std::sync::Arc;

    type Registry = ControllerRegistry<()>;

    fn build_all(descriptors: &[PluginDescriptor]) -> Result<(AggregatePluginConfig, Registry), ConfigurationError> {
        build(descriptors, &PredicateTable::with_builtins())
    }

    #[test]
    fn empty_id_fails_the_build() {
        let plugin = PluginDescriptor::new("p")
            .controller("foo")
            .controller_when("", ActiveSpec::Flag(true));
        let err = build_all(&[plugin]).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyControllerId { ref plugin } if plugin == "p"));
    }

    #[test]
    fn bare_ids_get_default_activation() {
        let (aggregate, registry) = build_all(&[PluginDescriptor::new("p").controller("Audit")]).unwrap();
        assert_eq!(aggregate.controller_ids, vec!["Audit"]);
        let descriptor = registry.get("Audit").unwrap();
        assert_eq!(descriptor.activation().source(), &ActivationSource::Default);
        assert!(!descriptor.is_live());
    }

    #[test]
    fn later_declaration_wins_in_place() {
        let first = PluginDescriptor::new("a")
            .controller_when("X", ActiveSpec::Flag(true))
            .controller("Y");
        let second = PluginDescriptor::new("b").controller_when("X", ActiveSpec::Flag(false));
        let (aggregate, registry) = build_all(&[first, second]).unwrap();

        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["X", "Y"]);
        assert_eq!(aggregate.controller_ids, vec!["X", "Y", "X"]);
        let x = registry.get("X").unwrap();
        assert_eq!(x.activation().source(), &ActivationSource::Constant(false));
        assert!(!x.activation().evaluate(&StateMap::new()).unwrap());
    }

    #[test]
    fn named_predicates_resolve_through_the_table() {
        let plugin = PluginDescriptor::new("p").controller_when("Dev", ActiveSpec::Named("debugMode".into()));
        let (_, registry) = build_all(&[plugin]).unwrap();
        let activation = registry.get("Dev").unwrap().activation();
        let mut state = StateMap::new();
        assert!(!activation.evaluate(&state).unwrap());
        state.insert("debug".into(), json!(true));
        assert!(activation.evaluate(&state).unwrap());
    }

    #[test]
    fn unknown_predicate_name_fails() {
        let plugin = PluginDescriptor::new("p").controller_when("Dev", ActiveSpec::Named("NX.nope".into()));
        let err = build_all(&[plugin]).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownPredicate { ref id, ref name, .. } if id == "Dev" && name == "NX.nope"
        ));
    }

    #[test]
    fn custom_predicates_are_kept() {
        let plugin = PluginDescriptor::new("p").controller_when(
            "Custom",
            ActiveSpec::Predicate(Arc::new(
                |state: &dyn console_state::StateRead| -> Result<bool, crate::PredicateError> {
                    Ok(state.get("feature").is_some())
                },
            )),
        );
        let (_, registry) = build_all(&[plugin]).unwrap();
        let activation = registry.get("Custom").unwrap().activation();
        assert_eq!(activation.source(), &ActivationSource::Custom);
        assert!(!activation.evaluate(&StateMap::new()).unwrap());
    }

    #[test]
    fn namespaces_merge_without_duplicates() {
        let a = PluginDescriptor::new("a").namespace("NX.coreui").namespace("NX.audit");
        let b = PluginDescriptor::new("b").namespace("NX.coreui");
        let (aggregate, _) = build_all(&[a, b]).unwrap();
        assert_eq!(
            aggregate.namespaces.iter().collect::<Vec<_>>(),
            vec!["NX.coreui", "NX.audit"]
        );
    }

    #[test]
    fn requires_qualifies_short_ids() {
        let aggregate = AggregatePluginConfig {
            namespaces: IndexSet::new(),
            controller_ids: vec!["Audit".into(), "NX.coreui.controller.Blobs".into(), "Audit".into()],
        };
        assert_eq!(
            aggregate.requires("NX"),
            vec!["NX.controller.Audit", "NX.coreui.controller.Blobs"]
        );
    }
}
