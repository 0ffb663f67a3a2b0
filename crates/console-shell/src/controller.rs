use std::fmt;

use console_state::StateStore;
use indexmap::IndexMap;

use crate::config::ShellConfig;
use crate::controllers;
use crate::error::ShellError;
use crate::event_bus::{EventBus, EventHandler, EventSelector};
use crate::features::{Feature, FeatureRegistry};
use crate::icons::IconRegistry;
use crate::messages::{MessageKind, Messages};

/// A unit of console behavior whose lifetime is managed by the shell.
///
/// `init` runs right after construction. Once every controller created in the
/// same pass is initialized, each gets `on_launch`, then each gets
/// `finish_init`. `on_destroy` runs after the controller has been detached
/// from the event bus; `destroy` releases whatever is left.
pub trait Controller {
    fn init(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        Ok(())
    }

    fn on_launch(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        Ok(())
    }

    fn finish_init(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        Ok(())
    }

    fn on_destroy(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        Ok(())
    }

    fn destroy(self: Box<Self>) {}
}

/// Shell-owned collaborators that controllers register with.
#[derive(Debug)]
pub struct Services {
    pub bus: EventBus,
    pub features: FeatureRegistry,
    pub icons: IconRegistry,
    pub messages: Messages,
}

impl Services {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            bus: EventBus::new(),
            features: FeatureRegistry::new(),
            icons: IconRegistry::new(config.icon_base_url.clone()),
            messages: Messages::new(config.max_messages),
        }
    }

    /// Removes everything registered on behalf of `owner`.
    pub(crate) fn release(&mut self, owner: &str) {
        let listeners = self.bus.unlisten(owner);
        let features = self.features.unregister_owner(owner);
        let icons = self.icons.unregister_owner(owner);
        tracing::debug!(owner, listeners, features, icons, "released controller registrations");
    }
}

/// What a controller sees during a lifecycle hook. Registrations made
/// through the context are owned by the controller and released with it.
pub struct ShellContext<'a> {
    id: &'a str,
    state: &'a StateStore,
    services: &'a mut Services,
}

impl<'a> ShellContext<'a> {
    pub fn new(id: &'a str, state: &'a StateStore, services: &'a mut Services) -> Self {
        Self { id, state, services }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub fn state(&self) -> &StateStore {
        self.state
    }

    pub fn listen(&mut self, selector: EventSelector, handler: EventHandler) {
        self.services.bus.listen(self.id, selector, handler);
    }

    /// Registers a feature and its icon, if it has one.
    pub fn register_feature(&mut self, feature: Feature) -> Result<(), ShellError> {
        if let Some(icon) = &feature.icon {
            self.services
                .icons
                .register(self.id, feature.icon_name(), icon.clone());
        }
        self.services.features.register(self.id, feature)
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.services.features
    }

    pub fn message(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.services.messages.add(kind, text);
    }
}

pub type ControllerConstructor = Box<dyn Fn(&str) -> Box<dyn Controller>>;

/// Maps controller ids to constructors.
#[derive(Default)]
pub struct ControllerFactory {
    constructors: IndexMap<String, ControllerConstructor>,
    fallback: Option<ControllerConstructor>,
}

impl fmt::Debug for ControllerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerFactory")
            .field("ids", &self.constructors.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl ControllerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory preloaded with the controllers that ship with the shell.
    pub fn builtin() -> Self {
        let mut factory = Self::new();
        controllers::register_builtin(&mut factory);
        factory
    }

    pub fn register<F>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn(&str) -> Box<dyn Controller> + 'static,
    {
        self.constructors.insert(id.into(), Box::new(constructor));
    }

    /// Constructor used for ids without a registered one.
    pub fn with_fallback<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&str) -> Box<dyn Controller> + 'static,
    {
        self.fallback = Some(Box::new(constructor));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    pub fn create(&self, id: &str) -> Result<Box<dyn Controller>, ShellError> {
        let constructor = self
            .constructors
            .get(id)
            .or(self.fallback.as_ref())
            .ok_or_else(|| ShellError::UnknownController(id.to_string()))?;
        Ok(constructor(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Controller for Noop {}

    #[test]
    fn unknown_ids_fail_without_fallback() {
        let factory = ControllerFactory::new();
        assert!(matches!(
            factory.create("Missing"),
            Err(ShellError::UnknownController(id)) if id == "Missing"
        ));

        let factory = ControllerFactory::new().with_fallback(|_| Box::new(Noop));
        assert!(factory.create("Missing").is_ok());
    }

    #[test]
    fn builtin_factory_knows_analytics() {
        assert!(ControllerFactory::builtin().contains(controllers::analytics::ID));
    }
}
