use std::fmt;

use console_plugins::{
    AggregatePluginConfig, ControllerLifecycle, ControllerRegistry, HookFailure, PluginDescriptor,
    PredicateTable, SyncReport, build, sync,
};
use console_state::{
    FsProvider, MemProvider, StateListener, StateMap, StateProvider, StateStore, SubscriptionId,
};
use serde_json::Value;

use crate::config::ShellConfig;
use crate::controller::{Controller, ControllerFactory, Services, ShellContext};
use crate::error::ShellError;
use crate::event_bus::BusEvent;
use crate::features::{Feature, FeatureRegistry};
use crate::icons::IconRegistry;
use crate::messages::{ErrorReport, MessageKind, Messages, error_as_string};

/// How the registry holds live controllers.
pub type ControllerHandle = Box<dyn Controller>;

/// The console application: plugin configuration, managed controllers and
/// the state that decides which of them are live.
///
/// Every effective state change made through the application re-runs the
/// synchronizer once the application has started. Changes made before
/// [`Application::start`] only seed the state.
pub struct Application {
    config: ShellConfig,
    aggregate: AggregatePluginConfig,
    registry: ControllerRegistry<ControllerHandle>,
    factory: ControllerFactory,
    state: StateStore,
    services: Services,
    provider: Box<dyn StateProvider>,
    started: bool,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .field("aggregate", &self.aggregate)
            .field("registry", &self.registry)
            .field("state", &self.state)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Builds the application with a provider chosen from the config: the
    /// state file when one is set, memory otherwise.
    pub fn new(
        config: ShellConfig,
        descriptors: &[PluginDescriptor],
        predicates: &PredicateTable,
        factory: ControllerFactory,
    ) -> Result<Self, ShellError> {
        let provider: Box<dyn StateProvider> = match &config.state_path {
            Some(path) => Box::new(FsProvider::new(path.clone())),
            None => Box::new(MemProvider::new()),
        };
        Self::with_provider(config, descriptors, predicates, factory, provider)
    }

    /// Folds the descriptors and restores persisted state. No controller is
    /// created until [`Application::start`].
    pub fn with_provider(
        config: ShellConfig,
        descriptors: &[PluginDescriptor],
        predicates: &PredicateTable,
        factory: ControllerFactory,
        provider: Box<dyn StateProvider>,
    ) -> Result<Self, ShellError> {
        let (aggregate, registry) = build(descriptors, predicates)?;
        tracing::info!(
            plugins = descriptors.len(),
            namespaces = aggregate.namespaces.len(),
            controllers = registry.len(),
            "loaded plugin configuration"
        );

        let mut state = StateStore::new();
        let restored = state.restore(provider.load()?);
        tracing::debug!(keys = restored, "restored persisted state");

        let services = Services::new(&config);
        Ok(Self {
            config,
            aggregate,
            registry,
            factory,
            state,
            services,
            provider,
            started: false,
        })
    }

    /// Runs the first synchronization pass.
    pub fn start(&mut self) -> Result<SyncReport, ShellError> {
        if self.started {
            return Err(ShellError::AlreadyStarted);
        }
        let report = self.sync_managed_controllers()?;
        self.started = true;
        tracing::info!(live = report.created.len(), "application started");
        Ok(report)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Sets a state value. Returns the sync report when the change re-ran the
    /// synchronizer.
    pub fn set_state(&mut self, key: impl Into<String>, value: Value) -> Result<Option<SyncReport>, ShellError> {
        let key = key.into();
        if self.state.set(key.clone(), value).is_none() {
            return Ok(None);
        }
        self.after_change(Some(key.as_str()))
    }

    pub fn remove_state(&mut self, key: &str) -> Result<Option<SyncReport>, ShellError> {
        if self.state.remove(key).is_none() {
            return Ok(None);
        }
        self.after_change(Some(key))
    }

    /// Delivers an event to listening controllers. Handler failures are
    /// reported as error messages; state changes made by handlers trigger a
    /// synchronization pass.
    pub fn dispatch(&mut self, event: BusEvent) -> Result<Option<SyncReport>, ShellError> {
        let revision = self.state.revision();
        let outcome = self.services.bus.dispatch(&event, &mut self.state);
        tracing::debug!(event = %event.name, handled = outcome.handled, "dispatched event");
        for (owner, err) in outcome.failures {
            self.handle_error(ErrorReport::from_source(owner, event.name.as_str(), err.to_string()));
        }
        if self.state.revision() == revision {
            return Ok(None);
        }
        self.after_change(None)
    }

    /// Records an error as an operator-visible message.
    pub fn handle_error(&mut self, report: ErrorReport) {
        let text = error_as_string(&report);
        tracing::error!("{text}");
        self.services.messages.add(MessageKind::Danger, text);
    }

    /// Brings the live controller set in line with the current state.
    pub fn sync_managed_controllers(&mut self) -> Result<SyncReport, ShellError> {
        let mut lifecycle = ShellLifecycle {
            factory: &self.factory,
            state: &self.state,
            services: &mut self.services,
        };
        let report = sync(&mut self.registry, &self.state, &mut lifecycle)?;
        if report.changed() || !report.failures.is_empty() {
            tracing::info!(
                created = ?report.created,
                destroyed = ?report.destroyed,
                failures = report.failures.len(),
                "synchronized managed controllers"
            );
        }
        Ok(report)
    }

    /// Destroys every live controller. Returns their ids in registry order.
    pub fn shutdown(&mut self) -> Vec<String> {
        let mut lifecycle = ShellLifecycle {
            factory: &self.factory,
            state: &self.state,
            services: &mut self.services,
        };
        let mut destroyed = Vec::new();
        for (id, controller) in self.registry.drain_instances() {
            if let Err(err) = lifecycle.destroy(&id, controller) {
                let report = ErrorReport::from_source(id.as_str(), "destroy", err.to_string());
                lifecycle.services.messages.add(MessageKind::Danger, error_as_string(&report));
            }
            destroyed.push(id);
        }
        if !destroyed.is_empty() {
            lifecycle.refresh_styles();
        }
        self.started = false;
        tracing::info!(destroyed = destroyed.len(), "application shut down");
        destroyed
    }

    pub fn subscribe_state(&mut self, listener: StateListener) -> SubscriptionId {
        self.state.subscribe(listener)
    }

    pub fn unsubscribe_state(&mut self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    /// Ids of live controllers, in registry order.
    pub fn active_controllers(&self) -> Vec<String> {
        self.registry.live_ids()
    }

    pub fn controller(&self, id: &str) -> Option<&dyn Controller> {
        self.registry.instance(id).map(|c| c.as_ref())
    }

    /// Fully qualified names of every contributed controller.
    pub fn requires(&self) -> Vec<String> {
        self.aggregate.requires(&self.config.app_namespace)
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.services.features
    }

    pub fn visible_features(&self) -> Vec<&Feature> {
        self.services.features.visible(&self.state).collect()
    }

    pub fn messages(&self) -> &Messages {
        &self.services.messages
    }

    pub fn icons(&self) -> &IconRegistry {
        &self.services.icons
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn aggregate(&self) -> &AggregatePluginConfig {
        &self.aggregate
    }

    pub fn registry(&self) -> &ControllerRegistry<ControllerHandle> {
        &self.registry
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Re-syncs before reporting a failed save, so live controllers always
    /// follow the state already in the store.
    fn after_change(&mut self, key: Option<&str>) -> Result<Option<SyncReport>, ShellError> {
        let saved = if key.is_none_or(|key| self.config.persists(key)) {
            self.persist()
        } else {
            Ok(())
        };
        let report = if self.started {
            Some(self.sync_managed_controllers()?)
        } else {
            None
        };
        if let Err(err) = saved {
            tracing::warn!("state change applied but not saved: {err}");
            return Err(err);
        }
        Ok(report)
    }

    fn persist(&self) -> Result<(), ShellError> {
        let values: StateMap = self
            .state
            .snapshot()
            .iter()
            .filter(|(key, _)| self.config.persists(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.provider.save(&values)?;
        Ok(())
    }
}

/// Lifecycle hooks as the synchronizer sees them, wired to shell services.
struct ShellLifecycle<'a> {
    factory: &'a ControllerFactory,
    state: &'a StateStore,
    services: &'a mut Services,
}

impl ShellLifecycle<'_> {
    fn context<'s>(&'s mut self, id: &'s str) -> ShellContext<'s> {
        ShellContext::new(id, self.state, self.services)
    }
}

impl ControllerLifecycle<ControllerHandle> for ShellLifecycle<'_> {
    type Error = ShellError;

    fn instantiate(&mut self, id: &str) -> Result<ControllerHandle, ShellError> {
        let mut controller = self.factory.create(id)?;
        let result = controller.init(&mut self.context(id));
        if let Err(err) = result {
            self.services.release(id);
            return Err(err);
        }
        Ok(controller)
    }

    fn launch(&mut self, id: &str, controller: &mut ControllerHandle) -> Result<(), ShellError> {
        controller.on_launch(&mut self.context(id))
    }

    fn finish_init(&mut self, id: &str, controller: &mut ControllerHandle) -> Result<(), ShellError> {
        controller.finish_init(&mut self.context(id))
    }

    fn destroy(&mut self, id: &str, mut controller: ControllerHandle) -> Result<(), ShellError> {
        self.services.bus.unlisten(id);
        let result = controller.on_destroy(&mut self.context(id));
        self.services.release(id);
        controller.destroy();
        result
    }

    fn refresh_styles(&mut self) {
        self.services.icons.install_stylesheet();
    }

    fn hook_failed(&mut self, failure: &HookFailure) {
        let report = ErrorReport::from_source(failure.id.as_str(), failure.stage.to_string(), failure.message.as_str());
        self.services
            .messages
            .add(MessageKind::Danger, error_as_string(&report));
    }
}
