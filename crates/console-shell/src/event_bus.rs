use std::fmt;

use console_state::StateStore;
use serde_json::Value;

use crate::error::ShellError;

/// Fired by a settings form after a successful save.
pub const SETTINGS_SUBMITTED: &str = "settings.submitted";

#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub name: String,
    /// Component that fired the event, when it matters to listeners.
    pub source: Option<String>,
    pub payload: Value,
}

impl BusEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            source: None,
            payload,
        }
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// A settings form `form` saved `data`.
    pub fn settings_submitted(form: impl Into<String>, data: Value) -> Self {
        Self::new(SETTINGS_SUBMITTED, serde_json::json!({ "data": data })).from_source(form)
    }
}

/// Which events a listener receives. A selector without a source matches
/// the event from any source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSelector {
    pub event: String,
    pub source: Option<String>,
}

impl EventSelector {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            source: None,
        }
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn matches(&self, event: &BusEvent) -> bool {
        if self.event != event.name {
            return false;
        }
        match &self.source {
            None => true,
            Some(source) => event.source.as_deref() == Some(source.as_str()),
        }
    }
}

pub type EventHandler = Box<dyn FnMut(&BusEvent, &mut StateStore) -> Result<(), ShellError>>;

struct Listener {
    owner: String,
    selector: EventSelector,
    handler: EventHandler,
}

/// Handler failures from one dispatch, tagged with the owning controller.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub handled: usize,
    pub failures: Vec<(String, ShellError)>,
}

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.listeners.iter().map(|l| (&l.owner, &l.selector)))
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&mut self, owner: impl Into<String>, selector: EventSelector, handler: EventHandler) {
        self.listeners.push(Listener {
            owner: owner.into(),
            selector,
            handler,
        });
    }

    /// Drops every listener `owner` registered. Returns how many were removed.
    pub fn unlisten(&mut self, owner: &str) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.owner != owner);
        before - self.listeners.len()
    }

    pub fn listener_count(&self, owner: &str) -> usize {
        self.listeners.iter().filter(|l| l.owner == owner).count()
    }

    /// Runs matching handlers in registration order. A failing handler does
    /// not stop the remaining ones.
    pub fn dispatch(&mut self, event: &BusEvent, state: &mut StateStore) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for listener in self.listeners.iter_mut() {
            if !listener.selector.matches(event) {
                continue;
            }
            outcome.handled += 1;
            if let Err(err) = (listener.handler)(event, state) {
                tracing::warn!(owner = %listener.owner, event = %event.name, "event handler failed: {err}");
                outcome.failures.push((listener.owner.clone(), err));
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setter(key: &'static str) -> EventHandler {
        Box::new(move |event, state| {
            state.set(key, event.payload.clone());
            Ok(())
        })
    }

    #[test]
    fn selectors_filter_by_source() {
        let mut bus = EventBus::new();
        let mut state = StateStore::new();
        bus.listen("A", EventSelector::new("saved").from_source("analytics"), setter("a"));
        bus.listen("B", EventSelector::new("saved"), setter("b"));

        let outcome = bus.dispatch(&BusEvent::new("saved", json!(1)).from_source("ldap"), &mut state);
        assert_eq!(outcome.handled, 1);
        assert!(!state.contains("a"));
        assert!(state.contains("b"));

        bus.dispatch(&BusEvent::new("saved", json!(2)).from_source("analytics"), &mut state);
        assert_eq!(state.snapshot().get("a"), Some(&json!(2)));
    }

    #[test]
    fn unlisten_removes_only_the_owner() {
        let mut bus = EventBus::new();
        bus.listen("A", EventSelector::new("x"), setter("a"));
        bus.listen("A", EventSelector::new("y"), setter("a"));
        bus.listen("B", EventSelector::new("x"), setter("b"));

        assert_eq!(bus.unlisten("A"), 2);
        assert_eq!(bus.listener_count("A"), 0);
        assert_eq!(bus.listener_count("B"), 1);
    }

    #[test]
    fn failing_handler_does_not_stop_others() {
        let mut bus = EventBus::new();
        let mut state = StateStore::new();
        bus.listen(
            "A",
            EventSelector::new("x"),
            Box::new(|_, _| {
                Err(ShellError::Controller {
                    id: "A".into(),
                    message: "nope".into(),
                })
            }),
        );
        bus.listen("B", EventSelector::new("x"), setter("b"));

        let outcome = bus.dispatch(&BusEvent::new("x", json!(true)), &mut state);
        assert_eq!(outcome.handled, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "A");
        assert!(state.contains("b"));
    }
}
