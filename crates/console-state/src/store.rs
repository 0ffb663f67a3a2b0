use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{StateError, StateResult};

pub type StateMap = IndexMap<String, Value>;

/// Callback invoked for every effective change, in subscription order.
pub type StateListener = Box<dyn FnMut(&StateChange)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A single key transition. `None` means the key was absent on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub key: String,
    pub previous: Option<Value>,
    pub current: Option<Value>,
}

/// Read access used by activation and visibility predicates.
///
/// The typed accessors fail with [`StateError::TypeMismatch`] instead of
/// coercing, so a malformed value surfaces as an error rather than a silent
/// `false`.
pub trait StateRead {
    fn get(&self, key: &str) -> Option<&Value>;

    fn flag(&self, key: &str) -> StateResult<Option<bool>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(key, "a boolean", other)),
        }
    }

    fn flag_or(&self, key: &str, default: bool) -> StateResult<bool> {
        Ok(self.flag(key)?.unwrap_or(default))
    }

    fn string_list(&self, key: &str) -> StateResult<Vec<String>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(mismatch(key, "a list of strings", other)),
                })
                .collect(),
            Some(other) => Err(mismatch(key, "a list of strings", other)),
        }
    }
}

impl StateRead for StateMap {
    fn get(&self, key: &str) -> Option<&Value> {
        IndexMap::get(self, key)
    }
}

pub(crate) fn mismatch(key: &str, expected: &'static str, found: &Value) -> StateError {
    StateError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: value_kind(found),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Default)]
pub struct StateStore {
    values: StateMap,
    listeners: Vec<(SubscriptionId, StateListener)>,
    next_subscription: u64,
    revision: u64,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("values", &self.values)
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: StateMap) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> &StateMap {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bumped on every effective change; lets callers detect whether a batch
    /// of operations touched the store.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Stores `value` under `key`. Returns the change and notifies listeners
    /// only when the stored value actually differs.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<StateChange> {
        let key = key.into();
        if self.values.get(&key) == Some(&value) {
            return None;
        }
        let previous = self.values.insert(key.clone(), value.clone());
        log::debug!("state changed: {key}");
        Some(self.notify(StateChange {
            key,
            previous,
            current: Some(value),
        }))
    }

    pub fn remove(&mut self, key: &str) -> Option<StateChange> {
        let previous = self.values.shift_remove(key)?;
        log::debug!("state removed: {key}");
        Some(self.notify(StateChange {
            key: key.to_string(),
            previous: Some(previous),
            current: None,
        }))
    }

    /// Replaces stored values without notifying listeners. Used when
    /// restoring persisted state before anything subscribes.
    pub fn restore(&mut self, values: StateMap) -> usize {
        let count = values.len();
        self.values.extend(values);
        self.revision += 1;
        count
    }

    pub fn subscribe(&mut self, listener: StateListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, change: StateChange) -> StateChange {
        self.revision += 1;
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
        change
    }
}

impl StateRead for StateStore {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
