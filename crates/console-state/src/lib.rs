//! Observable key/value state consulted by controller activation predicates.
//!
//! The store is single-threaded: listeners run synchronously inside `set`,
//! in the order they subscribed. Persistence is pluggable through
//! [`StateProvider`].

mod error;
pub mod keys;
mod provider;
mod store;

pub use error::{StateError, StateResult};
pub use provider::{FsProvider, MemProvider, StateProvider};
pub use store::{StateChange, StateListener, StateMap, StateRead, StateStore, SubscriptionId};
