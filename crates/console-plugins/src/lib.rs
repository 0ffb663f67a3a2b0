//! Plugin-contributed controller declarations and their activation lifecycle.
//!
//! Plugins describe controllers and namespaces ([`PluginDescriptor`]).
//! [`build`] folds them into an [`AggregatePluginConfig`] and a
//! [`ControllerRegistry`]; [`sync`] then keeps live controller instances in
//! line with each controller's activation predicate.

pub mod descriptor;
pub mod error;
pub mod predicate;
pub mod registry;
pub mod sync;

pub use descriptor::{ActiveSpec, ControllerContribution, PluginDescriptor, load_descriptor, load_descriptors};
pub use error::{ConfigurationError, PredicateError, SyncError};
pub use predicate::{Activation, ActivationPredicate, ActivationSource, PredicateTable};
pub use registry::{AggregatePluginConfig, ControllerDescriptor, ControllerRegistry, build};
pub use sync::{ControllerLifecycle, HookFailure, LifecycleStage, SyncReport, sync};
