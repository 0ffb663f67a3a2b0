//! Application shell: owns the controller registry and keeps managed
//! controllers in step with the observable state.

pub mod app;
pub mod config;
pub mod controller;
pub mod controllers;
pub mod error;
pub mod event_bus;
pub mod features;
pub mod icons;
pub mod messages;

pub use app::{Application, ControllerHandle};
pub use config::ShellConfig;
pub use controller::{Controller, ControllerFactory, ShellContext, Services};
pub use error::ShellError;
pub use event_bus::{BusEvent, EventBus, EventHandler, EventSelector};
pub use features::{Feature, FeatureMode, FeatureRegistry, IconConfig};
pub use icons::IconRegistry;
pub use messages::{ErrorReport, Message, MessageKind, Messages, error_as_string};
