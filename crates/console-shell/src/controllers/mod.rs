//! Controllers that ship with the shell.

pub mod analytics;

use crate::controller::ControllerFactory;

pub(crate) fn register_builtin(factory: &mut ControllerFactory) {
    factory.register(analytics::ID, |_| Box::new(analytics::AnalyticsSettings::default()));
}
