use console_plugins::{ConfigurationError, SyncError};
use console_state::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("no controller registered for '{0}'")]
    UnknownController(String),
    #[error("feature '{path}' is already registered for mode '{mode}'")]
    DuplicateFeature { mode: String, path: String },
    #[error("invalid feature: {0}")]
    InvalidFeature(String),
    #[error("controller '{id}' failed: {message}")]
    Controller { id: String, message: String },
    #[error("application already started")]
    AlreadyStarted,
}
