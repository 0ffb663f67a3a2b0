use std::{io, path::PathBuf};

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state key '{key}' expected {expected} but holds {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("state file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("state file {} is not a JSON object: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}
