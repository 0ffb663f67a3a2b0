use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{StateError, StateResult};
use crate::store::StateMap;

/// Backing storage for state that should survive a restart.
pub trait StateProvider {
    fn load(&self) -> StateResult<StateMap>;
    fn save(&self, values: &StateMap) -> StateResult<()>;
}

/// In-process provider; useful for tests and for sessions without a state file.
#[derive(Debug, Default)]
pub struct MemProvider {
    values: RefCell<StateMap>,
}

impl MemProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: StateMap) -> Self {
        Self {
            values: RefCell::new(values),
        }
    }

    pub fn saved(&self) -> StateMap {
        self.values.borrow().clone()
    }
}

impl StateProvider for MemProvider {
    fn load(&self) -> StateResult<StateMap> {
        Ok(self.values.borrow().clone())
    }

    fn save(&self, values: &StateMap) -> StateResult<()> {
        *self.values.borrow_mut() = values.clone();
        Ok(())
    }
}

/// JSON-file provider. A missing file loads as empty state.
#[derive(Debug, Clone)]
pub struct FsProvider {
    path: PathBuf,
}

impl FsProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateProvider for FsProvider {
    fn load(&self) -> StateResult<StateMap> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("no state file at {}; starting empty", self.path.display());
                return Ok(StateMap::new());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        serde_json::from_str(&text).map_err(|source| StateError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, values: &StateMap) -> StateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let bytes = serde_json::to_vec_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|err| self.io_error(err))?;
        fs::rename(&tmp, &self.path).map_err(|err| self.io_error(err))?;
        Ok(())
    }
}
