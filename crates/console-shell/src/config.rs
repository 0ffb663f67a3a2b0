use std::path::PathBuf;

pub const STATE_FILE_ENV: &str = "CONSOLE_STATE_FILE";
pub const APP_NAMESPACE_ENV: &str = "CONSOLE_APP_NAMESPACE";

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Namespace used to qualify short controller ids.
    pub app_namespace: String,
    /// JSON file for persisted state; in-memory when `None`.
    pub state_path: Option<PathBuf>,
    /// Keys written to the state provider. `None` persists every key.
    pub persist_keys: Option<Vec<String>>,
    /// Prefix for icon image urls in the generated stylesheet.
    pub icon_base_url: String,
    /// Oldest messages are dropped beyond this many.
    pub max_messages: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            app_namespace: "NX".into(),
            state_path: None,
            persist_keys: None,
            icon_base_url: "static/icons".into(),
            max_messages: 100,
        }
    }
}

impl ShellConfig {
    /// Defaults overridden by `CONSOLE_STATE_FILE` and `CONSOLE_APP_NAMESPACE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(STATE_FILE_ENV) {
            if !path.is_empty() {
                config.state_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(namespace) = std::env::var(APP_NAMESPACE_ENV) {
            if !namespace.is_empty() {
                config.app_namespace = namespace;
            }
        }
        config
    }

    pub fn persists(&self, key: &str) -> bool {
        match &self.persist_keys {
            None => true,
            Some(keys) => keys.iter().any(|k| k == key),
        }
    }
}
