use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::features::IconConfig;

#[derive(Debug, Clone)]
struct RegisteredIcon {
    owner: String,
    config: IconConfig,
}

/// Icons known to the shell and the stylesheet generated from them.
#[derive(Debug, Clone)]
pub struct IconRegistry {
    base_url: String,
    icons: IndexMap<String, RegisteredIcon>,
    stylesheet: String,
    generation: u64,
}

impl IconRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            icons: IndexMap::new(),
            stylesheet: String::new(),
            generation: 0,
        }
    }

    /// Adds or replaces an icon. Takes effect at the next stylesheet install.
    pub fn register(&mut self, owner: &str, name: impl Into<String>, config: IconConfig) {
        self.icons.insert(
            name.into(),
            RegisteredIcon {
                owner: owner.to_string(),
                config,
            },
        );
    }

    /// Removes every icon `owner` registered; returns how many went away.
    pub fn unregister_owner(&mut self, owner: &str) -> usize {
        let before = self.icons.len();
        self.icons.retain(|_, icon| icon.owner != owner);
        before - self.icons.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.icons.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// Regenerates the stylesheet: one class per icon variant.
    pub fn install_stylesheet(&mut self) {
        let mut css = String::new();
        for (name, RegisteredIcon { config, .. }) in &self.icons {
            for variant in &config.variants {
                // Writing into a String cannot fail.
                let _ = writeln!(
                    css,
                    ".nx-icon-{name}-{variant} {{ background: url({}/{variant}/{}) no-repeat center center !important; }}",
                    self.base_url, config.file
                );
            }
        }
        self.stylesheet = css;
        self.generation += 1;
        tracing::debug!(
            icons = self.icons.len(),
            generation = self.generation,
            "installed icon stylesheet"
        );
    }

    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// How many times the stylesheet has been installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
