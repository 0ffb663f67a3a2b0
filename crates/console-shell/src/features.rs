use std::fmt;
use std::sync::Arc;

use console_state::{StateRead, StateResult};
use serde::Serialize;

use crate::error::ShellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    Admin,
    Browse,
    User,
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureMode::Admin => "admin",
            FeatureMode::Browse => "browse",
            FeatureMode::User => "user",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconConfig {
    pub file: String,
    pub variants: Vec<String>,
}

pub type VisibilityPredicate = Arc<dyn Fn(&dyn StateRead) -> StateResult<bool> + Send + Sync>;

/// A navigable page contributed by a controller.
#[derive(Clone, Serialize)]
pub struct Feature {
    pub mode: FeatureMode,
    pub path: String,
    pub description: String,
    pub view: String,
    pub icon: Option<IconConfig>,
    #[serde(skip)]
    pub visible: Option<VisibilityPredicate>,
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("mode", &self.mode)
            .field("path", &self.path)
            .field("view", &self.view)
            .field("icon", &self.icon)
            .field("guarded", &self.visible.is_some())
            .finish()
    }
}

impl Feature {
    /// Icon name derived from mode and path, e.g. `feature-admin-support-analytics`.
    pub fn icon_name(&self) -> String {
        let slug: Vec<String> = self
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_ascii_lowercase().replace(' ', ""))
            .collect();
        format!("feature-{}-{}", self.mode, slug.join("-"))
    }

    fn is_visible(&self, state: &dyn StateRead) -> bool {
        let Some(predicate) = &self.visible else {
            return true;
        };
        match predicate(state) {
            Ok(visible) => visible,
            Err(err) => {
                tracing::warn!(path = %self.path, "feature visibility check failed: {err}");
                false
            }
        }
    }
}

#[derive(Debug)]
struct RegisteredFeature {
    owner: String,
    feature: Feature,
}

#[derive(Debug, Default)]
pub struct FeatureRegistry {
    features: Vec<RegisteredFeature>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, owner: &str, feature: Feature) -> Result<(), ShellError> {
        if !feature.path.starts_with('/') || feature.path.len() < 2 {
            return Err(ShellError::InvalidFeature(format!(
                "path '{}' must start with '/' and name a page",
                feature.path
            )));
        }
        if self
            .features
            .iter()
            .any(|r| r.feature.mode == feature.mode && r.feature.path == feature.path)
        {
            return Err(ShellError::DuplicateFeature {
                mode: feature.mode.to_string(),
                path: feature.path,
            });
        }
        tracing::debug!(owner, path = %feature.path, "registered feature");
        self.features.push(RegisteredFeature {
            owner: owner.to_string(),
            feature,
        });
        Ok(())
    }

    /// Removes everything `owner` registered; returns how many went away.
    pub fn unregister_owner(&mut self, owner: &str) -> usize {
        let before = self.features.len();
        self.features.retain(|r| r.owner != owner);
        before - self.features.len()
    }

    pub fn get(&self, mode: FeatureMode, path: &str) -> Option<&Feature> {
        self.features
            .iter()
            .map(|r| &r.feature)
            .find(|f| f.mode == mode && f.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().map(|r| &r.feature)
    }

    /// Features whose visibility predicate passes. A failing predicate hides
    /// the feature.
    pub fn visible<'a>(&'a self, state: &'a dyn StateRead) -> impl Iterator<Item = &'a Feature> + 'a {
        self.iter().filter(move |f| f.is_visible(state))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_state::{StateMap, keys};
    use serde_json::json;

    fn feature(path: &str) -> Feature {
        Feature {
            mode: FeatureMode::Admin,
            path: path.into(),
            description: "test".into(),
            view: "test-view".into(),
            icon: None,
            visible: None,
        }
    }

    #[test]
    fn rejects_duplicates_and_bad_paths() {
        let mut registry = FeatureRegistry::new();
        registry.register("A", feature("/Support/Analytics")).unwrap();
        assert!(matches!(
            registry.register("B", feature("/Support/Analytics")),
            Err(ShellError::DuplicateFeature { .. })
        ));
        assert!(matches!(
            registry.register("B", feature("Support")),
            Err(ShellError::InvalidFeature(_))
        ));
        let mut browse = feature("/Support/Analytics");
        browse.mode = FeatureMode::Browse;
        registry.register("B", browse).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unregisters_by_owner() {
        let mut registry = FeatureRegistry::new();
        registry.register("A", feature("/One")).unwrap();
        registry.register("B", feature("/Two")).unwrap();
        assert_eq!(registry.unregister_owner("A"), 1);
        assert!(registry.get(FeatureMode::Admin, "/One").is_none());
        assert!(registry.get(FeatureMode::Admin, "/Two").is_some());
    }

    #[test]
    fn visibility_follows_permissions() {
        let mut registry = FeatureRegistry::new();
        let mut guarded = feature("/Support/Analytics");
        guarded.visible = Some(Arc::new(|state: &dyn StateRead| {
            keys::permitted(state, "nexus:analytics", "read")
        }));
        registry.register("A", guarded).unwrap();
        registry.register("B", feature("/Open")).unwrap();

        let mut state = StateMap::new();
        let paths: Vec<_> = registry.visible(&state).map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec!["/Open"]);

        state.insert(keys::PERMISSIONS.into(), json!({ "nexus:analytics": ["read"] }));
        assert_eq!(registry.visible(&state).count(), 2);

        state.insert(keys::PERMISSIONS.into(), json!("everything"));
        assert_eq!(registry.visible(&state).count(), 1);
    }

    #[test]
    fn icon_name_is_derived_from_mode_and_path() {
        assert_eq!(
            feature("/Support/Analytics").icon_name(),
            "feature-admin-support-analytics"
        );
    }
}
