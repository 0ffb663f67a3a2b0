//! Well-known state keys and the derived facts predicates ask about.

use serde_json::Value;

use crate::error::StateResult;
use crate::store::{StateRead, mismatch};

pub const BROWSER_SUPPORTED: &str = "browserSupported";
pub const REQUIRES_LICENSE: &str = "requiresLicense";
pub const LICENSE_INSTALLED: &str = "licenseInstalled";
pub const DEBUG: &str = "debug";
pub const PLUGINS: &str = "plugins";
pub const PERMISSIONS: &str = "permissions";
pub const ANALYTICS: &str = "analytics";

/// Clients are assumed supported until told otherwise.
pub fn browser_supported(state: &dyn StateRead) -> StateResult<bool> {
    state.flag_or(BROWSER_SUPPORTED, true)
}

/// Licensed when no license is required or one is installed.
pub fn licensed(state: &dyn StateRead) -> StateResult<bool> {
    if !state.flag_or(REQUIRES_LICENSE, false)? {
        return Ok(true);
    }
    state.flag_or(LICENSE_INSTALLED, false)
}

/// Only an explicit `true` enables debug mode.
pub fn debug_mode(state: &dyn StateRead) -> StateResult<bool> {
    Ok(matches!(state.get(DEBUG), Some(Value::Bool(true))))
}

pub fn plugin_active(state: &dyn StateRead, coordinates: &str) -> StateResult<bool> {
    Ok(state
        .string_list(PLUGINS)?
        .iter()
        .any(|installed| installed == coordinates))
}

/// Whether `action` is granted on `permission`. Grants live under
/// [`PERMISSIONS`] as `{ "<permission>": ["<action>", ...] }`.
pub fn permitted(state: &dyn StateRead, permission: &str, action: &str) -> StateResult<bool> {
    let grants = match state.get(PERMISSIONS) {
        None | Some(Value::Null) => return Ok(false),
        Some(Value::Object(grants)) => grants,
        Some(other) => return Err(mismatch(PERMISSIONS, "an object", other)),
    };
    match grants.get(permission) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Array(actions)) => Ok(actions.iter().any(|a| a.as_str() == Some(action))),
        Some(other) => Err(mismatch(PERMISSIONS, "a list of actions", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StateMap;
    use serde_json::json;

    fn state(pairs: &[(&str, serde_json::Value)]) -> StateMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn licensed_when_not_required() {
        assert!(licensed(&state(&[])).unwrap());
        assert!(licensed(&state(&[(REQUIRES_LICENSE, json!(false))])).unwrap());
    }

    #[test]
    fn license_required_needs_installation() {
        let missing = state(&[(REQUIRES_LICENSE, json!(true))]);
        assert!(!licensed(&missing).unwrap());
        let installed = state(&[
            (REQUIRES_LICENSE, json!(true)),
            (LICENSE_INSTALLED, json!(true)),
        ]);
        assert!(licensed(&installed).unwrap());
    }

    #[test]
    fn debug_mode_requires_literal_true() {
        assert!(!debug_mode(&state(&[])).unwrap());
        assert!(debug_mode(&state(&[(DEBUG, json!(true))])).unwrap());
        assert!(!debug_mode(&state(&[(DEBUG, json!(1))])).unwrap());
        assert!(!debug_mode(&state(&[(DEBUG, json!("on"))])).unwrap());
    }

    #[test]
    fn permitted_reads_grants() {
        let s = state(&[(PERMISSIONS, json!({ "nexus:analytics": ["read"] }))]);
        assert!(permitted(&s, "nexus:analytics", "read").unwrap());
        assert!(!permitted(&s, "nexus:analytics", "update").unwrap());
        assert!(!permitted(&s, "nexus:users", "read").unwrap());
        assert!(!permitted(&state(&[]), "nexus:analytics", "read").unwrap());
        assert!(permitted(&state(&[(PERMISSIONS, json!(["read"]))]), "x", "read").is_err());
    }

    #[test]
    fn plugin_active_checks_installed_list() {
        let s = state(&[(PLUGINS, json!(["org.example:audit", "org.example:ldap"]))]);
        assert!(plugin_active(&s, "org.example:ldap").unwrap());
        assert!(!plugin_active(&s, "org.example:crowd").unwrap());
    }
}
