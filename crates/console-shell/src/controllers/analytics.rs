//! Analytics settings page.
//!
//! Contributes the admin feature at `/Support/Analytics`, visible to
//! operators holding `nexus:analytics` read permission, and mirrors the
//! saved form into the `analytics` state key.

use std::sync::Arc;

use console_state::{StateRead, StateStore, keys};
use serde_json::json;

use crate::controller::{Controller, ShellContext};
use crate::error::ShellError;
use crate::event_bus::{BusEvent, EventSelector, SETTINGS_SUBMITTED};
use crate::features::{Feature, FeatureMode, IconConfig};

pub const ID: &str = "AnalyticsSettings";
/// Source name of the settings form this controller listens to.
pub const FORM: &str = "analytics";
pub const PATH: &str = "/Support/Analytics";
pub const PERMISSION: &str = "nexus:analytics";

#[derive(Debug, Default)]
pub struct AnalyticsSettings;

impl AnalyticsSettings {
    fn feature() -> Feature {
        Feature {
            mode: FeatureMode::Admin,
            path: PATH.into(),
            description: "Manage analytics configuration".into(),
            view: "nx-coreui-analytics-settings".into(),
            icon: Some(IconConfig {
                file: "system_monitor.png".into(),
                variants: vec!["x16".into(), "x32".into()],
            }),
            visible: Some(Arc::new(|state: &dyn StateRead| {
                keys::permitted(state, PERMISSION, "read")
            })),
        }
    }
}

impl Controller for AnalyticsSettings {
    fn init(&mut self, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        ctx.register_feature(Self::feature())?;
        ctx.listen(
            EventSelector::new(SETTINGS_SUBMITTED).from_source(FORM),
            Box::new(on_settings_submitted),
        );
        Ok(())
    }
}

/// Stores `{ "enabled": <collection> }` under the `analytics` key.
fn on_settings_submitted(event: &BusEvent, state: &mut StateStore) -> Result<(), ShellError> {
    let enabled = event
        .payload
        .pointer("/data/collection")
        .and_then(|value| value.as_bool())
        .ok_or_else(|| ShellError::Controller {
            id: ID.into(),
            message: "settings submission is missing a boolean 'collection'".into(),
        })?;
    state.set(keys::ANALYTICS, json!({ "enabled": enabled }));
    Ok(())
}
