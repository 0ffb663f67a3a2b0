#[path = "helpers.rs"]
mod helpers;

use console_plugins::{PluginDescriptor, PredicateTable, SyncError};
use console_shell::{
    Application, BusEvent, FeatureMode, MessageKind, ShellConfig, ShellError,
    controllers::analytics,
};
use console_state::{StateRead, keys};
use helpers::{failing_factory, journal, recording_factory, take};
use serde_json::json;

fn plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::from_json_str(
            "nexus-coreui-plugin",
            r#"{
                "namespaces": "NX.coreui",
                "controllers": [
                    "Audit",
                    { "id": "AnalyticsSettings", "active": "licensed" },
                    { "id": "DevConsole", "active": "debugMode" }
                ]
            }"#,
        )
        .unwrap(),
        PluginDescriptor::from_json_str(
            "nexus-proui-plugin",
            r#"{ "name": "nexus-proui-plugin", "controllers": [{ "id": "Audit", "active": false }] }"#,
        )
        .unwrap(),
    ]
}

fn app(factory: console_shell::ControllerFactory) -> Application {
    Application::new(
        ShellConfig::default(),
        &plugins(),
        &PredicateTable::with_builtins(),
        factory,
    )
    .unwrap()
}

#[test]
fn start_creates_active_controllers_in_order() {
    let journal = journal();
    let mut app = app(recording_factory(&journal));

    let report = app.start().unwrap();
    assert_eq!(report.created, vec![analytics::ID]);
    assert_eq!(app.active_controllers(), vec![analytics::ID]);
    assert!(take(&journal).is_empty());
    assert_eq!(
        app.requires(),
        vec![
            "NX.controller.Audit",
            "NX.controller.AnalyticsSettings",
            "NX.controller.DevConsole"
        ]
    );
}

#[test]
fn debug_flag_toggles_the_dev_console() {
    let journal = journal();
    let mut app = app(recording_factory(&journal));
    app.start().unwrap();

    let report = app.set_state(keys::DEBUG, json!(true)).unwrap().unwrap();
    assert_eq!(report.created, vec!["DevConsole"]);
    assert_eq!(
        take(&journal),
        vec!["init:DevConsole", "launch:DevConsole", "finish:DevConsole"]
    );

    app.set_state(keys::DEBUG, json!(false)).unwrap();
    assert_eq!(take(&journal), vec!["destroy:DevConsole"]);
    assert_eq!(app.active_controllers(), vec![analytics::ID]);
}

#[test]
fn second_sync_is_a_no_op() {
    let journal = journal();
    let mut app = app(recording_factory(&journal));
    app.set_state(keys::DEBUG, json!(true)).unwrap();
    app.start().unwrap();
    take(&journal);
    let generation = app.icons().generation();

    let report = app.sync_managed_controllers().unwrap();
    assert!(!report.changed());
    assert!(take(&journal).is_empty());
    assert_eq!(app.icons().generation(), generation);
}

#[test]
fn license_requirement_drives_analytics() {
    let journal = journal();
    let mut app = app(recording_factory(&journal));
    app.start().unwrap();

    let report = app.set_state(keys::REQUIRES_LICENSE, json!(true)).unwrap().unwrap();
    assert_eq!(report.destroyed, vec![analytics::ID]);
    assert!(app.features().get(FeatureMode::Admin, analytics::PATH).is_none());
    assert!(!app.icons().contains("feature-admin-support-analytics"));
    assert!(!app.icons().stylesheet().contains("support-analytics"));

    let report = app.set_state(keys::LICENSE_INSTALLED, json!(true)).unwrap().unwrap();
    assert_eq!(report.created, vec![analytics::ID]);
    assert!(app.features().get(FeatureMode::Admin, analytics::PATH).is_some());
}

#[test]
fn analytics_form_submission_round_trip() {
    let mut app = app(recording_factory(&journal()));
    app.start().unwrap();
    assert!(app.visible_features().is_empty());

    app.set_state(keys::PERMISSIONS, json!({ "nexus:analytics": ["read"] }))
        .unwrap();
    assert_eq!(app.visible_features().len(), 1);
    assert!(app.icons().stylesheet().contains("feature-admin-support-analytics-x16"));

    app.dispatch(BusEvent::settings_submitted(
        analytics::FORM,
        json!({ "collection": false }),
    ))
    .unwrap();
    assert_eq!(
        app.state().get(keys::ANALYTICS),
        Some(&json!({ "enabled": false }))
    );
}

#[test]
fn hook_failures_are_reported_and_the_pass_continues() {
    let journal = journal();
    let mut app = app(failing_factory(&journal, &["launch"]));
    app.set_state(keys::DEBUG, json!(true)).unwrap();

    let report = app.start().unwrap();
    assert_eq!(report.created, vec![analytics::ID, "DevConsole"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        take(&journal),
        vec!["init:DevConsole", "launch:DevConsole", "finish:DevConsole"]
    );

    let message = app.messages().latest().unwrap();
    assert_eq!(message.kind, MessageKind::Danger);
    assert_eq!(
        message.text,
        "DevConsole.launch(): controller 'DevConsole' failed: launch refused"
    );
}

#[test]
fn failed_init_leaves_the_controller_dead_until_the_next_pass() {
    let journal = journal();
    let mut app = app(failing_factory(&journal, &["init"]));
    app.set_state(keys::DEBUG, json!(true)).unwrap();

    let report = app.start().unwrap();
    assert_eq!(report.created, vec![analytics::ID]);
    assert_eq!(report.failures[0].id, "DevConsole");

    app.sync_managed_controllers().unwrap();
    assert_eq!(take(&journal), vec!["init:DevConsole", "init:DevConsole"]);
    assert_eq!(app.active_controllers(), vec![analytics::ID]);
}

#[test]
fn malformed_state_aborts_the_pass() {
    let journal = journal();
    let mut app = app(recording_factory(&journal));
    app.start().unwrap();

    let err = app.set_state(keys::REQUIRES_LICENSE, json!("yes")).unwrap_err();
    assert!(matches!(
        err,
        ShellError::Sync(SyncError::Predicate { ref id, .. }) if id == analytics::ID
    ));
    assert_eq!(app.active_controllers(), vec![analytics::ID]);
}

#[test]
fn state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = ShellConfig {
        state_path: Some(dir.path().join("state.json")),
        persist_keys: Some(vec![keys::DEBUG.to_string()]),
        ..ShellConfig::default()
    };

    let mut first = Application::new(
        config.clone(),
        &plugins(),
        &PredicateTable::with_builtins(),
        recording_factory(&journal()),
    )
    .unwrap();
    first.set_state(keys::DEBUG, json!(true)).unwrap();
    first.set_state(keys::PERMISSIONS, json!({})).unwrap();
    first.shutdown();

    let mut second = Application::new(
        config,
        &plugins(),
        &PredicateTable::with_builtins(),
        recording_factory(&journal()),
    )
    .unwrap();
    assert!(!second.state().contains(keys::PERMISSIONS));
    let report = second.start().unwrap();
    assert_eq!(report.created, vec![analytics::ID, "DevConsole"]);
}
