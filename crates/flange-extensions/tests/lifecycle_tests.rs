//! Load lifecycle integration tests
//!
//! Tests the two-phase load including:
//! - Every register before any boot
//! - Validation and capability checks before any register
//! - Unknown config sections
//! - Failure handling and the event log

mod common;

use common::*;
use flange_extensions::{
    ContainerBuilder, ExtensionError, ExtensionEvent, ExtensionRegistry, ExtensionState,
    RegistryStatus, ServiceContainer,
};
use serde_json::json;

#[test]
fn test_all_registers_precede_all_boots() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("a", &tracker).build(),
        ExtensionBuilder::new("b", &tracker).depends_on("a").build(),
    ]);
    let mut container = ContainerBuilder::new();
    registry.load(&mut container, &json!({})).unwrap();

    assert_eq!(
        tracker.call_order(),
        vec!["a:register", "b:register", "a:boot", "b:boot"]
    );
    assert_eq!(registry.status(), RegistryStatus::Loaded);
    assert_eq!(registry.state("b"), Some(ExtensionState::Booted));
}

#[test]
fn test_boot_sees_tags_contributed_by_later_extensions() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("collector", &tracker)
            .observes("app.listener")
            .build(),
        ExtensionBuilder::new("plugin", &tracker)
            .depends_on("collector")
            .contributes("app.listener")
            .build(),
    ]);
    let mut container = ContainerBuilder::new();
    registry.load(&mut container, &json!({})).unwrap();

    // during register the plugin has not run yet; by boot it has
    assert!(tracker.was_called("collector", "register-saw-0"));
    assert!(tracker.was_called("collector", "boot-saw-1"));
}

#[test]
fn test_validation_error_aborts_before_register() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("logger", &tracker).build(),
        ExtensionBuilder::new("database", &tracker)
            .schema(database_schema)
            .build(),
    ]);
    let mut container = ContainerBuilder::new();
    let raw = yaml("database:\n  pool_size: 0\n  dsn: sqlite://memory\n");

    let err = registry.load(&mut container, &raw).unwrap_err();
    assert_validation_error(&err, "database", &["database.pool_size", "too small"]);
    assert_nothing_registered(&tracker);
    assert!(container.is_empty());
    assert_eq!(registry.status(), RegistryStatus::Failed);
}

#[test]
fn test_absent_section_still_enforces_required_keys() {
    let tracker = CallTracker::new();
    let registry = registry_of(vec![ExtensionBuilder::new("database", &tracker)
        .schema(database_schema)
        .build()]);

    let err = registry.validate(&json!({})).unwrap_err();
    assert_validation_error(&err, "database", &["database.dsn", "must be configured"]);
}

#[test]
fn test_missing_capability_aborts_before_register() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("events", &tracker).build(),
        ExtensionBuilder::new("mailer", &tracker).requires("mailer").build(),
    ]);
    let mut container = ContainerBuilder::new();

    let err = registry.load(&mut container, &json!({})).unwrap_err();
    match &err {
        ExtensionError::MissingDependency {
            alias,
            capability,
            hint,
        } => {
            assert_eq!(alias, "mailer");
            assert_eq!(capability, "mailer");
            assert!(hint.contains("Install the mailer component"));
        }
        other => panic!("Expected MissingDependency, got {:?}", other),
    }
    assert_nothing_registered(&tracker);
}

#[test]
fn test_unknown_section_is_rejected() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("cache", &tracker).build(),
        ExtensionBuilder::new("asset", &tracker).build(),
    ]);
    let mut container = ContainerBuilder::new();

    let err = registry
        .load(&mut container, &json!({ "cache": {}, "cahce": {} }))
        .unwrap_err();
    match &err {
        ExtensionError::UnknownConfigSection { section, available } => {
            assert_eq!(section, "cahce");
            assert_eq!(available, "\"asset\", \"cache\"");
        }
        other => panic!("Expected UnknownConfigSection, got {:?}", other),
    }
    assert_nothing_registered(&tracker);
}

#[test]
fn test_register_failure_skips_boot() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("a", &tracker).build(),
        ExtensionBuilder::new("b", &tracker).failing_register().build(),
        ExtensionBuilder::new("c", &tracker).build(),
    ]);
    let mut container = ContainerBuilder::new();

    let err = registry.load(&mut container, &json!({})).unwrap_err();
    assert!(matches!(err, ExtensionError::Register { ref alias, .. } if alias == "b"));
    assert_eq!(tracker.call_order(), vec!["a:register", "b:register"]);
    assert_eq!(registry.state("a"), Some(ExtensionState::Registered));
    assert_eq!(registry.state("c"), Some(ExtensionState::Unregistered));

    let again = registry.load(&mut container, &json!({})).unwrap_err();
    assert!(matches!(again, ExtensionError::InvalidState { .. }));
}

#[test]
fn test_boot_failure_is_attributed() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![ExtensionBuilder::new("a", &tracker)
        .failing_boot()
        .build()]);
    let mut container = ContainerBuilder::new();

    let err = registry.load(&mut container, &json!({})).unwrap_err();
    assert_eq!(err.to_string(), "Extension \"a\" failed to boot: boot failed for a");
}

#[test]
fn test_disabled_section_is_skipped() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("a", &tracker).build(),
        ExtensionBuilder::new("b", &tracker).build(),
    ]);
    let mut container = ContainerBuilder::new();
    registry
        .load(&mut container, &json!({ "b": false }))
        .unwrap();

    assert_eq!(registry.state("b"), Some(ExtensionState::Skipped));
    assert!(!tracker.was_called("b", "register"));
    assert!(!container.has("b.service"));
    assert!(container.has("a.service"));
}

#[test]
fn test_register_receives_normalized_config() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![ExtensionBuilder::new("database", &tracker)
        .schema(database_schema)
        .build()]);
    let mut container = ContainerBuilder::new();
    registry
        .load(&mut container, &yaml("database:\n  dsn: sqlite://memory\n  pool_size: '8'\n"))
        .unwrap();

    let definition = container.get("database.service").unwrap();
    assert_eq!(
        definition.arguments,
        vec![json!({ "dsn": "sqlite://memory", "pool_size": 8 })]
    );
    assert_eq!(
        registry.config("database").unwrap().get("pool_size"),
        Some(&json!(8))
    );
}

#[test]
fn test_event_log() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![
        ExtensionBuilder::new("a", &tracker).build(),
        ExtensionBuilder::new("b", &tracker).opt_in().build(),
    ]);
    let mut container = ContainerBuilder::new();
    registry.load(&mut container, &json!({ "a": {} })).unwrap();

    let kinds: Vec<String> = registry
        .events()
        .iter()
        .map(|e| match &e.event {
            ExtensionEvent::ConfigValidated { extension_name, .. } => {
                format!("validated:{}", extension_name)
            }
            ExtensionEvent::Skipped { extension_name, .. } => format!("skipped:{}", extension_name),
            ExtensionEvent::Registered { extension_name, .. } => {
                format!("registered:{}", extension_name)
            }
            ExtensionEvent::Booted { extension_name, .. } => format!("booted:{}", extension_name),
            ExtensionEvent::LoadFailed { .. } => "failed".to_string(),
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["validated:a", "skipped:b", "registered:a", "booted:a"]
    );

    let sequences: Vec<u64> = registry.events().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3]);
}

#[test]
fn test_failed_load_is_logged() {
    let tracker = CallTracker::new();
    let mut registry = registry_of(vec![ExtensionBuilder::new("a", &tracker)
        .failing_register()
        .build()]);
    let mut container = ContainerBuilder::new();
    let _ = registry.load(&mut container, &json!({}));

    let last = registry.events().last().unwrap();
    assert_eq!(
        last.event,
        ExtensionEvent::LoadFailed {
            extension_name: Some("a".to_string()),
            error_message: "Extension \"a\" failed to register: register failed for a"
                .to_string(),
        }
    );
}

#[test]
fn test_empty_registry_loads() {
    let mut registry = ExtensionRegistry::builder().build().unwrap();
    let mut container = ContainerBuilder::new();
    registry.load(&mut container, &serde_json::Value::Null).unwrap();
    assert!(registry.is_empty());
    assert!(registry.events().is_empty());
}
