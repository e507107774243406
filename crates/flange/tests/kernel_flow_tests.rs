//! End-to-end tests for the kernel flow
//!
//! Configuration files on disk are loaded with the hierarchical loader,
//! validated by the built-in extensions and wired into a container, the
//! same path `flange config validate` takes.

use camino::Utf8PathBuf;
use flange_core::config::OVERRIDE_PREFIX;
use flange_core::{HierarchicalConfigLoader, KernelSettings};
use flange_extensions::builtin::{self, APPLICATION_ID, DISPATCHER_ID, POOL_TAG};
use flange_extensions::{
    ContainerBuilder, ExtensionError, ExtensionRegistry, ExtensionState, RegistryStatus,
    ServiceContainer,
};
use serde_json::json;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const MAIN_CONFIG: &str = r#"
console:
    name: Shop
    version: 2.1
cache:
    prefix_seed: shop
    pools:
        sessions:
            adapters: cache.adapter.redis
            default_lifetime: 3600
        products:
            adapters: [cache.adapter.apcu, cache.adapter.filesystem]
            tags: true
routing:
    routes:
        - { name: home, path: /, controller: "app::Home" }
        - { path: /cart, controller: "app::Cart", methods: [get, post] }
"#;

fn project(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    for (name, content) in files {
        fs::write(root.join(name), content).unwrap();
    }
    (dir, root)
}

fn registry(capabilities: &[&str]) -> ExtensionRegistry {
    let mut builder = ExtensionRegistry::builder();
    builtin::register_all(&mut builder).unwrap();
    for capability in capabilities {
        builder.provide(*capability);
    }
    builder.build().unwrap()
}

fn boot(
    root: &Utf8PathBuf,
    environment: &str,
    vars: Vec<(String, String)>,
) -> Result<(ExtensionRegistry, ContainerBuilder), ExtensionError> {
    let loader = HierarchicalConfigLoader::with_dir(KernelSettings::new(environment, false), root.clone())
        .with_vars(vars);
    let raw = loader.load(None).unwrap();

    let mut registry = registry(&["asset"]);
    let mut container = ContainerBuilder::new();
    registry.load(&mut container, &raw.value)?;
    Ok((registry, container))
}

#[test]
fn test_full_project_boots() {
    let (_dir, root) = project(&[("flange.yaml", MAIN_CONFIG)]);
    let (registry, container) = boot(&root, "dev", vec![]).unwrap();

    assert_eq!(registry.status(), RegistryStatus::Loaded);
    assert_eq!(registry.state("asset"), Some(ExtensionState::Skipped));
    assert_eq!(registry.state("console"), Some(ExtensionState::Booted));

    let app = container.get(APPLICATION_ID).unwrap();
    assert_eq!(app.arguments, vec![json!("Shop"), json!("2.1"), json!(true)]);
    assert!(container.has(DISPATCHER_ID));

    let pools: Vec<&str> = container.tagged(POOL_TAG).into_iter().map(|(id, _)| id).collect();
    assert_eq!(pools, vec!["cache.pool.products", "cache.pool.sessions"]);
    assert_eq!(container.get("cache.pool.sessions").unwrap().entity, "cache.adapter.redis");
}

#[test]
fn test_environment_overlay_is_merged() {
    let (_dir, root) = project(&[
        ("flange.yaml", MAIN_CONFIG),
        ("flange.prod.yaml", "console:\n    catch_exceptions: false\n"),
    ]);

    let (_, container) = boot(&root, "prod", vec![]).unwrap();
    let app = container.get(APPLICATION_ID).unwrap();
    assert_eq!(app.arguments[0], json!("Shop"));
    assert_eq!(app.arguments[2], json!(false));

    let (_, container) = boot(&root, "dev", vec![]).unwrap();
    assert_eq!(container.get(APPLICATION_ID).unwrap().arguments[2], json!(true));
}

#[test]
fn test_override_variable_reaches_extension() {
    let (_dir, root) = project(&[("flange.yaml", MAIN_CONFIG)]);
    let vars = vec![(format!("{}CONSOLE__NAME", OVERRIDE_PREFIX), "Backoffice".to_string())];

    let (_, container) = boot(&root, "dev", vars).unwrap();
    assert_eq!(container.get(APPLICATION_ID).unwrap().arguments[0], json!("Backoffice"));
}

#[test]
fn test_env_placeholder_resolved_before_validation() {
    let (_dir, root) = project(&[(
        "flange.yaml",
        "console:\n    name: '%env(APP_NAME)%'\n",
    )]);
    let vars = vec![("APP_NAME".to_string(), "Storefront".to_string())];

    let (_, container) = boot(&root, "dev", vars).unwrap();
    assert_eq!(container.get(APPLICATION_ID).unwrap().arguments[0], json!("Storefront"));
}

#[test]
fn test_invalid_section_leaves_container_empty() {
    let (_dir, root) = project(&[(
        "flange.yaml",
        "console:\n    name: ''\nrouting:\n    routes:\n        - { path: cart, controller: x }\n",
    )]);

    let loader = HierarchicalConfigLoader::with_dir(KernelSettings::default(), root.clone());
    let raw = loader.load(None).unwrap();
    let mut registry = registry(&[]);
    let mut container = ContainerBuilder::new();

    let err = registry.load(&mut container, &raw.value).unwrap_err();
    assert!(matches!(err, ExtensionError::Validation { .. }));
    assert!(err.is_user_error());
    assert!(container.is_empty());
    assert_eq!(registry.status(), RegistryStatus::Failed);
}

#[test]
fn test_unknown_section_is_rejected() {
    let (_dir, root) = project(&[("flange.yaml", "doctrine:\n    dbal: ~\n")]);

    let err = boot(&root, "dev", vec![]).unwrap_err();
    match err {
        ExtensionError::UnknownConfigSection { section, .. } => assert_eq!(section, "doctrine"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_missing_file_yields_defaults() {
    let (_dir, root) = project(&[]);
    let (registry, container) = boot(&root, "dev", vec![]).unwrap();

    assert_eq!(registry.status(), RegistryStatus::Loaded);
    assert_eq!(
        container.get(APPLICATION_ID).unwrap().arguments,
        vec![json!("Flange"), json!("UNKNOWN"), json!(true)]
    );
}

#[test]
#[serial]
fn test_process_environment_snapshot() {
    let (_dir, root) = project(&[("flange.yaml", "console:\n    name: '%env(FLANGE_TEST_APP)%'\n")]);
    std::env::set_var("FLANGE_TEST_APP", "FromProcess");

    let loader = HierarchicalConfigLoader::with_dir(KernelSettings::default(), root.clone())
        .with_vars(std::env::vars());
    let raw = loader.load(None);
    std::env::remove_var("FLANGE_TEST_APP");

    assert_eq!(raw.unwrap().value["console"]["name"], json!("FromProcess"));
}
