//! Tests for configuration loading and root folder resolution
//!
//! Tests that touch EXPERIENCIA_ROOT_FOLDER are marked #[serial] so they do
//! not race on the process environment.

use experiencia_common::config::{
    CompiledDefaults, ConfigSource, LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
    DEFAULT_APPLICATION_NAME, DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.port, DEFAULT_PORT);
    assert!(defaults.root_folder.to_string_lossy().contains("experiencia"));
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new().resolve();

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/experiencia-test-env-folder");

    let root_folder = RootFolderResolver::new().resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/experiencia-test-env-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_cli_arg_takes_precedence() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/experiencia-from-env");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/experiencia-from-toml")),
        ..TomlConfig::default()
    };
    let root_folder = RootFolderResolver::new()
        .with_cli_arg(Some(PathBuf::from("/tmp/experiencia-from-cli")))
        .with_config(&config)
        .resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/experiencia-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/experiencia-from-env");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/experiencia-from-toml")),
        ..TomlConfig::default()
    };
    let root_folder = RootFolderResolver::new().with_config(&config).resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/experiencia-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new().with_config(&config).resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/experiencia-from-toml"));
}

#[test]
fn test_initializer_paths() {
    let root = PathBuf::from("/tmp/experiencia-test-paths");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("experiencia.db"));
    assert_eq!(initializer.search_index_path(), root.join("search.db"));
    assert!(!initializer.database_exists());

    let config = TomlConfig {
        database_file: "primary.db".to_string(),
        search_file: "index.db".to_string(),
        ..TomlConfig::default()
    };
    let initializer = initializer.with_config(&config);
    assert_eq!(initializer.database_path(), root.join("primary.db"));
    assert_eq!(initializer.search_index_path(), root.join("index.db"));
}

#[test]
fn test_initializer_creates_directory_idempotently() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("a").join("b");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
}

#[test]
fn test_empty_toml_uses_defaults() {
    let config: TomlConfig = toml::from_str("").unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.application_name, DEFAULT_APPLICATION_NAME);
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn test_toml_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/experiencia"
port = 9090
application_name = "viajesApp"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/experiencia")));
    assert_eq!(config.port, 9090);
    assert_eq!(config.application_name, "viajesApp");
    assert_eq!(config.database_file, "experiencia.db");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    assert!(TomlConfig::load(&path).is_err());
    assert_eq!(TomlConfig::load_or_default(Some(&path)), TomlConfig::default());
}

#[test]
fn test_missing_explicit_file_falls_back_to_defaults() {
    let config = TomlConfig::load_or_default(Some(&PathBuf::from("/nonexistent/experiencia.toml")));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_load_with_source_reports_fallback() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let (config, source) = TomlConfig::load_with_source(Some(&path));
    assert_eq!(config, TomlConfig::default());
    match source {
        ConfigSource::Fallback(reason) => assert!(reason.contains("broken.toml")),
        other => panic!("Expected fallback, got {:?}", other),
    }

    let good = temp.path().join("good.toml");
    std::fs::write(&good, "port = 9191").unwrap();
    let (config, source) = TomlConfig::load_with_source(Some(&good));
    assert_eq!(config.port, 9191);
    assert_eq!(source, ConfigSource::File(good));
}
