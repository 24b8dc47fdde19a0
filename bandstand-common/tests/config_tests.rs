//! Tests for configuration loading and root folder resolution
//!
//! Uses serial_test so tests touching BANDSTAND_ROOT_FOLDER never run in
//! parallel with each other.

use bandstand_common::config::{
    CompiledDefaults, LoggingConfig, MediaSearchConfig, RootFolderInitializer,
    RootFolderResolver, TomlConfig, DATABASE_FILE_NAME, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_arg_beats_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/bandstand-from-env");

    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/bandstand-from-cli")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/bandstand-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_beats_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "root_folder = \"/tmp/bandstand-from-toml\"\n").unwrap();

    env::set_var(ROOT_FOLDER_ENV, "/tmp/bandstand-from-env");
    let resolver = RootFolderResolver::new("test-module").with_config_file(Some(config_path));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/bandstand-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_config_file_used_when_no_override() {
    env::remove_var(ROOT_FOLDER_ENV);

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "root_folder = \"/tmp/bandstand-from-toml\"\n").unwrap();

    let resolver = RootFolderResolver::new("test-module").with_config_file(Some(config_path));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/bandstand-from-toml"));
}

#[test]
#[serial]
fn test_malformed_config_file_falls_back_to_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "root_folder = [not valid").unwrap();

    let resolver = RootFolderResolver::new("test-module").with_config_file(Some(config_path));
    assert_eq!(
        resolver.resolve(),
        CompiledDefaults::for_current_platform().root_folder
    );
}

#[test]
fn test_initializer_creates_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("level1").join("level2");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();
    // Idempotent
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE_NAME));
}

#[test]
fn test_toml_defaults_for_missing_sections() {
    let config: TomlConfig = toml::from_str("port = 6000\n").unwrap();

    assert_eq!(config.port, Some(6000));
    assert_eq!(config.logging, LoggingConfig::default());
    assert_eq!(config.logging.level, "info");
    assert!(config.media_search.is_none());
}

#[test]
fn test_media_search_section_defaults() {
    let toml_str = r#"
        [media_search]
        api_key = "secret"
    "#;

    let config: TomlConfig = toml::from_str(toml_str).unwrap();
    let search: MediaSearchConfig = config.media_search.unwrap();
    assert_eq!(search.api_key, "secret");
    assert_eq!(search.max_results, 10);
    assert!(search.base_url.starts_with("https://"));
}

#[test]
fn test_toml_roundtrip() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/band")),
        port: Some(5790),
        bind_address: Some("0.0.0.0".to_string()),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        media_search: None,
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed, config);
}
