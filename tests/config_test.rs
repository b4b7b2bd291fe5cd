//! Integration tests for configuration loading

use memtrace::config::{validate_config, ConfigError, ConfigLoader, TracerConfig};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_full_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memtrace.toml");
    fs::write(
        &path,
        r#"
            [channel]
            name = "LeakHunterPipe"
            greeting = "ahoy"

            [hooks]
            require_collector = false

            [logging]
            enabled = true
            level = "debug"
            file = "/var/log/memtrace.log"
        "#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    assert_eq!(config.channel.name, "LeakHunterPipe");
    assert_eq!(config.channel.greeting, "ahoy");
    assert!(!config.hooks.require_collector);
    assert!(config.logging.enabled);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_empty_file_is_all_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memtrace.toml");
    fs::write(&path, "").unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    assert_eq!(config, TracerConfig::default());
}

#[test]
fn test_loaded_but_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memtrace.toml");
    fs::write(&path, "[channel]\nname = \"../escape\"\n").unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_untraceable_export_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memtrace.toml");
    fs::write(&path, "[hooks]\nallocate_export = \"calloc\"\n").unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(message) if message.contains("calloc")));
}

#[test]
fn test_wrong_type_is_a_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memtrace.toml");
    fs::write(&path, "[hooks]\nrequire_collector = \"yes\"\n").unwrap();

    let result = ConfigLoader::new(&path).load();
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    assert_eq!(ConfigLoader::new(&path).load_or_default(), TracerConfig::default());
}

#[test]
fn test_saved_file_is_readable_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memtrace.toml");

    ConfigLoader::new(&path)
        .save(&TracerConfig::default())
        .unwrap();
    let contents = fs::read_to_string(&path).unwrap();

    assert!(contents.contains("[channel]"));
    assert!(contents.contains("MemTraceCollectorPipe"));
    assert!(contents.contains("require_collector = true"));
}
