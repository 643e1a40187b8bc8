use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use filesame::cli::OutputFormat;
use filesame::config::Config;
use filesame::duplicates::Backend;
use std::fs;
use tempfile::tempdir;

use crate::ENV_MUTEX;

/// Clear all FILESAME_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("FILESAME_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_load_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    let config = Config::load_from_path(dir.path().join("missing.toml"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
ignore_case = true
max_bytes = 4096
two_stage = true
separator = "\t"
backend = "hashed"
output = "json"
size_check = false
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path);
    assert!(config.ignore_case);
    assert!(!config.ignore_whitespace);
    assert_eq!(config.max_bytes, 4096);
    assert!(config.two_stage);
    assert_eq!(config.separator, "\t");
    assert_eq!(config.backend, Backend::Hashed);
    assert_eq!(config.output, OutputFormat::Json);
    assert!(!config.size_check);
    assert_eq!(config.buffer_size, 1024);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "max_bytes = 100\nbuffer_size = 64\n").unwrap();

    std::env::set_var("FILESAME_MAX_BYTES", "200");
    std::env::set_var("FILESAME_PRINT_DIGEST", "true");
    let config = Config::load_from_path(&path);
    clear_env();

    assert_eq!(config.max_bytes, 200);
    assert_eq!(config.buffer_size, 64);
    assert!(config.print_digest);
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "max_bytes = \"lots\"").unwrap();

    let strict: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract();
    assert!(strict.is_err());

    assert_eq!(Config::load_from_path(&path), Config::default());
}

#[test]
fn test_figment_stack_order() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("FILESAME_SEPARATOR", ";");
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("FILESAME_"))
        .extract()
        .unwrap();
    clear_env();
    assert_eq!(config.separator, ";");
}

#[test]
fn test_config_roundtrips_through_toml() {
    let config = Config {
        ignore_whitespace: true,
        backend: Backend::Hashed,
        ..Config::default()
    };
    let content = toml::to_string_pretty(&config).unwrap();
    assert!(content.contains("ignore_whitespace = true"));
    assert!(content.contains("backend = \"hashed\""));
    let parsed: Config = toml::from_str(&content).unwrap();
    assert_eq!(parsed, config);
}
