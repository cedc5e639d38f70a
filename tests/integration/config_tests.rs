//! Integration tests for layered configuration.

use std::fs;
use std::sync::Mutex;

use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use tempfile::tempdir;
use vault_revealer::config::{Config, ConfigError, ENV_PREFIX};

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all VAULT_REVEALER_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with(ENV_PREFIX) {
            std::env::remove_var(key);
        }
    }
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
sidecar_suffix = ".held"
poll_interval_ms = 250
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.sidecar_suffix, ".held");
    assert_eq!(config.poll_interval_ms, 250);
    assert!(!config.accessible);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "poll_interval_ms = 250\naccessible = false\n").unwrap();

    std::env::set_var("VAULT_REVEALER_POLL_INTERVAL_MS", "40");
    std::env::set_var("VAULT_REVEALER_ACCESSIBLE", "true");
    let config = Config::load(Some(&path));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.poll_interval_ms, 40);
    assert!(config.accessible);
}

#[test]
fn test_cli_overrides_everything() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("VAULT_REVEALER_SIDECAR_SUFFIX", ".from-env");
    let config = Config::load(None);
    clear_env();

    let mut config = config.unwrap();
    assert_eq!(config.sidecar_suffix, ".from-env");
    config.merge_cli(Some(".from-cli"), false);
    assert_eq!(config.sidecar_suffix, ".from-cli");
}

#[test]
fn test_invalid_value_in_file_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "poll_interval_ms = 0\n").unwrap();

    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::Invalid {
            field: "poll_interval_ms",
            ..
        })
    ));
}

#[test]
fn test_wrong_type_is_a_load_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "poll_interval_ms = \"soon\"\n").unwrap();

    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = Config {
        sidecar_suffix: ".x".to_string(),
        poll_interval_ms: 7,
        accessible: true,
    };
    let content = toml::to_string_pretty(&config).unwrap();
    assert!(content.contains("sidecar_suffix = \".x\""));

    let parsed: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string(&content))
        .extract()
        .unwrap();
    assert_eq!(parsed, config);
}
