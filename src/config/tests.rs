//! Tests for config functionality.

use crate::backoff::Backoff;
use crate::config::{CONFIG_FILE_NAME, Config, ObserveMode};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.lock_file, "lock.txt");
    assert_eq!(config.identity, None);
    assert!(!config.include_host);
    assert_eq!(config.poll_interval_ms, 100);
    assert_eq!(config.observe, ObserveMode::Last);
    assert_eq!(config.backoff, Backoff::default());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    // Should use all defaults
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
lock_file: /tmp/shared.lock
include_host: true
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.lock_file, "/tmp/shared.lock");
    assert!(config.include_host);

    // Unspecified values should use defaults
    assert_eq!(config.poll_interval_ms, 100);
    assert_eq!(config.backoff.max_attempts, 8);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
lock_file: shared.txt
identity: build-bot
include_host: true
poll_interval_ms: 250
observe: history
backoff:
  initial_ms: 5
  max_delay_ms: 40
  max_attempts: 4
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.lock_file, "shared.txt");
    assert_eq!(config.identity.as_deref(), Some("build-bot"));
    assert!(config.include_host);
    assert_eq!(config.poll_interval_ms, 250);
    assert_eq!(config.observe, ObserveMode::History);
    assert_eq!(
        config.backoff,
        Backoff {
            initial_ms: 5,
            max_delay_ms: 40,
            max_attempts: 4,
        }
    );
}

#[test]
fn test_partial_backoff_keeps_other_defaults() {
    let config = Config::from_yaml("backoff:\n  max_attempts: 2\n").unwrap();
    assert_eq!(config.backoff.max_attempts, 2);
    assert_eq!(config.backoff.initial_ms, Backoff::default().initial_ms);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
lock_file: a.txt
future_setting: 42
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.lock_file, "a.txt");
}

#[test]
fn test_validate_empty_lock_file_fails() {
    let err = Config::from_yaml("lock_file: \"\"").unwrap_err();
    assert!(err.to_string().contains("lock_file"));
}

#[test]
fn test_validate_zero_poll_interval_fails() {
    let err = Config::from_yaml("poll_interval_ms: 0").unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn test_validate_bad_identity_fails() {
    let err = Config::from_yaml("identity: \"x, timestamp: y\"").unwrap_err();
    assert!(err.to_string().contains("invalid identity"));
}

#[test]
fn test_validate_backoff_bounds() {
    let err = Config::from_yaml("backoff:\n  max_attempts: 0\n").unwrap_err();
    assert!(err.to_string().contains("max_attempts"));

    assert!(Config::from_yaml("backoff:\n  max_attempts: 100\n").is_ok());
    let err = Config::from_yaml("backoff:\n  max_attempts: 101\n").unwrap_err();
    assert!(err.to_string().contains("must not exceed 100"));

    let err = Config::from_yaml("backoff:\n  initial_ms: 900\n  max_delay_ms: 100\n").unwrap_err();
    assert!(err.to_string().contains("must not exceed"));
}

#[test]
fn test_invalid_yaml_is_user_error() {
    let err = Config::from_yaml("observe: [not, a, mode]").unwrap_err();
    assert!(err.to_string().contains("failed to parse config YAML"));
}

#[test]
fn test_roundtrip_through_yaml() {
    let config = Config {
        identity: Some("alice".to_string()),
        observe: ObserveMode::History,
        ..Config::default()
    };
    let yaml = config.to_yaml().unwrap();
    assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
}

#[test]
fn test_discover_prefers_explicit_then_directory_then_default() {
    let dir = TempDir::new().unwrap();
    assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "lock_file: found.txt\n").unwrap();
    assert_eq!(
        Config::discover(None, dir.path()).unwrap().lock_file,
        "found.txt"
    );

    let explicit = dir.path().join("other.yaml");
    std::fs::write(&explicit, "lock_file: explicit.txt\n").unwrap();
    assert_eq!(
        Config::discover(Some(&explicit), dir.path()).unwrap().lock_file,
        "explicit.txt"
    );
}

#[test]
fn test_load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(dir.path().join("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
