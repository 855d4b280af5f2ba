//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use super::paths::resolve_config_path;
use careportal_common::ConfigError;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_careportal_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[realtime]
endpoint = "wss://portal.example.org/ws"
reconnect_base_delay_ms = 500
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.endpoint, "wss://portal.example.org/ws");
    assert_eq!(config.realtime.reconnect_base_delay_ms, 500);
    // Defaults preserved
    assert_eq!(config.realtime.max_reconnect_attempts, 5);
    assert_eq!(config.realtime.heartbeat_outgoing_ms, 4000);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_config_with_invalid_values_still_returns_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[realtime]
max_reconnect_attempts = 99
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.max_reconnect_attempts, 99);
}

#[test]
fn create_default_config_writes_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[realtime]"));
    assert!(content.contains("[logging]"));

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.endpoint, "ws://localhost:8080/ws");
}

#[test]
fn default_config_path_ends_with_careportal() {
    if std::env::var_os(CONFIG_PATH_ENV).is_some() {
        return;
    }
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("careportal/config.toml"));
    }
}

#[test]
fn parse_config_accepts_empty_text() {
    let config = parse_config("").unwrap();
    assert_eq!(config.realtime.endpoint, "ws://localhost:8080/ws");
}

#[test]
fn create_default_config_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[realtime]\nmax_reconnect_attempts = 2\n").unwrap();

    create_default_config(&path).unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.max_reconnect_attempts, 2);
}

#[test]
fn config_path_override_wins() {
    let path = resolve_config_path(
        Some("/etc/careportal.toml".into()),
        Some("/home/ana/.config".into()),
    )
    .unwrap();
    assert_eq!(path, Path::new("/etc/careportal.toml"));
}

#[test]
fn empty_override_falls_back_to_config_dir() {
    let path = resolve_config_path(Some("".into()), Some("/home/ana/.config".into())).unwrap();
    assert_eq!(path, Path::new("/home/ana/.config/careportal/config.toml"));

    let err = resolve_config_path(None, None).unwrap_err();
    assert!(err.to_string().contains(CONFIG_PATH_ENV));
}
