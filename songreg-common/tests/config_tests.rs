//! Configuration loading and resolution-order tests
//!
//! Tests that manipulate environment variables are marked #[serial] so they
//! run sequentially, not in parallel.

use serial_test::serial;
use songreg_common::config::{env_value, resolve_setting, TomlConfig};
use songreg_common::Error;
use std::env;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const TEST_VAR: &str = "SONGREG_TEST_SETTING";

#[test]
fn test_missing_toml_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(&dir.path().join("absent.toml")).unwrap();

    assert!(config.host.is_none());
    assert!(config.secret_key.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
port = 5001
webhook_url = "https://example.org/webhook/blockchain-notification"

[blockapi]
api_key = "from-toml"
"#
    )
    .unwrap();

    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.port, Some(5001));
    assert_eq!(config.blockapi.api_key.as_deref(), Some("from-toml"));
    assert!(config.blockapi.base_url.is_none());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number").unwrap();

    match TomlConfig::load(file.path()) {
        Err(Error::Config(msg)) => assert!(msg.contains("Parse")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_cli_beats_env_and_toml() {
    env::set_var(TEST_VAR, "from-env");

    let resolved = resolve_setting(
        Some("from-cli".to_string()),
        TEST_VAR,
        Some("from-toml".to_string()),
    );
    assert_eq!(resolved, Some(("from-cli".to_string(), "command line")));

    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(TEST_VAR, "from-env");

    let resolved = resolve_setting(None, TEST_VAR, Some("from-toml".to_string()));
    assert_eq!(resolved, Some(("from-env".to_string(), "environment")));

    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    env::set_var(TEST_VAR, "   ");

    assert!(env_value(TEST_VAR).is_none());
    let resolved = resolve_setting(None, TEST_VAR, Some("from-toml".to_string()));
    assert_eq!(resolved, Some(("from-toml".to_string(), "TOML")));

    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_nothing_configured() {
    env::remove_var(TEST_VAR);
    assert!(resolve_setting(None, TEST_VAR, None).is_none());
    assert!(resolve_setting(Some(String::new()), TEST_VAR, Some(" ".to_string())).is_none());
}
