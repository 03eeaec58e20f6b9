//! Integration tests for config management CLI commands
//!
//! Tests:
//! - config set / get / rm with aliases and variable names
//! - config path
//! - missing file and unknown name exit statuses

use super::support::TestEnv;
use std::fs;

#[test]
fn test_config_set_then_get() {
    let env = TestEnv::new();

    let set = env.run(&["config", "set", "tenant", "contoso.onmicrosoft.com"]);
    set.assert_code(0);
    assert!(set.stderr().contains("Configuration saved to:"));

    let contents = fs::read_to_string(env.overlay_file()).expect("read overlay file");
    assert!(contents.contains("AZURE_TENANT_ID=contoso.onmicrosoft.com"), "overlay: {}", contents);

    let get = env.run(&["config", "get", "AZURE_TENANT_ID"]);
    get.assert_code(0);
    assert_eq!(get.stdout().trim(), "contoso.onmicrosoft.com");
}

#[test]
fn test_config_set_quiet_prints_nothing() {
    let env = TestEnv::new();

    let set = env.run(&["-q", "config", "set", "client.id", "00000000-0000-0000-0000-000000000001"]);

    set.assert_code(0);
    assert!(set.stderr().is_empty(), "stderr: {}", set.stderr());
}

#[cfg(unix)]
#[test]
fn test_config_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let env = TestEnv::new();
    env.run(&["config", "set", "authority.host", "https://login.microsoftonline.us"]).assert_code(0);

    let mode = fs::metadata(env.overlay_file()).expect("overlay metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_config_rm_removes_only_that_key() {
    let env = TestEnv::new();
    env.run(&["config", "set", "tenant", "contoso"]).assert_code(0);
    env.run(&["config", "set", "client.id", "app-id"]).assert_code(0);

    env.run(&["config", "rm", "tenant"]).assert_code(0);

    env.run(&["config", "get", "tenant"]).assert_code(21);
    let get = env.run(&["config", "get", "client.id"]);
    get.assert_code(0);
    assert_eq!(get.stdout().trim(), "app-id");
}

#[test]
fn test_config_get_without_file_is_not_found() {
    let env = TestEnv::new();

    let get = env.run(&["config", "get", "tenant"]);

    get.assert_code(21);
    assert!(get.stderr().contains("Error:"));
}

#[test]
fn test_config_rm_missing_key_is_not_found() {
    let env = TestEnv::new();
    env.run(&["config", "set", "tenant", "contoso"]).assert_code(0);

    env.run(&["config", "rm", "identity"]).assert_code(21);
}

#[test]
fn test_config_unknown_name_fails() {
    let env = TestEnv::new();

    let set = env.run(&["config", "set", "colour", "blue"]);

    set.assert_code(20);
    assert!(!env.overlay_file().exists());
}

#[test]
fn test_config_path_points_into_config_dir() {
    let env = TestEnv::new();

    let path = env.run(&["config", "path"]);

    path.assert_code(0);
    assert_eq!(path.stdout().trim(), env.overlay_file().display().to_string());
}
