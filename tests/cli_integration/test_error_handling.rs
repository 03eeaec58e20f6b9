//! Integration tests for error handling and exit statuses
//!
//! Tests:
//! - address errors (missing vault, missing key, bad URL)
//! - credential failures before any network request
//! - argument validation

use super::support::TestEnv;

#[test]
fn test_missing_vault_name() {
    let env = TestEnv::new();

    env.run(&["get", "-k", "db-password"]).assert_code(2);
}

#[test]
fn test_invalid_address() {
    let env = TestEnv::new();

    let result = env.run(&["get", "ftp://kv/db-password"]);

    result.assert_code(3);
    assert!(result.stderr().contains("Error:"));
}

#[test]
fn test_missing_key() {
    let env = TestEnv::new();

    env.run(&["resolve", "-v", "kv"]).assert_code(4);
    env.run(&["set", "value", "akv://kv", "-V", "x"]).assert_code(4);
}

#[test]
fn test_no_credential_sources() {
    let env = TestEnv::new();

    let result = env.run(&["get", "-v", "kv", "-k", "db-password"]);

    result.assert_code(10);
    assert!(result.stderr().contains("no credential sources"), "stderr: {}", result.stderr());
}

#[test]
fn test_list_without_credentials() {
    let env = TestEnv::new();

    env.run(&["ls", "akv://kv"]).assert_code(10);
}

#[test]
fn test_remove_checks_credentials_before_prompting() {
    let env = TestEnv::new();

    env.run(&["rm", "akv://kv/db-password"]).assert_code(10);
}

#[test]
fn test_set_without_anything_to_set() {
    let env = TestEnv::new();

    let result = env.run(&["set", "akv://kv/db-password"]);

    result.assert_code(1);
    assert!(result.stderr().contains("Nothing to set"));
}

#[test]
fn test_set_with_invalid_expiry() {
    let env = TestEnv::new();

    env.run(&["set", "akv://kv/db-password", "-V", "x", "--expires-at", "next tuesday"]).assert_code(1);
}

#[test]
fn test_interactive_and_device_code_conflict() {
    let env = TestEnv::new();

    env.run(&["get", "akv://kv/db-password", "--interactive", "--device-code"]).assert_code(2);
}

#[test]
fn test_debug_prints_error_chain() {
    let env = TestEnv::new();

    let result = env.run(&["--debug", "get", "-v", "kv", "-k", "db-password"]);

    result.assert_code(10);
    assert!(result.stderr().contains("Error:"));
}
