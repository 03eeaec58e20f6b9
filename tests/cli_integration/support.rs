//! Support utilities for CLI integration tests
//!
//! Every invocation starts from an empty environment: a private
//! configuration directory and a `PATH` with no `az` on it, so no real
//! credentials or user configuration can leak into a test.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Isolated configuration directory and search path for one test.
pub struct TestEnv {
    temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("bin")).expect("create bin dir");
        TestEnv { temp_dir }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.temp_dir.path().join("config")
    }

    pub fn overlay_file(&self) -> PathBuf {
        self.config_dir().join(".env")
    }

    fn bin_dir(&self) -> PathBuf {
        self.temp_dir.path().join("bin")
    }

    pub fn run(&self, args: &[&str]) -> CliOutput {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> CliOutput {
        let mut cmd = Command::new(cli_binary());
        cmd.args(args)
            .env_clear()
            .env("SECRETS_AKV_CONFIG_DIR", self.config_dir())
            .env("PATH", self.bin_dir())
            .env("HOME", self.temp_dir.path());
        for (key, value) in env {
            cmd.env(key, value);
        }
        CliOutput(cmd.output().expect("failed to execute CLI command"))
    }
}

pub struct CliOutput(pub Output);

impl CliOutput {
    pub fn code(&self) -> Option<i32> {
        self.0.status.code()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.stdout).to_string()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.0.stderr).to_string()
    }

    /// Panics with both streams when the exit code differs.
    pub fn assert_code(&self, expected: i32) -> &Self {
        assert_eq!(
            self.code(),
            Some(expected),
            "unexpected exit code\nstdout: {}\nstderr: {}",
            self.stdout(),
            self.stderr()
        );
        self
    }
}

fn cli_binary() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_secrets-akv"))
}
