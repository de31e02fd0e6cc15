//! Common test utilities for meetgreet integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/meetgreet/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// The `mg()` method returns a `Command` that sets `MG_DATA_DIR`
/// per-invocation, making tests parallel-safe. `TZ` is pinned to UTC so
/// calendar output does not depend on the machine running the tests.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated data directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `mg init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.mg().arg("init").assert().success();
        env
    }

    /// Get a Command for the mg binary with isolated data directory.
    pub fn mg(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mg"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("MG_DATA_DIR", self.data_dir.path());
        cmd.env("TZ", "UTC");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Run `mg` with `args` and parse its stdout as JSON.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.mg().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "mg {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Run `mg` with `args` and return the `id` field of its JSON output.
    pub fn create(&self, args: &[&str]) -> String {
        self.json(args)["id"].as_str().unwrap().to_string()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
