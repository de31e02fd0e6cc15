//! Precedence resolution for the data directory and preferences.
//!
//! ## Data directory (highest to lowest)
//!
//! 1. `--data-dir` CLI flag
//! 2. `MG_DATA_DIR` environment variable
//! 3. `<platform data dir>/meetgreet` (e.g. `~/.local/share/meetgreet`)
//!
//! ## Preferences (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. `config.kdl` in the data directory
//! 3. Built-in defaults

use crate::config::{OutputFormat, read_config};
use crate::rehearsal::DEFAULT_GRACE;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "MG_DATA_DIR";

/// Directory name under the platform data directory.
pub const APP_DIR: &str = "meetgreet";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Resolve the data directory.
pub fn resolve_data_dir(flag: Option<PathBuf>) -> Result<Resolved<PathBuf>> {
    if let Some(path) = flag {
        return Ok(Resolved::new(path, ValueSource::CliFlag));
    }
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.is_empty() {
            return Ok(Resolved::new(
                PathBuf::from(path),
                ValueSource::EnvVar(DATA_DIR_ENV.to_string()),
            ));
        }
    }
    let base = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(Resolved::new(base.join(APP_DIR), ValueSource::Default))
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub grace_ms: Resolved<u64>,
    pub action_log: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            grace_ms: Resolved::new(DEFAULT_GRACE.as_millis() as u64, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    /// Grace interval for rehearsals.
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms.value)
    }

    pub fn action_log_enabled(&self) -> bool {
        self.action_log.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub grace_ms: Option<u64>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_grace_ms(mut self, grace_ms: u64) -> Self {
        self.grace_ms = Some(grace_ms);
        self
    }
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let mut result = ResolvedConfig::default();
    let file = read_config(data_dir)?;

    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = file.output_format {
        result.output_format = Resolved::new(format, ValueSource::ConfigFile);
    }

    if let Some(grace) = overrides.grace_ms {
        result.grace_ms = Resolved::new(grace, ValueSource::CliFlag);
    } else if let Some(grace) = file.grace_ms {
        result.grace_ms = Resolved::new(grace, ValueSource::ConfigFile);
    }

    if let Some(enabled) = file.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::ConfigFile);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MeetgreetConfig, write_config};
    use crate::test_utils::TestEnv;
    use serial_test::serial;

    #[test]
    fn test_value_source_display() {
        assert_eq!(
            format!("{}", ValueSource::EnvVar("FOO".to_string())),
            "env:FOO"
        );
        assert_eq!(format!("{}", ValueSource::ConfigFile), "config");
        assert_eq!(format!("{}", ValueSource::CliFlag), "cli");
        assert_eq!(format!("{}", ValueSource::Default), "default");
    }

    #[test]
    fn test_resolve_config_defaults() {
        let env = TestEnv::new();
        let config = resolve_config(env.data_path(), &ConfigOverrides::default()).unwrap();

        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.output_format.source, ValueSource::Default);
        assert_eq!(config.grace(), Duration::from_millis(500));
        assert!(config.action_log_enabled());
    }

    #[test]
    fn test_resolve_config_from_file() {
        let env = TestEnv::new();
        write_config(
            env.data_path(),
            &MeetgreetConfig {
                output_format: Some(OutputFormat::Human),
                grace_ms: Some(50),
                action_log: Some(false),
            },
        )
        .unwrap();

        let config = resolve_config(env.data_path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.output_format(), OutputFormat::Human);
        assert_eq!(config.output_format.source, ValueSource::ConfigFile);
        assert_eq!(config.grace(), Duration::from_millis(50));
        assert!(!config.action_log_enabled());
    }

    #[test]
    fn test_cli_flag_overrides_file() {
        let env = TestEnv::new();
        write_config(
            env.data_path(),
            &MeetgreetConfig {
                output_format: Some(OutputFormat::Human),
                grace_ms: Some(50),
                ..Default::default()
            },
        )
        .unwrap();

        let overrides = ConfigOverrides::new()
            .with_output_format(OutputFormat::Json)
            .with_grace_ms(0);
        let config = resolve_config(env.data_path(), &overrides).unwrap();
        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.output_format.source, ValueSource::CliFlag);
        assert_eq!(config.grace_ms.value, 0);
        assert_eq!(config.grace_ms.source, ValueSource::CliFlag);
    }

    #[test]
    #[serial]
    fn test_data_dir_precedence() {
        let flag_dir = TestEnv::new();
        let env_dir = TestEnv::new();

        unsafe { std::env::set_var(DATA_DIR_ENV, env_dir.data_path()) };

        let resolved = resolve_data_dir(Some(flag_dir.data_path().to_path_buf())).unwrap();
        assert_eq!(resolved.value, flag_dir.data_path());
        assert_eq!(resolved.source, ValueSource::CliFlag);

        let resolved = resolve_data_dir(None).unwrap();
        assert_eq!(resolved.value, env_dir.data_path());
        assert_eq!(
            resolved.source,
            ValueSource::EnvVar(DATA_DIR_ENV.to_string())
        );

        unsafe { std::env::remove_var(DATA_DIR_ENV) };

        // Platform default, when the platform has one
        if let Ok(resolved) = resolve_data_dir(None) {
            assert_eq!(resolved.source, ValueSource::Default);
            assert!(resolved.value.ends_with(APP_DIR));
        }
    }
}
