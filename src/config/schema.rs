//! KDL schema for config.kdl.
//!
//! This module provides:
//! - the Rust struct representing the file
//! - conversion to and from KDL documents
//! - reading and writing the file in a data directory

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the config inside the data directory.
pub const CONFIG_FILE: &str = "config.kdl";

/// Longest grace interval accepted, in milliseconds.
pub const MAX_GRACE_MS: u64 = 10_000;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// grace-ms 500
/// action-log #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetgreetConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Pause after a counterpart line before the rehearsal moves on
    pub grace_ms: Option<u64>,

    /// Whether commands are appended to action.log
    pub action_log: Option<bool>,
}

impl MeetgreetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(grace) = self.grace_ms {
            if grace > MAX_GRACE_MS {
                return Err(format!("grace-ms must be 0-{}, got {}", MAX_GRACE_MS, grace));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes and malformed values
    /// are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(value) = first_value(doc, "output-format") {
            if let Some(s) = value.as_string() {
                config.output_format = OutputFormat::parse(s);
            }
        }

        if let Some(value) = first_value(doc, "grace-ms") {
            if let Some(i) = value.as_integer() {
                if (0..=MAX_GRACE_MS as i128).contains(&i) {
                    config.grace_ms = Some(i as u64);
                }
            }
        }

        if let Some(value) = first_value(doc, "action-log") {
            config.action_log = value_as_bool(value);
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(grace) = self.grace_ms {
            let mut node = KdlNode::new("grace-ms");
            node.push(KdlEntry::new(KdlValue::Integer(grace as i128)));
            doc.nodes_mut().push(node);
        }

        if let Some(enabled) = self.action_log {
            let mut node = KdlNode::new("action-log");
            node.push(KdlEntry::new(KdlValue::Bool(enabled)));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &MeetgreetConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.grace_ms.is_some() {
            self.grace_ms = other.grace_ms;
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
    }

    /// Set one key from its CLI string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output-format" => {
                let format = OutputFormat::parse(value).ok_or_else(|| {
                    Error::Config(format!(
                        "output-format must be 'json' or 'human', got '{}'",
                        value
                    ))
                })?;
                self.output_format = Some(format);
            }
            "grace-ms" => {
                let grace = value.parse::<u64>().map_err(|_| {
                    Error::Config(format!("grace-ms must be a whole number, got '{}'", value))
                })?;
                self.grace_ms = Some(grace);
            }
            "action-log" => {
                let enabled = parse_bool(value).ok_or_else(|| {
                    Error::Config(format!("action-log must be true or false, got '{}'", value))
                })?;
                self.action_log = Some(enabled);
            }
            other => {
                return Err(Error::Config(format!(
                    "Unknown config key '{}'. Valid keys: output-format, grace-ms, action-log",
                    other
                )));
            }
        }
        self.validate().map_err(Error::Config)
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

/// Accept real KDL booleans as well as quoted "true"/"false".
fn value_as_bool(value: &KdlValue) -> Option<bool> {
    value.as_bool().or_else(|| value.as_string().and_then(parse_bool))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Path of config.kdl inside a data directory.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Read config.kdl from a data directory. A missing file is an empty config.
pub fn read_config(data_dir: &Path) -> Result<MeetgreetConfig> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(MeetgreetConfig::default());
    }
    let text = std::fs::read_to_string(&path)?;
    let doc: KdlDocument = text
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(MeetgreetConfig::from_kdl(&doc))
}

/// Write config.kdl into a data directory.
pub fn write_config(data_dir: &Path, config: &MeetgreetConfig) -> Result<()> {
    config.validate().map_err(Error::Config)?;
    std::fs::create_dir_all(data_dir)?;
    std::fs::write(config_path(data_dir), config.to_kdl().to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("yaml"), None);
        assert_eq!(format!("{}", OutputFormat::Human), "human");
    }

    #[test]
    fn test_config_default() {
        let config = MeetgreetConfig::default();
        assert_eq!(config.output_format, None);
        assert_eq!(config.grace_ms, None);
        assert_eq!(config.action_log, None);
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            output-format "human"
            grace-ms 250
            action-log "false"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = MeetgreetConfig::from_kdl(&doc);
        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.grace_ms, Some(250));
        assert_eq!(config.action_log, Some(false));
    }

    #[test]
    fn test_config_from_kdl_ignores_bad_values() {
        let kdl = r#"
            output-format "xml"
            grace-ms 999999
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        assert_eq!(MeetgreetConfig::from_kdl(&doc), MeetgreetConfig::default());
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = MeetgreetConfig {
            output_format: Some(OutputFormat::Json),
            grace_ms: Some(0),
            action_log: Some(true),
        };
        let parsed = MeetgreetConfig::from_kdl(&config.to_kdl());
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_merge() {
        let mut base = MeetgreetConfig {
            output_format: Some(OutputFormat::Json),
            grace_ms: Some(500),
            action_log: None,
        };
        base.merge(&MeetgreetConfig {
            output_format: Some(OutputFormat::Human),
            ..Default::default()
        });
        assert_eq!(base.output_format, Some(OutputFormat::Human));
        assert_eq!(base.grace_ms, Some(500));
    }

    #[test]
    fn test_config_set() {
        let mut config = MeetgreetConfig::new();
        config.set("grace-ms", "750").unwrap();
        config.set("action-log", "off").unwrap();
        config.set("output-format", "human").unwrap();
        assert_eq!(config.grace_ms, Some(750));
        assert_eq!(config.action_log, Some(false));
        assert_eq!(config.output_format, Some(OutputFormat::Human));

        assert!(matches!(config.set("grace-ms", "soon"), Err(Error::Config(_))));
        assert!(matches!(config.set("grace-ms", "60000"), Err(Error::Config(_))));
        assert!(matches!(config.set("editor", "vim"), Err(Error::Config(_))));
    }

    #[test]
    fn test_read_write_config_file() {
        let env = TestEnv::new();
        assert_eq!(read_config(env.data_path()).unwrap(), MeetgreetConfig::default());

        let config = MeetgreetConfig {
            grace_ms: Some(100),
            action_log: Some(false),
            ..Default::default()
        };
        write_config(env.data_path(), &config).unwrap();
        assert!(config_path(env.data_path()).exists());
        assert_eq!(read_config(env.data_path()).unwrap(), config);
    }

    #[test]
    fn test_read_config_rejects_malformed_file() {
        let env = TestEnv::new();
        std::fs::write(config_path(env.data_path()), "grace-ms {{{").unwrap();
        assert!(matches!(read_config(env.data_path()), Err(Error::Config(_))));
    }
}
