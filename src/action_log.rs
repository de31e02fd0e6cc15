//! Action logging for mg commands.
//!
//! Every command run against a data directory is appended to
//! `<data-dir>/action.log` as one JSON object per line. Logging is on by
//! default and can be switched off with `mg config set action-log false`.

use crate::Result;
use crate::config::read_config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the log inside the data directory.
pub const LOG_FILE: &str = "action.log";

/// Longest string argument kept verbatim.
const MAX_ARG_LEN: usize = 100;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Data directory the command ran against
    pub data_dir: String,

    /// Command name (e.g., "schedule add", "expense summary")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Path of the action log inside a data directory.
pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE)
}

/// Log an action to `<data-dir>/action.log`.
///
/// Returns the write error, if any; callers decide whether it matters.
/// A missing data directory or disabled logging is not an error.
pub fn log_action(
    data_dir: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) -> Result<()> {
    // Nothing to log into before `mg init`
    if !data_dir.is_dir() {
        return Ok(());
    }

    let enabled = match read_config(data_dir) {
        Ok(config) => config.action_log.unwrap_or(true),
        Err(_) => true,
    };
    if !enabled {
        return Ok(());
    }

    let entry = ActionLog {
        timestamp: Utc::now(),
        data_dir: data_dir.to_string_lossy().to_string(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    write_log_entry(&log_path(data_dir), &entry)
}

/// Read every entry back, skipping lines that do not parse.
pub fn read_entries(data_dir: &Path) -> std::io::Result<Vec<ActionLog>> {
    let path = log_path(data_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<()> {
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Strip personal text from arguments.
///
/// Dialogue lines, chat messages and notes are replaced by their length;
/// file paths are reduced to their basename; long strings are truncated.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                let key_lower = key.to_lowercase();
                let personal = ["content", "memo", "notes", "description"]
                    .iter()
                    .any(|k| key_lower.contains(k));
                if personal {
                    let redacted = match value.as_str() {
                        Some(s) => format!("[REDACTED {} chars]", s.chars().count()),
                        None => "[REDACTED]".to_string(),
                    };
                    sanitized.insert(key.clone(), serde_json::Value::String(redacted));
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            if arr.len() > 10 {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            let sanitized = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s).to_string()
            } else {
                s.clone()
            };

            let len = sanitized.chars().count();
            if len > MAX_ARG_LEN {
                let head: String = sanitized.chars().take(MAX_ARG_LEN - 3).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, len))
            } else {
                serde_json::Value::String(sanitized)
            }
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
