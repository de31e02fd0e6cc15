//! Command implementations for the mg CLI.
//!
//! This module contains the business logic for each CLI command.
//! Commands are organized by area:
//! - `schedule` - events, the calendar and ticket images
//! - `expense` - spending and summaries
//! - `script` - practice scripts and their lines
//! - `report` - event reports and their chat logs
//! - `rehearse` - the interactive rehearsal session
//! - `settings` - UI settings and config.kdl
//!
//! Every command returns a result type implementing [`Output`], which `main`
//! prints as JSON or, with `-H`, as text.

mod expense;
mod rehearse;
mod report;
mod schedule;
mod script;
mod settings;

pub use expense::*;
pub use rehearse::*;
pub use report::*;
pub use schedule::*;
pub use script::*;
pub use settings::*;

use crate::models::Entity;
use crate::storage::{DB_FILE, Store};
use crate::{Error, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

pub(crate) fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// === Shared results ===

#[derive(Serialize)]
pub struct InitResult {
    pub data_dir: String,
    pub database: String,
    /// False when the data directory was already initialized
    pub created: bool,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Initialized meetgreet in {}", self.data_dir)
        } else {
            format!("Already initialized in {}", self.data_dir)
        }
    }
}

/// Create the data directory and database.
pub fn init(data_dir: &Path) -> Result<InitResult> {
    let created = !Store::exists(data_dir);
    Store::init(data_dir)?;
    Ok(InitResult {
        data_dir: data_dir.display().to_string(),
        database: data_dir.join(DB_FILE).display().to_string(),
        created,
    })
}

#[derive(Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub kind: String,
    /// Dependent records deleted along with it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_deleted: Option<usize>,
}

impl Output for Deleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self.children_deleted {
            Some(n) => format!("Deleted {} {} and {} dependent record(s)", self.kind, self.id, n),
            None => format!("Deleted {} {}", self.kind, self.id),
        }
    }
}

#[derive(Serialize)]
pub struct Toggled {
    pub id: Uuid,
    pub field: &'static str,
    pub value: bool,
}

impl Output for Toggled {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("{} {} = {}", self.id, self.field, self.value)
    }
}

#[derive(Serialize)]
pub struct VersionResult {
    pub version: String,
    pub commit: String,
    pub built: String,
}

impl Output for VersionResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("mg {} ({} built {})", self.version, self.commit, self.built)
    }
}

pub fn version() -> VersionResult {
    VersionResult {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("MG_GIT_COMMIT").to_string(),
        built: env!("MG_BUILD_TIMESTAMP").to_string(),
    }
}

// === Helpers ===

pub(crate) fn open_store(data_dir: &Path) -> Result<Store> {
    Store::open(data_dir)
}

/// Resolve a full id or a unique id prefix of a `T` record.
pub fn resolve_id<T: Entity>(store: &Store, input: &str) -> Result<Uuid> {
    let input = input.trim();
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    if input.is_empty() {
        return Err(Error::InvalidFieldValue("id must not be empty".to_string()));
    }

    let prefix = input.to_lowercase();
    let matches: Vec<Uuid> = store
        .list::<T>()?
        .iter()
        .map(|record| record.id())
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(Error::NotFound(format!("{} {}", T::KIND, input))),
        _ => Err(Error::InvalidFieldValue(format!(
            "id prefix '{}' matches {} {} records",
            input,
            matches.len(),
            T::KIND
        ))),
    }
}

/// Parse a user-supplied date or date-time in local time.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]` and
/// `YYYY-MM-DD` (local midnight).
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return local_to_utc(naive, s);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return local_to_utc(date.and_time(NaiveTime::MIN), s);
    }
    Err(Error::InvalidFieldValue(format!(
        "Invalid date '{}'. Expected YYYY-MM-DD, \"YYYY-MM-DD HH:MM\" or RFC 3339.",
        input
    )))
}

fn local_to_utc(naive: NaiveDateTime, input: &str) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::InvalidFieldValue(format!("'{}' does not exist in local time", input)))
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidFieldValue(format!("Invalid date '{}'. Expected YYYY-MM-DD.", input))
    })
}

/// Parse `YYYY-MM`, or the current local month when absent.
pub fn parse_month(input: Option<&str>) -> Result<(i32, u32)> {
    match input {
        Some(s) => NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map(|d| (d.year(), d.month()))
            .map_err(|_| {
                Error::InvalidFieldValue(format!("Invalid month '{}'. Expected YYYY-MM.", s))
            }),
        None => {
            let today = Local::now();
            Ok((today.year(), today.month()))
        }
    }
}

/// Parse an optional enum-valued flag.
pub fn parse_opt<T>(input: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = Error>,
{
    input.map(str::parse).transpose()
}

pub(crate) fn format_local(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Amount with thousands separators, e.g. `¥12,800`.
pub(crate) fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("¥{}", grouped)
}

pub(crate) fn short_id(id: &Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
