//! Configuration for meetgreet.
//!
//! Preferences live in `config.kdl` inside the data directory:
//! - `output-format` - "json" or "human"
//! - `grace-ms` - pause after a counterpart line during rehearsal
//! - `action-log` - whether commands are written to `action.log`
//!
//! ## Precedence
//!
//! For the data directory: `--data-dir` flag > `MG_DATA_DIR` > platform default.
//! For preferences: CLI flag > config.kdl > defaults.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, DATA_DIR_ENV, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_data_dir,
};
pub use schema::{
    CONFIG_FILE, MeetgreetConfig, OutputFormat, config_path, read_config, write_config,
};
