//! Configuration loading for the narrated PDF reader.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! sensible defaults so a reading session can still start. Service
//! credentials are never stored here; the config only names the environment
//! variables that hold them.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, LogLevel, OutputFormat, VoiceProfile};

pub const DEFAULT_CONFIG_PATH: &str = "conf/config.toml";
