use super::models::AppConfig;
use super::tables::ConfigTables;
use crate::settings::{MAX_SPEED, MAX_TEMPERATURE, MIN_SPEED, MIN_TEMPERATURE};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse a TOML document into a sanitized [`AppConfig`].
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Parsing config TOML")?;
    Ok(sanitize(AppConfig::from(tables)))
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("Serializing config TOML")
}

fn sanitize(mut config: AppConfig) -> AppConfig {
    if config.min_zoom > config.max_zoom {
        warn!(
            min = config.min_zoom,
            max = config.max_zoom,
            "Zoom bounds inverted; swapping"
        );
        std::mem::swap(&mut config.min_zoom, &mut config.max_zoom);
    }
    config.zoom_step = config.zoom_step.abs().max(0.01);
    config.default_zoom = config.default_zoom.clamp(config.min_zoom, config.max_zoom);
    config.default_speed = config.default_speed.clamp(MIN_SPEED, MAX_SPEED);
    config.default_temperature = config
        .default_temperature
        .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
    config.request_timeout_secs = config.request_timeout_secs.max(1);

    if config.voices.is_empty() {
        warn!("Config lists no voices; restoring built-in catalog");
        config.voices = super::defaults::default_voices();
    }
    if let Some(voice) = config.default_voice.as_deref() {
        if !config.voices.iter().any(|v| v.id == voice) {
            warn!(%voice, "Configured default voice is not in the catalog; ignoring");
            config.default_voice = None;
        }
    }
    config
}
