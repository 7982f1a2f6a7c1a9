//! Narration settings (voice, speed, temperature) and the voice catalog.
//!
//! Setters only report whether the value actually changed; invalidating the
//! current page's audio is the session's job.

use crate::config::{AppConfig, VoiceProfile};
use crate::error::{NarrationError, Result};
use serde::Serialize;
use tracing::debug;
use ts_rs::TS;

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct NarrationSettings {
    pub voice_id: String,
    pub speed: f32,
    pub temperature: f32,
}

impl NarrationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            voice_id: config.initial_voice_id().unwrap_or_default().to_string(),
            speed: config.default_speed.clamp(MIN_SPEED, MAX_SPEED),
            temperature: config
                .default_temperature
                .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
        }
    }

    pub fn set_voice(&mut self, voice_id: &str, catalog: &VoiceCatalog) -> Result<bool> {
        if !catalog.contains(voice_id) {
            return Err(NarrationError::UnknownVoice(voice_id.to_string()));
        }
        if self.voice_id == voice_id {
            return Ok(false);
        }
        debug!(from = %self.voice_id, to = %voice_id, "Voice changed");
        self.voice_id = voice_id.to_string();
        Ok(true)
    }

    pub fn set_speed(&mut self, speed: f32) -> bool {
        if !speed.is_finite() {
            return false;
        }
        let clamped = speed.clamp(MIN_SPEED, MAX_SPEED);
        if (clamped - self.speed).abs() < f32::EPSILON {
            return false;
        }
        debug!(from = self.speed, to = clamped, "Speed changed");
        self.speed = clamped;
        true
    }

    pub fn set_temperature(&mut self, temperature: f32) -> bool {
        if !temperature.is_finite() {
            return false;
        }
        let clamped = temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
        if (clamped - self.temperature).abs() < f32::EPSILON {
            return false;
        }
        debug!(from = self.temperature, to = clamped, "Temperature changed");
        self.temperature = clamped;
        true
    }
}

/// Voices the user may pick from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCatalog {
    voices: Vec<VoiceProfile>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<VoiceProfile>) -> Self {
        Self { voices }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.voices.clone())
    }

    pub fn voices(&self) -> &[VoiceProfile] {
        &self.voices
    }

    pub fn find(&self, voice_id: &str) -> Option<&VoiceProfile> {
        self.voices.iter().find(|voice| voice.id == voice_id)
    }

    pub fn contains(&self, voice_id: &str) -> bool {
        self.find(voice_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> (NarrationSettings, VoiceCatalog) {
        let config = AppConfig::default();
        (
            NarrationSettings::from_config(&config),
            VoiceCatalog::from_config(&config),
        )
    }

    #[test]
    fn starts_with_first_catalog_voice() {
        let (settings, catalog) = defaults();
        assert_eq!(settings.voice_id, catalog.voices()[0].id);
        assert!((settings.speed - 1.0).abs() < f32::EPSILON);
        assert!((settings.temperature - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn speed_and_temperature_are_clamped() {
        let (mut settings, _) = defaults();
        assert!(settings.set_speed(9.0));
        assert!((settings.speed - MAX_SPEED).abs() < f32::EPSILON);
        assert!(settings.set_temperature(-3.0));
        assert!((settings.temperature - MIN_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[test]
    fn unchanged_values_report_no_change() {
        let (mut settings, catalog) = defaults();
        let current = settings.voice_id.clone();
        assert_eq!(settings.set_voice(&current, &catalog), Ok(false));
        assert!(!settings.set_speed(1.0));
        assert!(!settings.set_temperature(f32::NAN));
    }

    #[test]
    fn unknown_voice_is_rejected() {
        let (mut settings, catalog) = defaults();
        let before = settings.clone();
        assert_eq!(
            settings.set_voice("s3://missing", &catalog),
            Err(NarrationError::UnknownVoice("s3://missing".to_string()))
        );
        assert_eq!(settings, before);
    }
}
