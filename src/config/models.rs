use serde::Deserialize;
use ts_rs::TS;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_zoom")]
    pub default_zoom: f32,
    #[serde(default = "crate::config::defaults::default_zoom_step")]
    pub zoom_step: f32,
    #[serde(default = "crate::config::defaults::default_min_zoom")]
    pub min_zoom: f32,
    #[serde(default = "crate::config::defaults::default_max_zoom")]
    pub max_zoom: f32,
    #[serde(default = "crate::config::defaults::default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "crate::config::defaults::default_autoplay_after_generation")]
    pub autoplay_after_generation: bool,
    #[serde(default = "crate::config::defaults::default_preload_adjacent_pages")]
    pub preload_adjacent_pages: bool,
    #[serde(default)]
    pub default_voice: Option<String>,
    #[serde(default = "crate::config::defaults::default_speed")]
    pub default_speed: f32,
    #[serde(default = "crate::config::defaults::default_temperature")]
    pub default_temperature: f32,
    #[serde(default = "crate::config::defaults::default_voices")]
    pub voices: Vec<VoiceProfile>,
    #[serde(default = "crate::config::defaults::default_synthesis_endpoint")]
    pub synthesis_endpoint: String,
    #[serde(default = "crate::config::defaults::default_synthesis_model")]
    pub synthesis_model: String,
    #[serde(default = "crate::config::defaults::default_synthesis_language")]
    pub synthesis_language: String,
    #[serde(default = "crate::config::defaults::default_output_format")]
    pub output_format: OutputFormat,
    #[serde(default = "crate::config::defaults::default_voice_conditioning_seconds")]
    pub voice_conditioning_seconds: u32,
    #[serde(default = "crate::config::defaults::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "crate::config::defaults::default_user_id_env")]
    pub user_id_env: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            default_zoom: crate::config::defaults::default_zoom(),
            zoom_step: crate::config::defaults::default_zoom_step(),
            min_zoom: crate::config::defaults::default_min_zoom(),
            max_zoom: crate::config::defaults::default_max_zoom(),
            max_upload_bytes: crate::config::defaults::default_max_upload_bytes(),
            autoplay_after_generation: crate::config::defaults::default_autoplay_after_generation(),
            preload_adjacent_pages: crate::config::defaults::default_preload_adjacent_pages(),
            default_voice: None,
            default_speed: crate::config::defaults::default_speed(),
            default_temperature: crate::config::defaults::default_temperature(),
            voices: crate::config::defaults::default_voices(),
            synthesis_endpoint: crate::config::defaults::default_synthesis_endpoint(),
            synthesis_model: crate::config::defaults::default_synthesis_model(),
            synthesis_language: crate::config::defaults::default_synthesis_language(),
            output_format: crate::config::defaults::default_output_format(),
            voice_conditioning_seconds:
                crate::config::defaults::default_voice_conditioning_seconds(),
            request_timeout_secs: crate::config::defaults::default_request_timeout_secs(),
            api_key_env: crate::config::defaults::default_api_key_env(),
            user_id_env: crate::config::defaults::default_user_id_env(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    /// Voice used for a fresh session: the configured default when it names a
    /// catalog entry, otherwise the first catalog voice.
    pub fn initial_voice_id(&self) -> Option<&str> {
        self.default_voice
            .as_deref()
            .filter(|id| self.voices.iter().any(|voice| voice.id == *id))
            .or_else(|| self.voices.first().map(|voice| voice.id.as_str()))
    }
}

/// One selectable narration voice.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize, TS)]
#[ts(export)]
pub struct VoiceProfile {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub accent: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    #[ts(optional)]
    pub sample_url: Option<String>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub style: String,
}

impl std::fmt::Display for VoiceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.gender, self.style)
    }
}

/// Audio container requested from the synthesis service.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OutputFormat {
    Mp3,
    Wav,
    Ogg,
    Flac,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Mp3
    }
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
            OutputFormat::Ogg => "ogg",
            OutputFormat::Flac => "flac",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "audio/mpeg",
            OutputFormat::Wav => "audio/wav",
            OutputFormat::Ogg => "audio/ogg",
            OutputFormat::Flac => "audio/flac",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
