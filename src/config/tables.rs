use super::defaults;
use super::models::{AppConfig, LogLevel, OutputFormat, VoiceProfile};
use serde::Deserialize;

/// On-disk layout of `config.toml`, grouped by concern.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    reader: ReaderConfig,
    #[serde(default)]
    narration: NarrationConfig,
    #[serde(default)]
    synthesis: SynthesisConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default = "defaults::default_voices")]
    voices: Vec<VoiceProfile>,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            default_zoom: tables.reader.default_zoom,
            zoom_step: tables.reader.zoom_step,
            min_zoom: tables.reader.min_zoom,
            max_zoom: tables.reader.max_zoom,
            max_upload_bytes: tables.reader.max_upload_bytes,
            autoplay_after_generation: tables.reader.autoplay_after_generation,
            preload_adjacent_pages: tables.reader.preload_adjacent_pages,
            default_voice: tables.narration.default_voice,
            default_speed: tables.narration.speed,
            default_temperature: tables.narration.temperature,
            voices: tables.voices,
            synthesis_endpoint: tables.synthesis.endpoint,
            synthesis_model: tables.synthesis.model,
            synthesis_language: tables.synthesis.language,
            output_format: tables.synthesis.output_format,
            voice_conditioning_seconds: tables.synthesis.voice_conditioning_seconds,
            request_timeout_secs: tables.synthesis.request_timeout_secs,
            api_key_env: tables.synthesis.api_key_env,
            user_id_env: tables.synthesis.user_id_env,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            reader: ReaderConfig {
                default_zoom: config.default_zoom,
                zoom_step: config.zoom_step,
                min_zoom: config.min_zoom,
                max_zoom: config.max_zoom,
                max_upload_bytes: config.max_upload_bytes,
                autoplay_after_generation: config.autoplay_after_generation,
                preload_adjacent_pages: config.preload_adjacent_pages,
            },
            narration: NarrationConfig {
                default_voice: config.default_voice.clone(),
                speed: config.default_speed,
                temperature: config.default_temperature,
            },
            synthesis: SynthesisConfig {
                endpoint: config.synthesis_endpoint.clone(),
                model: config.synthesis_model.clone(),
                language: config.synthesis_language.clone(),
                output_format: config.output_format,
                voice_conditioning_seconds: config.voice_conditioning_seconds,
                request_timeout_secs: config.request_timeout_secs,
                api_key_env: config.api_key_env.clone(),
                user_id_env: config.user_id_env.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            voices: config.voices.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReaderConfig {
    #[serde(default = "defaults::default_zoom")]
    default_zoom: f32,
    #[serde(default = "defaults::default_zoom_step")]
    zoom_step: f32,
    #[serde(default = "defaults::default_min_zoom")]
    min_zoom: f32,
    #[serde(default = "defaults::default_max_zoom")]
    max_zoom: f32,
    #[serde(default = "defaults::default_max_upload_bytes")]
    max_upload_bytes: u64,
    #[serde(default = "defaults::default_autoplay_after_generation")]
    autoplay_after_generation: bool,
    #[serde(default = "defaults::default_preload_adjacent_pages")]
    preload_adjacent_pages: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            default_zoom: defaults::default_zoom(),
            zoom_step: defaults::default_zoom_step(),
            min_zoom: defaults::default_min_zoom(),
            max_zoom: defaults::default_max_zoom(),
            max_upload_bytes: defaults::default_max_upload_bytes(),
            autoplay_after_generation: defaults::default_autoplay_after_generation(),
            preload_adjacent_pages: defaults::default_preload_adjacent_pages(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct NarrationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_voice: Option<String>,
    #[serde(default = "defaults::default_speed")]
    speed: f32,
    #[serde(default = "defaults::default_temperature")]
    temperature: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        NarrationConfig {
            default_voice: None,
            speed: defaults::default_speed(),
            temperature: defaults::default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct SynthesisConfig {
    #[serde(default = "defaults::default_synthesis_endpoint")]
    endpoint: String,
    #[serde(default = "defaults::default_synthesis_model")]
    model: String,
    #[serde(default = "defaults::default_synthesis_language")]
    language: String,
    #[serde(default = "defaults::default_output_format")]
    output_format: OutputFormat,
    #[serde(default = "defaults::default_voice_conditioning_seconds")]
    voice_conditioning_seconds: u32,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "defaults::default_api_key_env")]
    api_key_env: String,
    #[serde(default = "defaults::default_user_id_env")]
    user_id_env: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            endpoint: defaults::default_synthesis_endpoint(),
            model: defaults::default_synthesis_model(),
            language: defaults::default_synthesis_language(),
            output_format: defaults::default_output_format(),
            voice_conditioning_seconds: defaults::default_voice_conditioning_seconds(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            api_key_env: defaults::default_api_key_env(),
            user_id_env: defaults::default_user_id_env(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
