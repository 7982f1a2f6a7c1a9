use super::models::{LogLevel, OutputFormat, VoiceProfile};

pub(crate) fn default_zoom() -> f32 {
    1.2
}

pub(crate) fn default_zoom_step() -> f32 {
    0.2
}

pub(crate) fn default_min_zoom() -> f32 {
    0.6
}

pub(crate) fn default_max_zoom() -> f32 {
    2.4
}

pub(crate) fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

pub(crate) fn default_autoplay_after_generation() -> bool {
    true
}

pub(crate) fn default_preload_adjacent_pages() -> bool {
    true
}

pub(crate) fn default_speed() -> f32 {
    1.0
}

pub(crate) fn default_temperature() -> f32 {
    1.0
}

pub(crate) fn default_synthesis_endpoint() -> String {
    "https://api.play.ai/api/v1/tts/stream".to_string()
}

pub(crate) fn default_synthesis_model() -> String {
    "PlayDialog".to_string()
}

pub(crate) fn default_synthesis_language() -> String {
    "english".to_string()
}

pub(crate) fn default_output_format() -> OutputFormat {
    OutputFormat::Mp3
}

pub(crate) fn default_voice_conditioning_seconds() -> u32 {
    20
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    120
}

pub(crate) fn default_api_key_env() -> String {
    "NARRATION_API_KEY".to_string()
}

pub(crate) fn default_user_id_env() -> String {
    "NARRATION_USER_ID".to_string()
}

pub(crate) fn default_log_level() -> LogLevel {
    LogLevel::Info
}

pub(crate) fn default_voices() -> Vec<VoiceProfile> {
    vec![
        voice(
            "Angelo",
            "s3://voice-cloning-zero-shot/baf1ef41-36b6-428c-9bdf-50ba54682bd8/original/manifest.json",
            "https://peregrine-samples.s3.us-east-1.amazonaws.com/parrot-samples/Angelo_Sample.wav",
            "male",
            "Conversational",
        ),
        voice(
            "Deedee",
            "s3://voice-cloning-zero-shot/e040bd1b-f190-4bdb-83f0-75ef85b18f84/original/manifest.json",
            "https://peregrine-samples.s3.us-east-1.amazonaws.com/parrot-samples/Deedee_Sample.wav",
            "female",
            "Conversational",
        ),
        voice(
            "Jennifer",
            "s3://voice-cloning-zero-shot/801a663f-efd0-4254-98d0-5c175514c3e8/jennifer/manifest.json",
            "https://peregrine-samples.s3.amazonaws.com/parrot-samples/jennifer.wav",
            "female",
            "Conversational",
        ),
        voice(
            "Briggs",
            "s3://voice-cloning-zero-shot/71cdb799-1e03-41c6-8a05-f7cd55134b0b/original/manifest.json",
            "https://peregrine-samples.s3.us-east-1.amazonaws.com/parrot-samples/Briggs_Sample.wav",
            "male",
            "Narrative",
        ),
        voice(
            "Samara",
            "s3://voice-cloning-zero-shot/90217770-a480-4a91-b1ea-df00f4d4c29d/original/manifest.json",
            "https://parrot-samples.s3.amazonaws.com/gargamel/Samara.wav",
            "female",
            "Conversational",
        ),
    ]
}

fn voice(name: &str, id: &str, sample_url: &str, gender: &str, style: &str) -> VoiceProfile {
    VoiceProfile {
        name: name.to_string(),
        id: id.to_string(),
        accent: "american".to_string(),
        language: "English (US)".to_string(),
        language_code: "EN-US".to_string(),
        sample_url: Some(sample_url.to_string()),
        gender: gender.to_string(),
        style: style.to_string(),
    }
}
