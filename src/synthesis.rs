//! Remote speech synthesis over HTTP.
//!
//! The service takes page text plus the narration settings and answers with a
//! streamed audio body. Credentials are read from the environment at startup
//! and only ever travel in request headers.

use crate::config::{AppConfig, OutputFormat};
use crate::error::{NarrationError, Result};
use crate::settings::NarrationSettings;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const USER_ID_HEADER: &str = "X-USER-ID";

/// Service credentials. `Debug` never prints the secret values.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    user_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("user_id", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            user_id: user_id.into(),
        }
    }

    /// Read credentials from the variables named in the config.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    fn from_lookup(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| NarrationError::MissingCredentials(format!("{name} is not set")))
        };
        Ok(Self {
            api_key: read(&config.api_key_env)?,
            user_id: read(&config.user_id_env)?,
        })
    }
}

/// JSON body of one synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub output_format: OutputFormat,
    pub voice_conditioning_seconds: u32,
    #[serde(rename = "voiceConditioningSeconds2")]
    pub voice_conditioning_seconds_2: u32,
    pub language: String,
    pub model: String,
    pub text: String,
    pub voice: String,
    pub speed: f32,
    pub temperature: f32,
}

impl SynthesisRequest {
    pub fn new(text: String, settings: &NarrationSettings, config: &AppConfig) -> Self {
        Self {
            output_format: config.output_format,
            voice_conditioning_seconds: config.voice_conditioning_seconds,
            voice_conditioning_seconds_2: config.voice_conditioning_seconds,
            language: config.synthesis_language.clone(),
            model: config.synthesis_model.clone(),
            text,
            voice: settings.voice_id.clone(),
            speed: settings.speed,
            temperature: settings.temperature,
        }
    }
}

/// An open response body. `content_length` is `None` when the service
/// streams without announcing a size.
pub struct SynthesisStream {
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for SynthesisStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

pub trait SynthesisClient: Send + Sync {
    /// Send the request and return once response headers are in.
    fn open_stream(&self, request: &SynthesisRequest) -> Result<SynthesisStream>;
}

pub struct HttpSynthesisClient {
    client: Client,
    endpoint: String,
    credentials: Credentials,
}

impl HttpSynthesisClient {
    pub fn new(config: &AppConfig, credentials: Credentials) -> Result<Self> {
        Self::with_endpoint(
            config.synthesis_endpoint.clone(),
            Duration::from_secs(config.request_timeout_secs),
            credentials,
        )
    }

    /// Build the client from config, reading credentials from the
    /// configured environment variables.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Self::new(config, Credentials::from_env(config)?)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        timeout: Duration,
        credentials: Credentials,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NarrationError::NetworkError(format!("building HTTP client: {err}")))?;
        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, "Synthesis client ready");
        Ok(Self {
            client,
            endpoint,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SynthesisClient for HttpSynthesisClient {
    fn open_stream(&self, request: &SynthesisRequest) -> Result<SynthesisStream> {
        debug!(
            voice = %request.voice,
            chars = request.text.chars().count(),
            speed = request.speed,
            temperature = request.temperature,
            "Sending synthesis request"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.credentials.api_key)
            .header(USER_ID_HEADER, &self.credentials.user_id)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, request.output_format.mime_type())
            .json(request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "Synthesis request rejected");
            return Err(NarrationError::ServiceError {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        debug!(?content_length, "Synthesis response streaming");
        Ok(SynthesisStream {
            content_length,
            body: Box::new(response),
        })
    }
}
