//! Error kinds surfaced by the reading session.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

pub type Result<T, E = NarrationError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error("file is not a readable PDF: {0}")]
    InvalidFormat(String),
    #[error("unsupported file type {mime}; only application/pdf is accepted")]
    UnsupportedFileType { mime: String },
    #[error("file is {size} bytes; the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("no document is loaded")]
    NoDocument,
    #[error("could not extract text from page {page}: {reason}")]
    ExtractionError { page: usize, reason: String },
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("synthesis service returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },
    #[error("playback error: {0}")]
    PlaybackError(String),
    #[error("audio generation is already in progress")]
    GenerationInFlight,
    #[error("unknown voice {0}")]
    UnknownVoice(String),
    #[error("missing synthesis credentials: {0}")]
    MissingCredentials(String),
    #[error("generation cancelled")]
    Cancelled,
}

/// Coarse classification handed to the UI alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ErrorKind {
    InvalidFormat,
    Validation,
    Extraction,
    Network,
    Service,
    Playback,
    Busy,
    Configuration,
    Cancelled,
}

impl NarrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::UnsupportedFileType { .. }
            | Self::FileTooLarge { .. }
            | Self::NoDocument
            | Self::UnknownVoice(_) => ErrorKind::Validation,
            Self::ExtractionError { .. } => ErrorKind::Extraction,
            Self::NetworkError(_) => ErrorKind::Network,
            Self::ServiceError { .. } => ErrorKind::Service,
            Self::PlaybackError(_) => ErrorKind::Playback,
            Self::GenerationInFlight => ErrorKind::Busy,
            Self::MissingCredentials(_) => ErrorKind::Configuration,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether repeating the same user action may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::GenerationInFlight | Self::PlaybackError(_) => true,
            Self::ServiceError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for NarrationError {
    fn from(err: reqwest::Error) -> Self {
        NarrationError::NetworkError(err.to_string())
    }
}

impl From<std::io::Error> for NarrationError {
    fn from(err: std::io::Error) -> Self {
        NarrationError::NetworkError(err.to_string())
    }
}

/// Error as shown to the user: message plus retry hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&NarrationError> for ErrorView {
    fn from(err: &NarrationError) -> Self {
        ErrorView {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}
