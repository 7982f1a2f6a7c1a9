//! One page's narration request, from text extraction to assembled audio.
//!
//! [`run_generation`] is the blocking body that talks to the synthesis
//! service and reports [`GenerationEvent`]s. [`GenerationTracker`] is the
//! state machine the session folds those events into; events carrying an old
//! `request_id` are dropped so a superseded request can never touch shared
//! state.

use crate::cancellation::CancellationToken;
use crate::error::{NarrationError, Result};
use crate::settings::NarrationSettings;
use crate::synthesis::{SynthesisClient, SynthesisRequest};
use serde::Serialize;
use std::io::{ErrorKind, Read};
use tracing::{debug, info, warn};
use ts_rs::TS;

const READ_CHUNK_BYTES: usize = 16 * 1024;
const UNKNOWN_LENGTH_STEP: f32 = 10.0;
const UNKNOWN_LENGTH_CAP: f32 = 90.0;
const KNOWN_LENGTH_CAP: f32 = 99.0;
const MAX_PREALLOC_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationState {
    Idle,
    ExtractingText,
    AwaitingResponse,
    Streaming { progress: f32 },
    Completed,
    Failed { error: NarrationError },
}

impl GenerationState {
    pub fn stage(&self) -> GenerationStage {
        match self {
            Self::Idle => GenerationStage::Idle,
            Self::ExtractingText => GenerationStage::ExtractingText,
            Self::AwaitingResponse => GenerationStage::AwaitingResponse,
            Self::Streaming { .. } => GenerationStage::Streaming,
            Self::Completed => GenerationStage::Completed,
            Self::Failed { .. } => GenerationStage::Failed,
        }
    }

    /// A request is out and its result has not been folded in yet.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::ExtractingText | Self::AwaitingResponse | Self::Streaming { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GenerationStage {
    Idle,
    ExtractingText,
    AwaitingResponse,
    Streaming,
    Completed,
    Failed,
}

/// Turns byte counts into an advisory percentage that never goes down and
/// never reads 100 before the body has ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEstimator {
    content_length: Option<u64>,
    received: u64,
    percent: f32,
}

impl ProgressEstimator {
    pub fn new(content_length: Option<u64>) -> Self {
        Self {
            content_length: content_length.filter(|len| *len > 0),
            received: 0,
            percent: 0.0,
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    pub fn advance(&mut self, chunk_len: usize) -> f32 {
        self.received += chunk_len as u64;
        let estimate = match self.content_length {
            Some(total) => {
                (self.received as f64 / total as f64 * 100.0).min(KNOWN_LENGTH_CAP as f64) as f32
            }
            None => (self.percent + UNKNOWN_LENGTH_STEP).min(UNKNOWN_LENGTH_CAP),
        };
        self.percent = self.percent.max(estimate);
        self.percent
    }
}

/// Everything the worker needs to run one request.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub request_id: u64,
    pub page: usize,
    pub request: SynthesisRequest,
    pub token: CancellationToken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationEvent {
    pub request_id: u64,
    pub kind: GenerationEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEventKind {
    Started { content_length: Option<u64> },
    Progress { percent: f32 },
    Completed { bytes: Vec<u8> },
    Failed { error: NarrationError },
}

/// Run `job` against `client`, reporting every step through `emit`. Always
/// ends with exactly one `Completed` or `Failed` event.
pub fn run_generation(
    client: &dyn SynthesisClient,
    job: &GenerationJob,
    mut emit: impl FnMut(GenerationEvent),
) {
    let request_id = job.request_id;
    let mut send = |kind: GenerationEventKind| emit(GenerationEvent { request_id, kind });
    match stream_audio(client, job, &mut send) {
        Ok(bytes) => {
            info!(request_id, page = job.page, bytes = bytes.len(), "Narration generated");
            send(GenerationEventKind::Completed { bytes });
        }
        Err(error) => {
            if error == NarrationError::Cancelled {
                debug!(request_id, page = job.page, "Narration request abandoned");
            } else {
                warn!(request_id, page = job.page, "Narration failed: {error}");
            }
            send(GenerationEventKind::Failed { error });
        }
    }
}

fn stream_audio(
    client: &dyn SynthesisClient,
    job: &GenerationJob,
    send: &mut impl FnMut(GenerationEventKind),
) -> Result<Vec<u8>> {
    job.token.check_cancelled("request")?;
    let mut stream = client.open_stream(&job.request)?;
    send(GenerationEventKind::Started {
        content_length: stream.content_length,
    });

    let mut estimator = ProgressEstimator::new(stream.content_length);
    let capacity = stream.content_length.unwrap_or(0).min(MAX_PREALLOC_BYTES);
    let mut bytes = Vec::with_capacity(capacity as usize);
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        job.token.check_cancelled("streaming")?;
        let read = match stream.body.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        bytes.extend_from_slice(&buf[..read]);
        let before = estimator.percent();
        let percent = estimator.advance(read);
        if percent > before {
            send(GenerationEventKind::Progress { percent });
        }
    }

    if bytes.is_empty() {
        return Err(NarrationError::NetworkError(
            "synthesis response carried no audio".to_string(),
        ));
    }
    Ok(bytes)
}

#[derive(Debug, Clone)]
struct ActiveGeneration {
    request_id: u64,
    page: usize,
    settings: NarrationSettings,
    token: CancellationToken,
}

/// Result of folding a terminal event into the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed {
        page: usize,
        settings: NarrationSettings,
        bytes: Vec<u8>,
    },
    Failed {
        page: usize,
        error: NarrationError,
    },
}

#[derive(Debug)]
pub struct GenerationTracker {
    state: GenerationState,
    progress: Option<f32>,
    next_request_id: u64,
    active: Option<ActiveGeneration>,
}

impl Default for GenerationTracker {
    fn default() -> Self {
        Self {
            state: GenerationState::Idle,
            progress: None,
            next_request_id: 1,
            active: None,
        }
    }
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn progress(&self) -> Option<f32> {
        self.progress
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.is_in_flight()
    }

    pub fn active_request_id(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.request_id)
    }

    pub fn active_page(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.page)
    }

    /// `Idle → ExtractingText`. Returns the new request id and its token.
    pub fn begin(
        &mut self,
        page: usize,
        settings: NarrationSettings,
    ) -> Result<(u64, CancellationToken)> {
        if self.is_in_flight() {
            return Err(NarrationError::GenerationInFlight);
        }
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let token = CancellationToken::new();
        self.active = Some(ActiveGeneration {
            request_id,
            page,
            settings,
            token: token.clone(),
        });
        self.state = GenerationState::ExtractingText;
        self.progress = None;
        debug!(request_id, page, "Extracting page text");
        Ok((request_id, token))
    }

    /// `ExtractingText → AwaitingResponse`.
    pub fn dispatched(&mut self, request_id: u64) {
        if self.active_request_id() != Some(request_id)
            || self.state != GenerationState::ExtractingText
        {
            return;
        }
        self.state = GenerationState::AwaitingResponse;
        self.progress = Some(0.0);
        debug!(request_id, "Awaiting synthesis response");
    }

    /// Fail the active request without waiting for an event.
    pub fn fail(&mut self, error: NarrationError) -> Option<GenerationOutcome> {
        let active = self.active.take()?;
        self.state = GenerationState::Failed {
            error: error.clone(),
        };
        self.progress = None;
        Some(GenerationOutcome::Failed {
            page: active.page,
            error,
        })
    }

    /// Fold a worker event in. Stale or unexpected events return `None`.
    pub fn apply(&mut self, event: GenerationEvent) -> Option<GenerationOutcome> {
        if self.active_request_id() != Some(event.request_id) {
            debug!(request_id = event.request_id, "Discarding stale generation event");
            return None;
        }
        match event.kind {
            GenerationEventKind::Started { .. } => {
                self.state = GenerationState::Streaming { progress: 0.0 };
                self.progress = Some(0.0);
                None
            }
            GenerationEventKind::Progress { percent } => {
                let progress = self.progress.unwrap_or(0.0).max(percent.clamp(0.0, 100.0));
                self.state = GenerationState::Streaming { progress };
                self.progress = Some(progress);
                None
            }
            GenerationEventKind::Completed { bytes } => {
                let active = self.active.take()?;
                self.state = GenerationState::Completed;
                self.progress = None;
                Some(GenerationOutcome::Completed {
                    page: active.page,
                    settings: active.settings,
                    bytes,
                })
            }
            GenerationEventKind::Failed { error } => self.fail(error),
        }
    }

    /// Drop the active request (document replaced). Its late events become
    /// stale.
    pub fn abandon(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
            debug!(request_id = active.request_id, "Abandoned generation");
        }
        self.state = GenerationState::Idle;
        self.progress = None;
    }

    /// `Completed | Failed → Idle`.
    pub fn settle(&mut self) {
        if matches!(
            self.state,
            GenerationState::Completed | GenerationState::Failed { .. }
        ) {
            self.state = GenerationState::Idle;
        }
    }
}
