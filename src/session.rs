//! The page-level reading session.
//!
//! `ReaderSession` owns every piece of mutable reader state: the document and
//! page index, the per-page audio cache, the narration settings, the single
//! generation slot and the playback binding. Front ends drive it with
//! [`SessionCommand`]s and render the returned [`SessionSnapshot`].

use crate::cache::{AudioClip, PageAudioCache};
use crate::config::{AppConfig, VoiceProfile};
use crate::document::{DocumentBackend, DocumentSession, Upload};
use crate::error::{ErrorView, NarrationError, Result};
use crate::generation::{
    GenerationEvent, GenerationJob, GenerationOutcome, GenerationStage, GenerationTracker,
    run_generation,
};
use crate::playback::{AudioOutput, PlaybackController, PlaybackState};
use crate::settings::{NarrationSettings, VoiceCatalog};
use crate::synthesis::{SynthesisClient, SynthesisRequest};
use crate::worker::GenerationWorker;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DocumentView {
    pub name: String,
    pub size_label: String,
    pub page_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct GenerationView {
    pub stage: GenerationStage,
    pub is_generating: bool,
    /// `None` while no request is out, or before the first byte arrives.
    pub progress_pct: Option<f32>,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PlaybackView {
    pub state: PlaybackState,
    pub has_audio: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub document: Option<DocumentView>,
    pub current_page: usize,
    pub page_count: Option<usize>,
    pub can_go_prev: bool,
    pub can_go_next: bool,
    pub zoom: f32,
    pub preload_pages: Vec<usize>,
    pub settings: NarrationSettings,
    pub voices: Vec<VoiceProfile>,
    pub cached_pages: Vec<usize>,
    pub settings_stale: bool,
    pub generation: GenerationView,
    pub playback: PlaybackView,
    pub error: Option<ErrorView>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum SessionCommand {
    GetSnapshot,
    NextPage,
    PrevPage,
    SetPage { page: i64 },
    ZoomIn,
    ZoomOut,
    ZoomReset,
    SetVoice { voice_id: String },
    SetSpeed { speed: f32 },
    SetTemperature { temperature: f32 },
    Play,
    Pause,
    TogglePlayPause,
    DismissError,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::NextPage => "reader_next_page",
            Self::PrevPage => "reader_prev_page",
            Self::SetPage { .. } => "reader_set_page",
            Self::ZoomIn => "reader_zoom_in",
            Self::ZoomOut => "reader_zoom_out",
            Self::ZoomReset => "reader_zoom_reset",
            Self::SetVoice { .. } => "narration_set_voice",
            Self::SetSpeed { .. } => "narration_set_speed",
            Self::SetTemperature { .. } => "narration_set_temperature",
            Self::Play => "narration_play",
            Self::Pause => "narration_pause",
            Self::TogglePlayPause => "narration_toggle_play_pause",
            Self::DismissError => "reader_dismiss_error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub action: &'static str,
    pub snapshot: SessionSnapshot,
}

/// What a "generate" action turned into.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /// Audio for this page and these settings already exists; it is now bound.
    Cached { page: usize },
    /// A request is out; run the job and feed its events back in.
    Dispatched(GenerationJob),
}

pub struct ReaderSession {
    config: AppConfig,
    document: DocumentSession,
    cache: PageAudioCache,
    settings: NarrationSettings,
    voices: VoiceCatalog,
    generation: GenerationTracker,
    playback: PlaybackController,
    settings_stale: bool,
    last_error: Option<NarrationError>,
}

impl ReaderSession {
    pub fn new(config: AppConfig, output: Box<dyn AudioOutput>) -> Self {
        Self {
            document: DocumentSession::new(&config),
            cache: PageAudioCache::new(),
            settings: NarrationSettings::from_config(&config),
            voices: VoiceCatalog::from_config(&config),
            generation: GenerationTracker::new(),
            playback: PlaybackController::new(output),
            settings_stale: false,
            last_error: None,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn document(&self) -> &DocumentSession {
        &self.document
    }

    pub fn cache(&self) -> &PageAudioCache {
        &self.cache
    }

    pub fn settings(&self) -> &NarrationSettings {
        &self.settings
    }

    pub fn generation(&self) -> &GenerationTracker {
        &self.generation
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn current_page(&self) -> usize {
        self.document.current_page()
    }

    pub fn settings_stale(&self) -> bool {
        self.settings_stale
    }

    pub fn last_error(&self) -> Option<&NarrationError> {
        self.last_error.as_ref()
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        let result = match command {
            SessionCommand::GetSnapshot => Ok(()),
            SessionCommand::NextPage => self.next_page().map(drop),
            SessionCommand::PrevPage => self.prev_page().map(drop),
            SessionCommand::SetPage { page } => self.change_page(page).map(drop),
            SessionCommand::ZoomIn => {
                self.document.zoom_mut().zoom_in();
                Ok(())
            }
            SessionCommand::ZoomOut => {
                self.document.zoom_mut().zoom_out();
                Ok(())
            }
            SessionCommand::ZoomReset => {
                self.document.zoom_mut().reset();
                Ok(())
            }
            SessionCommand::SetVoice { voice_id } => self.set_voice(&voice_id).map(drop),
            SessionCommand::SetSpeed { speed } => self.set_speed(speed).map(drop),
            SessionCommand::SetTemperature { temperature } => {
                self.set_temperature(temperature).map(drop)
            }
            SessionCommand::Play => self.play().map(drop),
            SessionCommand::Pause => {
                self.pause();
                Ok(())
            }
            SessionCommand::TogglePlayPause => self.toggle_play_pause().map(drop),
            SessionCommand::DismissError => {
                self.dismiss_error();
                Ok(())
            }
        };
        if let Err(err) = result {
            debug!(action, "Command rejected: {err}");
        }
        SessionEvent {
            action,
            snapshot: self.snapshot(),
        }
    }

    /// Replace the loaded document. On success the cache is emptied, playback
    /// stops, progress clears and any in-flight request is abandoned. On
    /// failure nothing but the reported error changes.
    pub fn load_document(&mut self, upload: Upload, backend: &dyn DocumentBackend) -> Result<()> {
        let max_upload_bytes = self.config.max_upload_bytes;
        let loaded = self
            .document
            .load(upload, backend, max_upload_bytes)
            .map(|handle| handle.name().to_string());
        let name = self.record(loaded)?;
        self.generation.abandon();
        self.cache.clear();
        self.playback.unbind();
        self.settings_stale = false;
        self.last_error = None;
        info!(name = %name, pages = ?self.document.page_count(), "Document ready");
        Ok(())
    }

    pub fn record_page_count(&mut self, count: usize) {
        self.document.record_page_count(count);
        self.rebind_current_page();
    }

    pub fn change_page(&mut self, target: i64) -> Result<bool> {
        self.guard_idle()?;
        let changed = self.document.change_page(target);
        if changed {
            self.generation.settle();
            self.rebind_current_page();
        }
        Ok(changed)
    }

    pub fn next_page(&mut self) -> Result<bool> {
        self.guard_idle()?;
        let changed = self.document.next_page();
        if changed {
            self.generation.settle();
            self.rebind_current_page();
        }
        Ok(changed)
    }

    pub fn prev_page(&mut self) -> Result<bool> {
        self.guard_idle()?;
        let changed = self.document.prev_page();
        if changed {
            self.generation.settle();
            self.rebind_current_page();
        }
        Ok(changed)
    }

    pub fn set_voice(&mut self, voice_id: &str) -> Result<bool> {
        self.guard_idle()?;
        let changed = self.settings.set_voice(voice_id, &self.voices);
        let changed = self.record(changed)?;
        self.after_settings_change(changed);
        Ok(changed)
    }

    pub fn set_speed(&mut self, speed: f32) -> Result<bool> {
        self.guard_idle()?;
        let changed = self.settings.set_speed(speed);
        self.after_settings_change(changed);
        Ok(changed)
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<bool> {
        self.guard_idle()?;
        let changed = self.settings.set_temperature(temperature);
        self.after_settings_change(changed);
        Ok(changed)
    }

    /// Start narration for the current page. Extraction runs inline; the
    /// returned job carries the network part.
    pub fn request_generation(&mut self) -> Result<GenerationRequest> {
        if !self.document.is_loaded() {
            return self.record(Err(NarrationError::NoDocument));
        }
        if self.generation.is_in_flight() {
            return Err(NarrationError::GenerationInFlight);
        }
        let page = self.document.current_page();
        if let Some(clip) = self.fresh_clip(page) {
            debug!(page, clip = clip.id(), "Narration already cached");
            self.playback.bind(page, &clip);
            return Ok(GenerationRequest::Cached { page });
        }

        self.generation.settle();
        self.last_error = None;
        let (request_id, token) = self.generation.begin(page, self.settings.clone())?;
        let text = match self.document.page_text(page) {
            Ok(text) => text,
            Err(err) => {
                self.generation.fail(err.clone());
                return self.record(Err(err));
            }
        };
        let request = SynthesisRequest::new(text, &self.settings, &self.config);
        self.generation.dispatched(request_id);
        info!(request_id, page, voice = %self.settings.voice_id, "Requesting narration");
        Ok(GenerationRequest::Dispatched(GenerationJob {
            request_id,
            page,
            request,
            token,
        }))
    }

    /// Fold one worker event into the session. Terminal outcomes are returned;
    /// events from abandoned requests are dropped.
    pub fn apply_generation_event(&mut self, event: GenerationEvent) -> Option<GenerationOutcome> {
        let outcome = self.generation.apply(event)?;
        match &outcome {
            GenerationOutcome::Completed {
                page,
                settings,
                bytes,
            } => {
                let clip = AudioClip::new(bytes.clone(), self.config.output_format, settings.clone());
                self.cache.put(*page, clip.clone());
                self.settings_stale = false;
                if *page == self.document.current_page() {
                    self.playback.bind(*page, &clip);
                    if self.config.autoplay_after_generation {
                        let played = self.playback.play();
                        if let Err(err) = self.record(played) {
                            warn!(page, "Autoplay failed: {err}");
                        }
                    }
                }
            }
            GenerationOutcome::Failed { page, error } => {
                if *error != NarrationError::Cancelled {
                    warn!(page, "Narration unavailable: {error}");
                    self.last_error = Some(error.clone());
                }
            }
        }
        Some(outcome)
    }

    /// Run a generation on the calling thread.
    pub fn generate_with(&mut self, client: &dyn SynthesisClient) -> Result<()> {
        let job = match self.request_generation()? {
            GenerationRequest::Cached { .. } => return Ok(()),
            GenerationRequest::Dispatched(job) => job,
        };
        let mut events = Vec::new();
        run_generation(client, &job, |event| events.push(event));
        let mut result = Ok(());
        for event in events {
            if let Some(GenerationOutcome::Failed { error, .. }) = self.apply_generation_event(event)
            {
                result = Err(error);
            }
        }
        result
    }

    /// Hand the generation to a background worker. Poll with
    /// [`ReaderSession::pump`].
    pub fn start_generation(&mut self, worker: &mut GenerationWorker) -> Result<GenerationRequest> {
        let request = self.request_generation()?;
        if let GenerationRequest::Dispatched(job) = &request {
            if let Err(err) = worker.submit(job.clone()) {
                self.generation.fail(err.clone());
                return self.record(Err(err));
            }
        }
        Ok(request)
    }

    /// Apply every event the worker has delivered so far.
    pub fn pump(&mut self, worker: &GenerationWorker) -> Vec<GenerationOutcome> {
        worker
            .drain()
            .into_iter()
            .filter_map(|event| self.apply_generation_event(event))
            .collect()
    }

    pub fn play(&mut self) -> Result<bool> {
        let played = self.playback.play();
        self.record(played)
    }

    pub fn pause(&mut self) -> bool {
        self.playback.pause()
    }

    pub fn toggle_play_pause(&mut self) -> Result<bool> {
        let toggled = self.playback.toggle();
        self.record(toggled)
    }

    /// Notice clips that played to the end.
    pub fn tick(&mut self) -> bool {
        self.playback.poll_finished()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
        self.generation.settle();
    }

    pub fn render_current_page(&self) -> Result<RgbaImage> {
        self.document.render_current_page()
    }

    /// Render the neighbours of the current page at the current zoom. Pages
    /// that fail to render are skipped.
    pub fn render_preload_pages(&self) -> Vec<(usize, RgbaImage)> {
        if !self.config.preload_adjacent_pages {
            return Vec::new();
        }
        self.document
            .preload_pages()
            .into_iter()
            .filter_map(|page| match self.document.render_page(page) {
                Ok(image) => Some((page, image)),
                Err(err) => {
                    warn!(page, "Preload render failed: {err}");
                    None
                }
            })
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let preload_pages = if self.config.preload_adjacent_pages {
            self.document.preload_pages()
        } else {
            Vec::new()
        };
        SessionSnapshot {
            document: self.document.handle().map(|handle| DocumentView {
                name: handle.name().to_string(),
                size_label: handle.size_label(),
                page_count: handle.page_count(),
            }),
            current_page: self.document.current_page(),
            page_count: self.document.page_count(),
            can_go_prev: self.document.can_go_prev(),
            can_go_next: self.document.can_go_next(),
            zoom: self.document.zoom().scale(),
            preload_pages,
            settings: self.settings.clone(),
            voices: self.voices.voices().to_vec(),
            cached_pages: self.cache.pages(),
            settings_stale: self.settings_stale,
            generation: GenerationView {
                stage: self.generation.state().stage(),
                is_generating: self.generation.is_in_flight(),
                progress_pct: self.generation.progress(),
                page: self.generation.active_page(),
            },
            playback: PlaybackView {
                state: self.playback.state(),
                has_audio: self.playback.has_audio(),
            },
            error: self.last_error.as_ref().map(ErrorView::from),
        }
    }

    fn guard_idle(&self) -> Result<()> {
        if self.generation.is_in_flight() {
            return Err(NarrationError::GenerationInFlight);
        }
        Ok(())
    }

    /// The page's clip, if it was made with the current settings.
    fn fresh_clip(&self, page: usize) -> Option<AudioClip> {
        self.cache
            .get(page)
            .filter(|clip| *clip.settings() == self.settings)
            .cloned()
    }

    fn rebind_current_page(&mut self) {
        let page = self.document.current_page();
        match self.cache.get(page) {
            Some(clip) => self.playback.bind(page, clip),
            None => self.playback.unbind(),
        }
    }

    fn after_settings_change(&mut self, changed: bool) {
        if !changed {
            return;
        }
        let page = self.document.current_page();
        if self.cache.invalidate(page).is_some() {
            self.playback.unbind();
            self.settings_stale = true;
            info!(page, "Narration settings changed; page audio invalidated");
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.last_error = Some(err.clone());
        }
        result
    }
}
