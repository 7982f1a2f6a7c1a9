//! Playback of the current page's narration.
//!
//! The controller is bound to at most one clip. Rebinding (page change,
//! invalidation, document reload) always stops the output first so audio
//! never keeps playing against a clip that no longer belongs to the page.

use crate::cache::AudioClip;
use crate::error::{NarrationError, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, info, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Audio device seam. `load` prepares a clip from its start without playing.
pub trait AudioOutput {
    fn load(&mut self, clip: &AudioClip) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    /// True once a loaded clip has played to the end.
    fn is_finished(&self) -> bool;
}

#[derive(Debug, Clone)]
struct Binding {
    page: usize,
    clip: AudioClip,
}

pub struct PlaybackController {
    output: Box<dyn AudioOutput>,
    binding: Option<Binding>,
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            binding: None,
            state: PlaybackState::Stopped,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn bound_page(&self) -> Option<usize> {
        self.binding.as_ref().map(|binding| binding.page)
    }

    pub fn bound_clip_id(&self) -> Option<u64> {
        self.binding.as_ref().map(|binding| binding.clip.id())
    }

    pub fn has_audio(&self) -> bool {
        self.binding.is_some()
    }

    /// Bind `clip` for `page`, stopping whatever was bound before. Binding the
    /// clip that is already bound is a no-op.
    pub fn bind(&mut self, page: usize, clip: &AudioClip) {
        if self
            .binding
            .as_ref()
            .is_some_and(|binding| binding.page == page && binding.clip.id() == clip.id())
        {
            return;
        }
        self.halt();
        debug!(page, clip = clip.id(), "Bound page audio");
        self.binding = Some(Binding {
            page,
            clip: clip.clone(),
        });
    }

    pub fn unbind(&mut self) {
        self.halt();
        if let Some(binding) = self.binding.take() {
            debug!(page = binding.page, clip = binding.clip.id(), "Unbound page audio");
        }
    }

    /// Start or resume playback. Returns `Ok(false)` when nothing is bound.
    pub fn play(&mut self) -> Result<bool> {
        let Some(binding) = self.binding.as_ref() else {
            return Ok(false);
        };
        match self.state {
            PlaybackState::Playing => return Ok(true),
            PlaybackState::Stopped => {
                self.output.load(&binding.clip)?;
            }
            PlaybackState::Paused => {}
        }
        self.output.play()?;
        info!(page = binding.page, clip = binding.clip.id(), "Playing page audio");
        self.state = PlaybackState::Playing;
        Ok(true)
    }

    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.output.pause();
        self.state = PlaybackState::Paused;
        debug!("Paused page audio");
        true
    }

    pub fn toggle(&mut self) -> Result<bool> {
        if self.state == PlaybackState::Playing {
            Ok(self.pause())
        } else {
            self.play()
        }
    }

    /// Fold end-of-clip into the state machine; a finished clip restarts
    /// from the beginning on the next `play`.
    pub fn poll_finished(&mut self) -> bool {
        if self.state == PlaybackState::Playing && self.output.is_finished() {
            self.halt();
            debug!("Page audio finished");
            return true;
        }
        false
    }

    fn halt(&mut self) {
        if self.state != PlaybackState::Stopped {
            self.output.stop();
        }
        self.state = PlaybackState::Stopped;
    }
}

/// Default audio device output backed by rodio.
#[derive(Default)]
pub struct RodioOutput {
    stream: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&OutputStreamHandle> {
        if self.stream.is_none() {
            let opened = OutputStream::try_default()
                .map_err(|err| NarrationError::PlaybackError(format!("opening audio output: {err}")))?;
            info!("Opened default audio output");
            self.stream = Some(opened);
        }
        match self.stream.as_ref() {
            Some((_, handle)) => Ok(handle),
            None => Err(NarrationError::PlaybackError(
                "audio output unavailable".to_string(),
            )),
        }
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, clip: &AudioClip) -> Result<()> {
        self.stop();
        let source = Decoder::new(Cursor::new(clip.shared_bytes())).map_err(|err| {
            NarrationError::PlaybackError(format!("decoding {} clip: {err}", clip.format()))
        })?;
        let sink = Sink::try_new(self.handle()?)
            .map_err(|err| NarrationError::PlaybackError(format!("creating sink: {err}")))?;
        sink.pause();
        sink.append(source);
        self.sink = Some(sink);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        match self.sink.as_ref() {
            Some(sink) => {
                sink.play();
                Ok(())
            }
            None => Err(NarrationError::PlaybackError(
                "no clip loaded".to_string(),
            )),
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().is_some_and(Sink::empty)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        if self.sink.is_some() {
            warn!("Dropping audio output with a loaded clip");
            self.stop();
        }
    }
}
