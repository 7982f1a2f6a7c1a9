//! Fakes shared by the unit tests.

use crate::cache::AudioClip;
use crate::config::{AppConfig, OutputFormat};
use crate::document::{DocumentBackend, PDF_MIME, PdfDocument, Upload};
use crate::error::{NarrationError, Result};
use crate::playback::AudioOutput;
use crate::settings::NarrationSettings;
use crate::synthesis::{SynthesisClient, SynthesisRequest, SynthesisStream};
use image::RgbaImage;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn pdf_upload(name: &str) -> Upload {
    Upload::new(name, Some(PDF_MIME), b"%PDF-1.7\n%fake\n".to_vec())
}

pub fn test_clip(byte: u8) -> AudioClip {
    AudioClip::new(
        vec![byte; 8],
        OutputFormat::Mp3,
        NarrationSettings::from_config(&AppConfig::default()),
    )
}

#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    pages: usize,
    count_known: bool,
    blank_pages: Vec<usize>,
    fail: bool,
}

impl FakeBackend {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            count_known: true,
            ..Self::default()
        }
    }

    /// Page count stays unknown until the session records it.
    pub fn with_pending_count(pages: usize) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_blank_page(mut self, page: usize) -> Self {
        self.blank_pages.push(page);
        self
    }
}

impl DocumentBackend for FakeBackend {
    fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>> {
        if self.fail {
            return Err(NarrationError::InvalidFormat("xref table missing".to_string()));
        }
        Ok(Box::new(FakeDocument {
            backend: self.clone(),
        }))
    }
}

struct FakeDocument {
    backend: FakeBackend,
}

impl FakeDocument {
    fn check(&self, page: usize) -> Result<()> {
        if page == 0 || page > self.backend.pages {
            return Err(NarrationError::ExtractionError {
                page,
                reason: "page out of range".to_string(),
            });
        }
        Ok(())
    }
}

impl PdfDocument for FakeDocument {
    fn page_count(&self) -> Option<usize> {
        self.backend.count_known.then_some(self.backend.pages)
    }

    fn render_page(&self, page: usize, _scale: f32) -> Result<RgbaImage> {
        self.check(page)?;
        Ok(RgbaImage::new(1, 1))
    }

    fn text_runs(&self, page: usize) -> Result<Vec<String>> {
        self.check(page)?;
        if self.backend.blank_pages.contains(&page) {
            return Ok(vec![" ".to_string(), String::new()]);
        }
        Ok(vec![
            "Page".to_string(),
            page.to_string(),
            String::new(),
            "text.".to_string(),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCall {
    Load(u64),
    Play,
    Pause,
    Stop,
}

#[derive(Debug, Default)]
struct OutputLog {
    calls: Vec<OutputCall>,
    finished: bool,
    fail_next_load: bool,
}

/// Audio output that records calls instead of making sound.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    log: Arc<Mutex<OutputLog>>,
}

impl RecordingOutput {
    pub fn calls(&self) -> Vec<OutputCall> {
        self.log.lock().expect("output log poisoned").calls.clone()
    }

    pub fn finish(&self) {
        self.log.lock().expect("output log poisoned").finished = true;
    }

    pub fn fail_next_load(&self) {
        self.log.lock().expect("output log poisoned").fail_next_load = true;
    }

    fn push(&self, call: OutputCall) {
        self.log.lock().expect("output log poisoned").calls.push(call);
    }
}

impl AudioOutput for RecordingOutput {
    fn load(&mut self, clip: &AudioClip) -> Result<()> {
        let mut log = self.log.lock().expect("output log poisoned");
        if std::mem::take(&mut log.fail_next_load) {
            return Err(NarrationError::PlaybackError("undecodable clip".to_string()));
        }
        log.finished = false;
        log.calls.push(OutputCall::Load(clip.id()));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.push(OutputCall::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.push(OutputCall::Pause);
    }

    fn stop(&mut self) {
        self.push(OutputCall::Stop);
    }

    fn is_finished(&self) -> bool {
        self.log.lock().expect("output log poisoned").finished
    }
}

enum Script {
    Chunks {
        chunks: Vec<Vec<u8>>,
        announce_length: bool,
    },
    Fail(NarrationError),
}

/// Synthesis client that replays a fixed response.
pub struct ScriptedClient {
    script: Script,
    requests: AtomicUsize,
}

impl ScriptedClient {
    pub fn chunks(chunks: Vec<Vec<u8>>, announce_length: bool) -> Self {
        Self {
            script: Script::Chunks {
                chunks,
                announce_length,
            },
            requests: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: NarrationError) -> Self {
        Self {
            script: Script::Fail(error),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl SynthesisClient for ScriptedClient {
    fn open_stream(&self, _request: &SynthesisRequest) -> Result<SynthesisStream> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Fail(error) => Err(error.clone()),
            Script::Chunks {
                chunks,
                announce_length,
            } => {
                let total: usize = chunks.iter().map(Vec::len).sum();
                Ok(SynthesisStream {
                    content_length: announce_length.then_some(total as u64),
                    body: Box::new(ChunkedBody {
                        chunks: chunks.iter().cloned().collect(),
                    }),
                })
            }
        }
    }
}

/// Hands out one scripted chunk per `read`, like a network body would.
struct ChunkedBody {
    chunks: VecDeque<Vec<u8>>,
}

impl Read for ChunkedBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let len = chunk.len().min(buf.len());
        buf[..len].copy_from_slice(&chunk[..len]);
        if len < chunk.len() {
            self.chunks.push_front(chunk.split_off(len));
        }
        Ok(len)
    }
}
