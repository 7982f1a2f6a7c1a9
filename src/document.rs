//! Document session: the loaded PDF, the current page and the zoom level.
//!
//! PDF decoding and rasterization belong to a [`DocumentBackend`]; this module
//! only validates uploads, owns the opened document and keeps the page index
//! inside `[1, page_count]`.

use crate::config::AppConfig;
use crate::error::{NarrationError, Result};
use crate::text_utils;
use image::RgbaImage;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// An opened PDF as exposed by the rendering collaborator. Pages are 1-based.
pub trait PdfDocument {
    /// Total pages, or `None` while the backend is still counting.
    fn page_count(&self) -> Option<usize>;
    fn render_page(&self, page: usize, scale: f32) -> Result<RgbaImage>;
    /// Text runs of the page in reading order.
    fn text_runs(&self, page: usize) -> Result<Vec<String>>;
}

pub trait DocumentBackend {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>>;
}

/// A file handed over by the picker or by drag-and-drop.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Reject anything that is not a PDF or exceeds `max_bytes`. Without a
    /// declared MIME type the `%PDF-` signature decides.
    pub fn validate(&self, max_bytes: u64) -> Result<()> {
        match self.mime_type.as_deref() {
            Some(mime) if !mime.eq_ignore_ascii_case(PDF_MIME) => {
                return Err(NarrationError::UnsupportedFileType {
                    mime: mime.to_string(),
                });
            }
            None if !self.bytes.starts_with(PDF_MAGIC) => {
                return Err(NarrationError::UnsupportedFileType {
                    mime: "unknown".to_string(),
                });
            }
            _ => {}
        }
        if self.size() > max_bytes {
            return Err(NarrationError::FileTooLarge {
                size: self.size(),
                limit: max_bytes,
            });
        }
        Ok(())
    }
}

pub struct DocumentHandle {
    name: String,
    size_bytes: u64,
    fingerprint: String,
    page_count: Option<usize>,
    document: Box<dyn PdfDocument>,
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("fingerprint", &self.fingerprint)
            .field("page_count", &self.page_count)
            .finish_non_exhaustive()
    }
}

impl DocumentHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Size as shown next to the file name, e.g. `"2.41 MB"`.
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / 1024.0 / 1024.0)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn page_count(&self) -> Option<usize> {
        self.page_count
    }
}

/// Zoom level with fixed step and bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    scale: f32,
    default: f32,
    step: f32,
    min: f32,
    max: f32,
}

impl Zoom {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scale: config.default_zoom,
            default: config.default_zoom,
            step: config.zoom_step,
            min: config.min_zoom,
            max: config.max_zoom,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn zoom_in(&mut self) {
        self.scale = round_scale((self.scale + self.step).min(self.max));
    }

    pub fn zoom_out(&mut self) {
        self.scale = round_scale((self.scale - self.step).max(self.min));
    }

    pub fn reset(&mut self) {
        self.scale = self.default;
    }
}

fn round_scale(scale: f32) -> f32 {
    (scale * 100.0).round() / 100.0
}

pub struct DocumentSession {
    handle: Option<DocumentHandle>,
    current_page: usize,
    zoom: Zoom,
}

impl DocumentSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            handle: None,
            current_page: 1,
            zoom: Zoom::from_config(config),
        }
    }

    /// Validate and open `upload`. On failure the previous document, page and
    /// zoom stay exactly as they were.
    pub fn load(
        &mut self,
        upload: Upload,
        backend: &dyn DocumentBackend,
        max_upload_bytes: u64,
    ) -> Result<&DocumentHandle> {
        if let Err(err) = upload.validate(max_upload_bytes) {
            warn!(name = %upload.name, "Rejected upload: {err}");
            return Err(err);
        }
        let document = backend.open(&upload.bytes).map_err(|err| match err {
            NarrationError::InvalidFormat(_) => err,
            other => NarrationError::InvalidFormat(other.to_string()),
        })?;
        let fingerprint = fingerprint(&upload.bytes);
        let size_bytes = upload.size();
        let page_count = document.page_count();
        info!(
            name = %upload.name,
            bytes = size_bytes,
            %fingerprint,
            pages = ?page_count,
            "Opened document"
        );

        self.zoom.reset();
        self.current_page = 1;
        Ok(&*self.handle.insert(DocumentHandle {
            name: upload.name,
            size_bytes,
            fingerprint,
            page_count,
            document,
        }))
    }

    /// Record a page count that became known after the load finished.
    pub fn record_page_count(&mut self, count: usize) {
        let Some(handle) = self.handle.as_mut() else {
            warn!(count, "Page count arrived without a loaded document");
            return;
        };
        handle.page_count = Some(count);
        self.current_page = self.current_page.min(count.max(1));
        debug!(count, page = self.current_page, "Recorded page count");
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&DocumentHandle> {
        self.handle.as_ref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> Option<usize> {
        self.handle.as_ref().and_then(DocumentHandle::page_count)
    }

    /// Clamp `target` into `[1, page_count]` (or `[1, target]` while the count
    /// is unknown) and move there. Returns whether the page changed.
    pub fn change_page(&mut self, target: i64) -> bool {
        if self.handle.is_none() {
            return false;
        }
        let mut page = usize::try_from(target.max(1)).unwrap_or(usize::MAX);
        if let Some(count) = self.page_count() {
            page = page.min(count.max(1));
        }
        if page == self.current_page {
            return false;
        }
        debug!(from = self.current_page, to = page, requested = target, "Changing page");
        self.current_page = page;
        true
    }

    /// Advance one page; does nothing until the page count is known.
    pub fn next_page(&mut self) -> bool {
        match self.page_count() {
            Some(count) if self.current_page < count => {
                self.change_page(self.current_page as i64 + 1)
            }
            _ => false,
        }
    }

    pub fn prev_page(&mut self) -> bool {
        self.change_page(self.current_page as i64 - 1)
    }

    pub fn can_go_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.page_count()
            .is_some_and(|count| self.current_page < count)
    }

    /// Neighbours worth rendering ahead of time: next page first, then the
    /// previous one.
    pub fn preload_pages(&self) -> Vec<usize> {
        let Some(count) = self.page_count() else {
            return Vec::new();
        };
        let page = self.current_page;
        let mut pages = Vec::with_capacity(2);
        if page < count {
            pages.push(page + 1);
        }
        if page > 1 {
            pages.push(page - 1);
        }
        pages
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn zoom_mut(&mut self) -> &mut Zoom {
        &mut self.zoom
    }

    pub fn render_page(&self, page: usize) -> Result<RgbaImage> {
        let handle = self.handle.as_ref().ok_or(NarrationError::NoDocument)?;
        handle.document.render_page(page, self.zoom.scale)
    }

    pub fn render_current_page(&self) -> Result<RgbaImage> {
        self.render_page(self.current_page)
    }

    /// Plain text of `page`, cleaned for synthesis.
    pub fn page_text(&self, page: usize) -> Result<String> {
        let handle = self.handle.as_ref().ok_or(NarrationError::NoDocument)?;
        let runs = handle.document.text_runs(page).map_err(|err| match err {
            NarrationError::ExtractionError { .. } => err,
            other => NarrationError::ExtractionError {
                page,
                reason: other.to_string(),
            },
        })?;
        let text = text_utils::clean_page_text(&text_utils::join_fragments(runs));
        if !text_utils::is_speakable(&text) {
            return Err(NarrationError::ExtractionError {
                page,
                reason: "page has no readable text".to_string(),
            });
        }
        Ok(text)
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hash = format!("{:x}", hasher.finalize());
    hash[..16].to_string()
}
