//! Session core of a PDF reader with on-demand per-page narration.
//!
//! A [`session::ReaderSession`] owns the loaded document, the page index, the
//! per-page audio cache, the narration settings, the single generation slot
//! and playback. PDF decoding is supplied through [`document::DocumentBackend`];
//! speech comes from a remote service through [`synthesis::SynthesisClient`].

pub mod cache;
pub mod cancellation;
pub mod config;
pub mod document;
pub mod error;
pub mod generation;
pub mod logging;
pub mod playback;
pub mod session;
pub mod settings;
pub mod synthesis;
pub mod text_utils;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{NarrationError, Result};
pub use session::{GenerationRequest, ReaderSession, SessionCommand, SessionSnapshot};
