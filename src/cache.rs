//! In-memory cache of generated narration, one clip per page.
//!
//! Entries live for the lifetime of the loaded document. There is no size or
//! age eviction: the cache is cleared on document change and individual
//! pages are dropped when narration settings change.

use crate::config::OutputFormat;
use crate::settings::NarrationSettings;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A playable audio resource produced by one successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    id: u64,
    bytes: Arc<[u8]>,
    format: OutputFormat,
    settings: NarrationSettings,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, format: OutputFormat, settings: NarrationSettings) -> Self {
        static SEQ: AtomicU64 = AtomicU64::new(1);
        Self {
            id: SEQ.fetch_add(1, Ordering::Relaxed),
            bytes: Arc::from(bytes),
            format,
            settings,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Settings the clip was synthesized with.
    pub fn settings(&self) -> &NarrationSettings {
        &self.settings
    }
}

#[derive(Debug, Default)]
pub struct PageAudioCache {
    entries: HashMap<usize, AudioClip>,
}

impl PageAudioCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: usize) -> Option<&AudioClip> {
        self.entries.get(&page)
    }

    pub fn contains(&self, page: usize) -> bool {
        self.entries.contains_key(&page)
    }

    /// Store a clip for `page`, replacing any previous one.
    pub fn put(&mut self, page: usize, clip: AudioClip) {
        debug!(page, clip = clip.id(), bytes = clip.byte_len(), "Caching page audio");
        self.entries.insert(page, clip);
    }

    pub fn invalidate(&mut self, page: usize) -> Option<AudioClip> {
        let removed = self.entries.remove(&page);
        if removed.is_some() {
            debug!(page, "Invalidated page audio");
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!(count = self.entries.len(), "Clearing page audio cache");
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached page numbers in ascending order.
    pub fn pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.entries.keys().copied().collect();
        pages.sort_unstable();
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn clip(byte: u8) -> AudioClip {
        AudioClip::new(
            vec![byte; 4],
            OutputFormat::Mp3,
            NarrationSettings::from_config(&AppConfig::default()),
        )
    }

    #[test]
    fn put_replaces_existing_entry() {
        let mut cache = PageAudioCache::new();
        cache.put(2, clip(1));
        cache.put(2, clip(7));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(2).map(|c| c.bytes()[0]), Some(7));
    }

    #[test]
    fn invalidate_removes_only_that_page() {
        let mut cache = PageAudioCache::new();
        cache.put(1, clip(1));
        cache.put(3, clip(3));

        assert!(cache.invalidate(1).is_some());
        assert!(cache.invalidate(1).is_none());
        assert_eq!(cache.pages(), vec![3]);
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = PageAudioCache::new();
        cache.put(1, clip(1));
        cache.put(2, clip(2));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn clips_get_distinct_ids() {
        assert_ne!(clip(0).id(), clip(0).id());
    }
}
