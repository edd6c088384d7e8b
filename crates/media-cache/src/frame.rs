//! LRU cache of decoded frames keyed by source and timestamp.

use std::sync::Arc;
use std::thread;

use image::RgbaImage;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::CacheError;
use crate::lru::LruCache;

/// Decoded frames are shared, never copied, between the cache and its
/// consumers.
pub type Frame = Arc<RgbaImage>;

/// How many extractions a batch preload runs at once.
pub const PRELOAD_BATCH: usize = 4;

const DEFAULT_CAPACITY: usize = 256;

/// Cache key. Timestamps are rounded to whole milliseconds so that
/// float jitter from repeated time arithmetic cannot mint near-duplicate
/// entries for the same frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameKey {
    source: String,
    millis: i64,
}

impl FrameKey {
    pub fn new(source: impl Into<String>, timestamp: f64) -> Self {
        Self {
            source: source.into(),
            millis: (timestamp * 1000.0).round() as i64,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> f64 {
        self.millis as f64 / 1000.0
    }
}

pub struct FrameCache {
    inner: Mutex<LruCache<FrameKey, Frame>>,
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl FrameCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// `None` means "not present", never an error.
    pub fn get(&self, source: &str, timestamp: f64) -> Option<Frame> {
        let key = FrameKey::new(source, timestamp);
        self.inner.lock().get(&key).cloned()
    }

    pub fn set(&self, source: &str, timestamp: f64, frame: Frame) {
        let key = FrameKey::new(source, timestamp);
        self.inner.lock().insert(key, frame);
    }

    pub fn has(&self, source: &str, timestamp: f64) -> bool {
        let key = FrameKey::new(source, timestamp);
        self.inner.lock().contains(&key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Warm the cache for `timestamps` of `source`. Only missing
    /// timestamps are fetched, [`PRELOAD_BATCH`] at a time, joining each
    /// batch before starting the next. A failed extraction is logged and
    /// skipped; the rest of the batch still lands.
    pub fn preload<F>(&self, source: &str, timestamps: &[f64], extract: F)
    where
        F: Fn(&str, f64) -> Result<Frame, CacheError> + Sync,
    {
        let missing: Vec<f64> = timestamps
            .iter()
            .copied()
            .filter(|&t| !self.has(source, t))
            .collect();

        let extract = &extract;
        for batch in missing.chunks(PRELOAD_BATCH) {
            let results: Vec<(f64, Result<Frame, CacheError>)> = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|&t| scope.spawn(move || (t, extract(source, t))))
                    .collect();
                handles
                    .into_iter()
                    .filter_map(|h| h.join().ok())
                    .collect()
            });
            for (t, result) in results {
                match result {
                    Ok(frame) => self.set(source, t, frame),
                    Err(err) => debug!(source, timestamp = t, %err, "preload frame skipped"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(px: u8) -> Frame {
        Arc::new(RgbaImage::from_pixel(2, 2, image::Rgba([px, px, px, 255])))
    }

    #[test]
    fn key_rounds_away_float_jitter() {
        let a = FrameKey::new("clip.mp4", 1.2345001);
        let b = FrameKey::new("clip.mp4", 1.2345431);
        assert_eq!(a, b);
        assert_eq!(a.timestamp(), 1.235);
        assert_ne!(a, FrameKey::new("other.mp4", 1.2345));
    }

    #[test]
    fn get_set_has_clear() {
        let cache = FrameCache::with_capacity(8);
        assert!(cache.get("v", 0.5).is_none());
        cache.set("v", 0.5, frame(1));
        assert!(cache.has("v", 0.5));
        assert!(cache.get("v", 0.5).is_some());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn preload_fetches_only_missing_and_skips_failures() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let cache = FrameCache::with_capacity(16);
        cache.set("v", 1.0, frame(9));

        let calls = AtomicUsize::new(0);
        cache.preload("v", &[0.0, 1.0, 2.0, 3.0], |source, t| {
            calls.fetch_add(1, Ordering::SeqCst);
            if t == 2.0 {
                Err(CacheError::source_unavailable(source, t, "decode failed"))
            } else {
                Ok(frame(7))
            }
        });

        // 1.0 was already cached, 2.0 failed, the others landed.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.has("v", 0.0));
        assert!(cache.has("v", 3.0));
        assert!(!cache.has("v", 2.0));
    }
}
