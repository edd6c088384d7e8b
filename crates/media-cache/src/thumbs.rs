//! Background thumbnail strips for scrub preview.
//!
//! One strip per media source: frames captured at a fixed interval plus
//! the final frame. Capture runs on a worker thread, yields briefly
//! between frames, and can be cancelled mid-run without losing what was
//! already captured.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::CacheError;
use crate::frame::Frame;

/// Capture interval, seconds.
pub const THUMBNAIL_INTERVAL: f64 = 0.5;

/// Voluntary pause between captures so interactive work is not starved.
const CAPTURE_YIELD: Duration = Duration::from_millis(2);

/// Hard ceiling on captures per strip, whatever the duration.
const MAX_STRIP_FRAMES: usize = 100;

/// Frames captured so far for one source, keyed by millisecond
/// timestamp.
#[derive(Debug, Default)]
pub struct ThumbnailStrip {
    frames: BTreeMap<i64, Frame>,
    done: usize,
    total: usize,
    complete: bool,
}

impl ThumbnailStrip {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Earliest captured frame, handy as a poster image.
    pub fn first_frame(&self) -> Option<Frame> {
        self.frames.values().next().cloned()
    }

    /// Interval-rounded lookup, falling back to the captured frame
    /// nearest in time, or nothing when the strip is still empty.
    pub fn lookup(&self, timestamp: f64) -> Option<Frame> {
        let rounded = ((timestamp / THUMBNAIL_INTERVAL).round() * THUMBNAIL_INTERVAL * 1000.0)
            .round() as i64;
        if let Some(frame) = self.frames.get(&rounded) {
            return Some(frame.clone());
        }
        let target = (timestamp * 1000.0).round() as i64;
        let below = self.frames.range(..=target).next_back();
        let above = self.frames.range(target..).next();
        match (below, above) {
            (Some((bk, bv)), Some((ak, av))) => {
                if target - bk <= ak - target {
                    Some(bv.clone())
                } else {
                    Some(av.clone())
                }
            }
            (Some((_, v)), None) | (None, Some((_, v))) => Some(v.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThumbnailProgress {
    pub source: String,
    pub done: usize,
    pub total: usize,
}

pub struct ThumbnailGenerator {
    strips: Arc<Mutex<HashMap<String, ThumbnailStrip>>>,
    in_flight: Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
    progress_tx: channel::Sender<ThumbnailProgress>,
    progress_rx: channel::Receiver<ThumbnailProgress>,
}

impl Default for ThumbnailGenerator {
    fn default() -> Self {
        let (progress_tx, progress_rx) = channel::unbounded();
        Self {
            strips: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            progress_tx,
            progress_rx,
        }
    }
}

impl ThumbnailGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremental `done/total` events from running captures.
    pub fn progress_events(&self) -> &channel::Receiver<ThumbnailProgress> {
        &self.progress_rx
    }

    /// Capture timestamps for a source: every interval step, plus the
    /// final frame. `max_thumbnails` truncates the grid to its first
    /// entries, and [`MAX_STRIP_FRAMES`] caps it regardless.
    fn capture_times(duration: f64, max_thumbnails: Option<usize>) -> Vec<f64> {
        let duration = duration.max(0.0);
        let steps = (duration / THUMBNAIL_INTERVAL).ceil() as usize;
        let mut times: Vec<f64> = (0..steps).map(|i| i as f64 * THUMBNAIL_INTERVAL).collect();
        if times.last().copied().unwrap_or(-1.0) < duration {
            times.push(duration);
        }
        times.truncate(max_thumbnails.unwrap_or(MAX_STRIP_FRAMES).min(MAX_STRIP_FRAMES));
        times
    }

    /// Start capturing a strip for `source`. Returns `false` without
    /// spawning anything when a strip already exists or a capture for
    /// this source is already running.
    pub fn generate<F>(
        &self,
        source: &str,
        duration: f64,
        max_thumbnails: Option<usize>,
        mut extract: F,
    ) -> bool
    where
        F: FnMut(f64) -> Result<Frame, CacheError> + Send + 'static,
    {
        {
            let in_flight = self.in_flight.lock();
            if self.strips.lock().contains_key(source) || in_flight.contains_key(source) {
                return false;
            }
        }

        let times = Self::capture_times(duration, max_thumbnails);
        let total = times.len();
        self.strips
            .lock()
            .insert(source.to_string(), ThumbnailStrip::new(total));

        let cancel = Arc::new(AtomicBool::new(false));
        self.in_flight
            .lock()
            .insert(source.to_string(), cancel.clone());

        let source = source.to_string();
        let strips = self.strips.clone();
        let in_flight = self.in_flight.clone();
        let progress_tx = self.progress_tx.clone();
        thread::spawn(move || {
            let mut cancelled = false;
            for (i, &t) in times.iter().enumerate() {
                if cancel.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
                match extract(t) {
                    Ok(frame) => {
                        let key = (t * 1000.0).round() as i64;
                        if let Some(strip) = strips.lock().get_mut(&source) {
                            strip.frames.insert(key, frame);
                        }
                    }
                    Err(err) => debug!(%source, timestamp = t, %err, "thumbnail capture skipped"),
                }
                if let Some(strip) = strips.lock().get_mut(&source) {
                    strip.done = i + 1;
                }
                let _ = progress_tx.send(ThumbnailProgress {
                    source: source.clone(),
                    done: i + 1,
                    total,
                });
                // Each capture needs a completed seek anyway; give the
                // rest of the process a moment between frames.
                thread::sleep(CAPTURE_YIELD);
            }
            if !cancelled {
                if let Some(strip) = strips.lock().get_mut(&source) {
                    strip.complete = true;
                }
            }
            in_flight.lock().remove(&source);
        });
        true
    }

    /// Stop an in-flight capture. Frames already captured stay
    /// available.
    pub fn cancel(&self, source: &str) {
        if let Some(flag) = self.in_flight.lock().get(source) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Drop a source's strip entirely, cancelling any running capture.
    pub fn release(&self, source: &str) {
        self.cancel(source);
        self.strips.lock().remove(source);
    }

    pub fn has_strip(&self, source: &str) -> bool {
        self.strips.lock().contains_key(source)
    }

    pub fn is_generating(&self, source: &str) -> bool {
        self.in_flight.lock().contains_key(source)
    }

    pub fn lookup(&self, source: &str, timestamp: f64) -> Option<Frame> {
        self.strips.lock().get(source)?.lookup(timestamp)
    }

    /// Poster frame for a source: the earliest capture in its strip.
    pub fn first_frame(&self, source: &str) -> Option<Frame> {
        self.strips.lock().get(source)?.first_frame()
    }

    pub fn progress(&self, source: &str) -> Option<(usize, usize)> {
        let strips = self.strips.lock();
        let strip = strips.get(source)?;
        Some((strip.done, strip.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn frame(px: u8) -> Frame {
        Arc::new(RgbaImage::from_pixel(2, 2, Rgba([px, px, px, 255])))
    }

    fn wait_done(gen: &ThumbnailGenerator, source: &str) {
        for _ in 0..500 {
            if !gen.is_generating(source) {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("capture for {source} never finished");
    }

    #[test]
    fn capture_times_cover_interval_grid_plus_final() {
        let times = ThumbnailGenerator::capture_times(2.2, None);
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.2]);
        // An exact multiple still ends on the final frame.
        let times = ThumbnailGenerator::capture_times(1.0, None);
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn max_thumbnails_truncates_the_grid() {
        let times = ThumbnailGenerator::capture_times(10.0, Some(3));
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        // A generous limit leaves the grid untouched.
        let times = ThumbnailGenerator::capture_times(1.0, Some(50));
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        // Very long sources stop at the hard cap.
        let times = ThumbnailGenerator::capture_times(600.0, None);
        assert_eq!(times.len(), 100);
    }

    #[test]
    fn generates_full_strip_with_progress() {
        let gen = ThumbnailGenerator::new();
        assert!(gen.generate("v", 1.0, None, |t| Ok(frame((t * 10.0) as u8))));
        // Second request for the same source is a no-op.
        assert!(!gen.generate("v", 1.0, None, |_| panic!("must not run")));
        wait_done(&gen, "v");

        assert_eq!(gen.progress("v"), Some((3, 3)));
        assert!(gen.has_strip("v"));
        let last = gen.progress_events().try_iter().last().unwrap();
        assert_eq!(
            last,
            ThumbnailProgress {
                source: "v".into(),
                done: 3,
                total: 3
            }
        );
    }

    #[test]
    fn capture_errors_degrade_to_missing_frames() {
        let gen = ThumbnailGenerator::new();
        gen.generate("v", 1.0, None, |t| {
            if t == 0.5 {
                Err(CacheError::source_unavailable("v", t, "seek failed"))
            } else {
                Ok(frame(1))
            }
        });
        wait_done(&gen, "v");

        // Progress counts processed timestamps, captured frames lag by
        // the one failure.
        assert_eq!(gen.progress("v"), Some((3, 3)));
        assert!(gen.lookup("v", 0.0).is_some());
        // The 0.5 slot resolves to the nearest captured neighbour.
        assert!(gen.lookup("v", 0.5).is_some());
    }

    #[test]
    fn first_frame_returns_earliest_capture() {
        let gen = ThumbnailGenerator::new();
        assert!(gen.first_frame("v").is_none());
        gen.generate("v", 1.0, None, |t| {
            if t == 0.0 {
                // The very first capture can fail; the poster frame is
                // then simply the earliest one that landed.
                Err(CacheError::source_unavailable("v", t, "seek failed"))
            } else {
                Ok(frame((t * 10.0) as u8))
            }
        });
        wait_done(&gen, "v");

        let poster = gen.first_frame("v").unwrap();
        assert_eq!(poster.get_pixel(0, 0).0[0], 5);
    }

    #[test]
    fn lookup_prefers_exact_then_nearest() {
        let mut strip = ThumbnailStrip::new(3);
        strip.frames.insert(0, frame(0));
        strip.frames.insert(500, frame(5));
        strip.frames.insert(1000, frame(10));

        let exact = strip.lookup(0.5).unwrap();
        assert_eq!(exact.get_pixel(0, 0).0[0], 5);
        // 0.7 rounds to the 0.5 slot.
        assert_eq!(strip.lookup(0.7).unwrap().get_pixel(0, 0).0[0], 5);
        // 0.9 rounds to the 1.0 slot.
        assert_eq!(strip.lookup(0.9).unwrap().get_pixel(0, 0).0[0], 10);
        assert!(ThumbnailStrip::default().lookup(1.0).is_none());
    }

    #[test]
    fn cancellation_keeps_captured_frames() {
        let gen = ThumbnailGenerator::new();
        let (started_tx, started_rx) = channel::bounded(1);
        let (release_tx, release_rx) = channel::bounded::<()>(0);
        gen.generate("v", 30.0, None, move |t| {
            if t == 0.0 {
                let _ = started_tx.send(());
            } else {
                // Hold until the test has issued the cancel.
                let _ = release_rx.recv();
            }
            Ok(frame(1))
        });

        started_rx.recv().unwrap();
        gen.cancel("v");
        drop(release_tx);
        wait_done(&gen, "v");

        assert!(gen.lookup("v", 0.0).is_some());
        let (done, total) = gen.progress("v").unwrap();
        assert!(done < total, "capture should have stopped early");
        assert!(!gen.is_generating("v"));
    }
}
