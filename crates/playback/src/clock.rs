//! The authoritative playback cursor and active-clip resolution.
//!
//! One `current_time` is shared by every track. While the visually
//! active clip is real video its decoder position drives the cursor;
//! over stills and gaps a frame ticker advances it by measured wall
//! time. Manual seeks pause playback and reach the decoder debounced.

use std::time::{Duration, Instant};

use library::AssetKind;
use timeline::{Clip, ClipId, Timeline, TrackId, TrackKind};
use tracing::{debug, trace};

use crate::scheduler::{DebounceSlot, FrameTicker};

/// Quiet period before a scrub position is forwarded to the decoder.
pub const SEEK_DEBOUNCE: Duration = Duration::from_millis(150);

const OUT_POINT_EPSILON: f64 = 1e-6;

/// The clip covering `time` on one track, if any. At most one exists
/// because clips on a track never overlap.
pub fn active_clip(timeline: &Timeline, track_id: TrackId, time: f64) -> Option<&Clip> {
    timeline
        .clips_on_track(track_id)
        .into_iter()
        .find(|c| c.contains(time))
}

/// The clip shown in the preview at `time`: video tracks are walked
/// top-most first and the first hit wins outright, no blending.
pub fn active_visual_clip(timeline: &Timeline, time: f64) -> Option<&Clip> {
    timeline
        .tracks()
        .iter()
        .rev()
        .filter(|t| t.kind == TrackKind::Video)
        .find_map(|t| active_clip(timeline, t.id, time))
}

/// Every audio clip sounding at `time`, across all audio tracks.
pub fn active_audio_clips(timeline: &Timeline, time: f64) -> Vec<&Clip> {
    timeline
        .tracks()
        .iter()
        .filter(|t| t.kind == TrackKind::Audio)
        .filter_map(|t| active_clip(timeline, t.id, time))
        .collect()
}

/// How the cursor advances right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockDrive {
    /// A video clip's own decode clock supplies time.
    Media(ClipId),
    /// Stills or empty timeline regions: a frame timer advances time.
    Timer,
}

#[derive(Debug)]
pub struct PlaybackClock {
    current_time: f64,
    playing: bool,
    /// Clip whose out-point hand-off already fired; cleared when its
    /// media reports an in-range position again or on any seek.
    handoff_fired: Option<ClipId>,
    pending_seek: DebounceSlot<f64>,
    ticker: FrameTicker,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            playing: false,
            handoff_fired: None,
            pending_seek: DebounceSlot::new(SEEK_DEBOUNCE),
            ticker: FrameTicker::new(),
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
        self.ticker.reset();
    }

    /// Pausing also cancels any seek still waiting out its debounce.
    pub fn pause(&mut self) {
        self.playing = false;
        self.pending_seek.cancel();
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// What should be advancing the cursor at the current position.
    pub fn drive(&self, timeline: &Timeline) -> ClockDrive {
        match active_visual_clip(timeline, self.current_time) {
            Some(clip) if clip.source_kind == AssetKind::Video => ClockDrive::Media(clip.id),
            _ => ClockDrive::Timer,
        }
    }

    /// Frame callback. Always measures elapsed time; applies it only
    /// when playing and nothing media-driven owns the cursor.
    pub fn tick(&mut self, timeline: &Timeline, now: Instant) {
        let elapsed = self.ticker.tick(now);
        if !self.playing || self.drive(timeline) != ClockDrive::Timer {
            return;
        }
        self.current_time += elapsed.as_secs_f64();
        self.stop_at_end(timeline);
    }

    /// Position callback from the active video's decoder. Converts the
    /// media position to timeline time; at or past the clip's out-point
    /// it advances the cursor to exactly the clip end, once. Repeated
    /// past-the-end callbacks and callbacks from clips that are not the
    /// active visual clip are ignored.
    pub fn on_media_position(&mut self, timeline: &Timeline, clip_id: ClipId, media_time: f64) {
        let Some(clip) = timeline.clip(clip_id) else {
            return;
        };
        match active_visual_clip(timeline, self.current_time) {
            Some(active) if active.id == clip_id => {}
            _ => {
                trace!(clip = %clip_id, "position callback from inactive clip ignored");
                return;
            }
        }

        if media_time >= clip.out_point() - OUT_POINT_EPSILON {
            self.hand_off(timeline, clip_id);
            return;
        }

        self.handoff_fired = None;
        let mapped = clip.start_time + (media_time - clip.in_point);
        self.current_time = mapped.clamp(
            clip.start_time,
            (clip.end_time() - OUT_POINT_EPSILON).max(clip.start_time),
        );
    }

    /// End-of-stream from the active video's decoder; same one-shot
    /// hand-off as reaching the out-point.
    pub fn on_media_ended(&mut self, timeline: &Timeline, clip_id: ClipId) {
        let Some(clip) = timeline.clip(clip_id) else {
            return;
        };
        if self.current_time >= clip.start_time && self.current_time <= clip.end_time() {
            self.hand_off(timeline, clip_id);
        }
    }

    fn hand_off(&mut self, timeline: &Timeline, clip_id: ClipId) {
        if self.handoff_fired == Some(clip_id) {
            return;
        }
        let Some(clip) = timeline.clip(clip_id) else {
            return;
        };
        debug!(clip = %clip_id, end = clip.end_time(), "clip out-point hand-off");
        self.current_time = clip.end_time();
        self.handoff_fired = Some(clip_id);
        self.ticker.reset();
        self.stop_at_end(timeline);
    }

    /// Manual cursor change. Pauses playback and arms the debounced
    /// decoder seek; the cursor itself moves immediately so the UI
    /// tracks the scrub.
    pub fn seek(&mut self, timeline: &Timeline, time: f64, now: Instant) {
        self.playing = false;
        self.handoff_fired = None;
        self.current_time = time.clamp(0.0, timeline.total_duration().max(0.0));
        self.pending_seek.arm(self.current_time, now);
    }

    /// The debounced seek target, once scrubbing has been quiet long
    /// enough. Hand the value to the media layer.
    pub fn poll_seek(&mut self, now: Instant) -> Option<f64> {
        self.pending_seek.poll(now)
    }

    fn stop_at_end(&mut self, timeline: &Timeline) {
        let total = timeline.total_duration();
        if self.current_time >= total {
            self.current_time = total;
            if self.playing {
                debug!(total, "reached timeline end");
                self.playing = false;
            }
        }
    }
}
