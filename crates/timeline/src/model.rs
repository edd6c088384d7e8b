use std::collections::HashMap;

use library::Asset;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Clip, ClipId, Track, TrackId, TrackKind, TimelineError, MIN_CLIP_DURATION};

/// Display floor for an empty timeline, seconds.
pub const EMPTY_TIMELINE_DURATION: f64 = 10.0;

/// Default length given to stills and other durationless sources.
pub const DEFAULT_STILL_DURATION: f64 = 5.0;

/// Tolerance used when comparing clip edges, so that back-to-back clips
/// produced by snapping or splitting never count as overlapping.
const EDGE_EPSILON: f64 = 1e-9;

type Result<T> = std::result::Result<T, TimelineError>;

/// The clip/track arena. All mutation goes through the operations here;
/// each one either applies fully or rejects without touching state.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Timeline {
    tracks: Vec<Track>,
    clips: HashMap<ClipId, Clip>,
    #[serde(default)]
    revision: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every accepted mutation. Consumers that derive state
    /// from the timeline (active clips, track layouts) compare this to
    /// decide whether their derivation is stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Index of a track in paint order. Higher index renders on top.
    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id)
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.clips.values()
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Clips on one track, ordered by start time. Derived on demand;
    /// the arena itself keeps no per-track lists.
    pub fn clips_on_track(&self, track_id: TrackId) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self
            .clips
            .values()
            .filter(|c| c.track_id == track_id)
            .collect();
        clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        clips
    }

    /// Latest clip end across all tracks, zero when empty.
    pub fn total_duration(&self) -> f64 {
        self.clips
            .values()
            .map(Clip::end_time)
            .fold(0.0, f64::max)
    }

    /// Total duration with a floor applied so an empty timeline still
    /// presents a usable ruler.
    pub fn display_duration(&self) -> f64 {
        self.total_duration().max(EMPTY_TIMELINE_DURATION)
    }

    pub fn add_track(&mut self, kind: TrackKind, name: impl Into<String>) -> TrackId {
        let track = Track::new(kind, name);
        let id = track.id;
        self.tracks.push(track);
        self.revision += 1;
        id
    }

    /// Removing a track requires it to be empty; delete its clips first.
    pub fn remove_track(&mut self, id: TrackId) -> Result<Track> {
        let idx = self
            .track_index(id)
            .ok_or(TimelineError::UnknownTrack(id))?;
        if self.clips.values().any(|c| c.track_id == id) {
            return Err(TimelineError::TrackNotEmpty(id));
        }
        let track = self.tracks.remove(idx);
        self.revision += 1;
        Ok(track)
    }

    pub fn set_track_muted(&mut self, id: TrackId, muted: bool) -> Result<()> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TimelineError::UnknownTrack(id))?;
        track.muted = muted;
        self.revision += 1;
        Ok(())
    }

    pub fn set_track_volume(&mut self, id: TrackId, volume: f32) -> Result<()> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TimelineError::UnknownTrack(id))?;
        track.volume = volume.clamp(0.0, 1.0);
        self.revision += 1;
        Ok(())
    }

    /// Place a new clip for `asset` at `start_time`. The duration
    /// defaults to the source's own length, or to
    /// [`DEFAULT_STILL_DURATION`] for stills. The in-point starts at 0.
    pub fn add_clip(
        &mut self,
        asset: &Asset,
        track_id: TrackId,
        start_time: f64,
        duration: Option<f64>,
    ) -> Result<ClipId> {
        let track = self
            .track(track_id)
            .ok_or(TimelineError::UnknownTrack(track_id))?;
        if !track.kind.accepts(asset.kind) {
            return Err(TimelineError::TrackKindMismatch {
                track: track_id,
                kind: asset.kind,
            });
        }
        if start_time < 0.0 {
            return Err(TimelineError::InvalidStart(start_time));
        }

        let duration = duration
            .or(asset.duration)
            .unwrap_or(DEFAULT_STILL_DURATION);
        let max = asset.duration.unwrap_or(f64::INFINITY);
        if duration < MIN_CLIP_DURATION || duration > max + EDGE_EPSILON {
            return Err(TimelineError::InvalidDuration {
                requested: duration,
                min: MIN_CLIP_DURATION,
                max,
            });
        }
        if !self.region_is_free(track_id, start_time, duration, None) {
            return Err(TimelineError::OverlapUnresolvable {
                track: track_id,
                duration,
            });
        }

        let clip = Clip {
            id: ClipId::new(),
            track_id,
            source_asset_id: asset.id,
            source_kind: asset.kind,
            start_time,
            duration,
            in_point: 0.0,
            source_duration: asset.duration,
        };
        let id = clip.id;
        debug!(clip = %id, track = %track_id, start_time, duration, "add clip");
        self.clips.insert(id, clip);
        self.revision += 1;
        Ok(id)
    }

    /// Reposition a clip, optionally onto another track. Rejected when
    /// the destination region is occupied or the track kind does not
    /// accept the clip's source.
    pub fn move_clip(
        &mut self,
        clip_id: ClipId,
        new_start: f64,
        new_track: Option<TrackId>,
    ) -> Result<()> {
        let clip = self
            .clips
            .get(&clip_id)
            .ok_or(TimelineError::UnknownClip(clip_id))?;
        let target = new_track.unwrap_or(clip.track_id);
        let duration = clip.duration;
        let kind = clip.source_kind;

        let track = self
            .track(target)
            .ok_or(TimelineError::UnknownTrack(target))?;
        if !track.kind.accepts(kind) {
            return Err(TimelineError::TrackKindMismatch {
                track: target,
                kind,
            });
        }
        if new_start < 0.0 {
            return Err(TimelineError::InvalidStart(new_start));
        }
        if !self.region_is_free(target, new_start, duration, Some(clip_id)) {
            return Err(TimelineError::OverlapUnresolvable {
                track: target,
                duration,
            });
        }

        let clip = self.clips.get_mut(&clip_id).ok_or(TimelineError::UnknownClip(clip_id))?;
        clip.start_time = new_start;
        clip.track_id = target;
        self.revision += 1;
        Ok(())
    }

    /// Move the leading edge. All three fields change together so the
    /// clip keeps showing the same source content at the same timeline
    /// positions it already covered.
    pub fn trim_start(
        &mut self,
        clip_id: ClipId,
        new_start: f64,
        new_in_point: f64,
        new_duration: f64,
    ) -> Result<()> {
        let clip = self
            .clips
            .get(&clip_id)
            .ok_or(TimelineError::UnknownClip(clip_id))?;
        let max = clip
            .source_duration
            .map(|sd| sd - new_in_point)
            .unwrap_or(f64::INFINITY);
        if new_duration < MIN_CLIP_DURATION || new_duration > max + EDGE_EPSILON {
            return Err(TimelineError::InvalidDuration {
                requested: new_duration,
                min: MIN_CLIP_DURATION,
                max,
            });
        }
        if new_start < 0.0 || new_in_point < 0.0 {
            return Err(TimelineError::InvalidStart(new_start.min(new_in_point)));
        }
        if !self.region_is_free(clip.track_id, new_start, new_duration, Some(clip_id)) {
            return Err(TimelineError::OverlapUnresolvable {
                track: clip.track_id,
                duration: new_duration,
            });
        }

        let clip = self.clips.get_mut(&clip_id).ok_or(TimelineError::UnknownClip(clip_id))?;
        clip.start_time = new_start;
        clip.in_point = new_in_point;
        clip.duration = new_duration;
        self.revision += 1;
        Ok(())
    }

    /// Resize from the trailing edge. Bounded above by the remaining
    /// source length for video/audio; stills have no intrinsic ceiling
    /// at the model level.
    pub fn trim_end(&mut self, clip_id: ClipId, new_duration: f64) -> Result<()> {
        let clip = self
            .clips
            .get(&clip_id)
            .ok_or(TimelineError::UnknownClip(clip_id))?;
        let max = clip
            .source_duration
            .map(|sd| sd - clip.in_point)
            .unwrap_or(f64::INFINITY);
        if new_duration < MIN_CLIP_DURATION || new_duration > max + EDGE_EPSILON {
            return Err(TimelineError::InvalidDuration {
                requested: new_duration,
                min: MIN_CLIP_DURATION,
                max,
            });
        }
        if !self.region_is_free(clip.track_id, clip.start_time, new_duration, Some(clip_id)) {
            return Err(TimelineError::OverlapUnresolvable {
                track: clip.track_id,
                duration: new_duration,
            });
        }

        let clip = self.clips.get_mut(&clip_id).ok_or(TimelineError::UnknownClip(clip_id))?;
        clip.duration = new_duration;
        self.revision += 1;
        Ok(())
    }

    /// Cut a clip in two at `at_time`. The left half keeps the original
    /// id and in-point; the right half gets a fresh id and an in-point
    /// advanced by the left half's length, so the source content plays
    /// through the cut unchanged.
    pub fn split_clip(&mut self, clip_id: ClipId, at_time: f64) -> Result<ClipId> {
        let clip = self
            .clips
            .get(&clip_id)
            .ok_or(TimelineError::UnknownClip(clip_id))?;
        if at_time <= clip.start_time || at_time >= clip.end_time() {
            return Err(TimelineError::SplitOutOfBounds {
                clip: clip_id,
                at: at_time,
            });
        }
        let left_dur = at_time - clip.start_time;
        let right_dur = clip.duration - left_dur;
        if left_dur < MIN_CLIP_DURATION || right_dur < MIN_CLIP_DURATION {
            return Err(TimelineError::InvalidDuration {
                requested: left_dur.min(right_dur),
                min: MIN_CLIP_DURATION,
                max: clip.duration - MIN_CLIP_DURATION,
            });
        }

        let right = Clip {
            id: ClipId::new(),
            track_id: clip.track_id,
            source_asset_id: clip.source_asset_id,
            source_kind: clip.source_kind,
            start_time: at_time,
            duration: right_dur,
            in_point: clip.in_point + left_dur,
            source_duration: clip.source_duration,
        };
        let right_id = right.id;

        let left = self.clips.get_mut(&clip_id).ok_or(TimelineError::UnknownClip(clip_id))?;
        left.duration = left_dur;
        debug!(clip = %clip_id, right = %right_id, at_time, "split clip");
        self.clips.insert(right_id, right);
        self.revision += 1;
        Ok(right_id)
    }

    pub fn delete_clip(&mut self, clip_id: ClipId) -> Result<Clip> {
        let clip = self
            .clips
            .remove(&clip_id)
            .ok_or(TimelineError::UnknownClip(clip_id))?;
        self.revision += 1;
        Ok(clip)
    }

    /// Whether `[start, start+duration)` on `track_id` touches no clip
    /// other than `exclude`.
    pub fn region_is_free(
        &self,
        track_id: TrackId,
        start: f64,
        duration: f64,
        exclude: Option<ClipId>,
    ) -> bool {
        let end = start + duration;
        !self.clips.values().any(|c| {
            c.track_id == track_id
                && Some(c.id) != exclude
                && start < c.end_time() - EDGE_EPSILON
                && c.start_time < end - EDGE_EPSILON
        })
    }
}
