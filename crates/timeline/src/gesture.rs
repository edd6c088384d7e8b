//! Gesture sessions for interactive move and trim.
//!
//! A session owns the drag-start snapshot (original clip geometry, the
//! frozen track ceiling) and turns raw pointer positions into bounded
//! previews. Nothing touches the timeline until `finish`, and a session
//! whose clip has meanwhile been deleted commits as a no-op.

use tracing::debug;

use crate::placement::resolve_drop;
use crate::{ClipId, Timeline, TimelineError, TrackId, MIN_CLIP_DURATION};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragKind {
    Move,
    TrimStart,
    TrimEnd,
}

/// Clip geometry captured when the gesture began. Trim bounds are taken
/// from this snapshot, not live state, so a still image cannot creep
/// past its drag-start length across successive updates.
#[derive(Clone, Copy, Debug)]
struct ClipSnapshot {
    track_id: TrackId,
    start_time: f64,
    duration: f64,
    in_point: f64,
    source_duration: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragPreview {
    Move {
        track_id: TrackId,
        start_time: f64,
    },
    TrimStart {
        start_time: f64,
        in_point: f64,
        duration: f64,
    },
    TrimEnd {
        duration: f64,
    },
}

#[derive(Debug)]
pub struct DragSession {
    clip_id: ClipId,
    kind: DragKind,
    origin: ClipSnapshot,
    track_ceiling: usize,
    preview: Option<DragPreview>,
}

impl DragSession {
    pub fn begin(
        timeline: &Timeline,
        clip_id: ClipId,
        kind: DragKind,
    ) -> Result<Self, TimelineError> {
        let clip = timeline
            .clip(clip_id)
            .ok_or(TimelineError::UnknownClip(clip_id))?;
        debug!(clip = %clip_id, ?kind, "begin drag");
        Ok(Self {
            clip_id,
            kind,
            origin: ClipSnapshot {
                track_id: clip.track_id,
                start_time: clip.start_time,
                duration: clip.duration,
                in_point: clip.in_point,
                source_duration: clip.source_duration,
            },
            track_ceiling: timeline.tracks().len() + 1,
            preview: None,
        })
    }

    pub fn clip_id(&self) -> ClipId {
        self.clip_id
    }

    pub fn kind(&self) -> DragKind {
        self.kind
    }

    /// Number of tracks droppable while this drag is live: the tracks
    /// that existed at drag start plus one empty lane. Frozen for the
    /// session so rapid pointer movement cannot spawn track after track.
    pub fn track_ceiling(&self) -> usize {
        self.track_ceiling
    }

    pub fn preview(&self) -> Option<&DragPreview> {
        self.preview.as_ref()
    }

    /// Feed a move gesture a new pointer position. The resolved
    /// (snapped, collision-free) position becomes the pending preview.
    /// Tracks past the frozen ceiling are not drop targets for this
    /// session, even if they have appeared since the drag began.
    pub fn update_move(
        &mut self,
        timeline: &Timeline,
        target_track: TrackId,
        raw_start: f64,
        playhead: f64,
    ) -> Result<DragPreview, TimelineError> {
        let clip = timeline
            .clip(self.clip_id)
            .ok_or(TimelineError::UnknownClip(self.clip_id))?;
        let track_index = timeline
            .track_index(target_track)
            .filter(|&idx| idx < self.track_ceiling)
            .ok_or(TimelineError::UnknownTrack(target_track))?;
        let track = &timeline.tracks()[track_index];
        if !track.kind.accepts(clip.source_kind) {
            return Err(TimelineError::TrackKindMismatch {
                track: target_track,
                kind: clip.source_kind,
            });
        }

        let start_time = resolve_drop(
            timeline,
            target_track,
            self.origin.duration,
            raw_start,
            playhead,
            Some(self.clip_id),
        )?;
        let preview = DragPreview::Move {
            track_id: target_track,
            start_time,
        };
        self.preview = Some(preview);
        Ok(preview)
    }

    /// Feed a leading-edge trim a new edge position. The edge is clamped
    /// so the in-point stays non-negative, the clip keeps its minimum
    /// length, and it cannot run into the previous clip on the track.
    pub fn update_trim_start(&mut self, timeline: &Timeline, raw_edge: f64) -> DragPreview {
        let o = &self.origin;
        let mut delta = raw_edge - o.start_time;

        // Lower bound: timeline zero, source start for real media, and
        // the end of whatever clip precedes this one.
        let mut min_delta = -o.start_time;
        if o.source_duration.is_some() {
            min_delta = min_delta.max(-o.in_point);
        }
        if let Some(prev_end) = timeline
            .clips_on_track(o.track_id)
            .iter()
            .filter(|c| c.id != self.clip_id && c.end_time() <= o.start_time + 1e-9)
            .map(|c| c.end_time())
            .reduce(f64::max)
        {
            min_delta = min_delta.max(prev_end - o.start_time);
        }
        let max_delta = o.duration - MIN_CLIP_DURATION;
        delta = delta.clamp(min_delta, max_delta);

        let in_point = if o.source_duration.is_some() {
            o.in_point + delta
        } else {
            0.0
        };
        let preview = DragPreview::TrimStart {
            start_time: o.start_time + delta,
            in_point,
            duration: o.duration - delta,
        };
        self.preview = Some(preview);
        preview
    }

    /// Feed a trailing-edge trim a new edge position. Media clips are
    /// capped by the source length remaining past the in-point; stills
    /// are capped at their drag-start duration.
    pub fn update_trim_end(&mut self, timeline: &Timeline, raw_edge: f64) -> DragPreview {
        let o = &self.origin;
        let mut max_duration = match o.source_duration {
            Some(sd) => sd - o.in_point,
            None => o.duration,
        };
        if let Some(next_start) = timeline
            .clips_on_track(o.track_id)
            .iter()
            .filter(|c| c.id != self.clip_id && c.start_time >= o.start_time + o.duration - 1e-9)
            .map(|c| c.start_time)
            .reduce(f64::min)
        {
            max_duration = max_duration.min(next_start - o.start_time);
        }

        let duration = (raw_edge - o.start_time).clamp(MIN_CLIP_DURATION, max_duration);
        let preview = DragPreview::TrimEnd { duration };
        self.preview = Some(preview);
        preview
    }

    /// Commit the pending preview through the model. Returns the applied
    /// preview, or `None` when there was nothing to apply or the clip
    /// was deleted mid-gesture (staleness is a no-op, not an error).
    pub fn finish(self, timeline: &mut Timeline) -> Result<Option<DragPreview>, TimelineError> {
        let Some(preview) = self.preview else {
            return Ok(None);
        };
        if timeline.clip(self.clip_id).is_none() {
            debug!(clip = %self.clip_id, "drag target deleted mid-gesture, dropping commit");
            return Ok(None);
        }
        match preview {
            DragPreview::Move {
                track_id,
                start_time,
            } => timeline.move_clip(self.clip_id, start_time, Some(track_id))?,
            DragPreview::TrimStart {
                start_time,
                in_point,
                duration,
            } => timeline.trim_start(self.clip_id, start_time, in_point, duration)?,
            DragPreview::TrimEnd { duration } => timeline.trim_end(self.clip_id, duration)?,
        }
        Ok(Some(preview))
    }

    /// Drop the session without touching the timeline.
    pub fn cancel(self) {
        debug!(clip = %self.clip_id, "drag cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackKind;
    use approx::assert_relative_eq;
    use library::{Asset, AssetKind};

    fn video_asset(duration: f64) -> Asset {
        Asset::new(AssetKind::Video, "v", "media/v.mp4").with_duration(duration)
    }

    fn image_asset() -> Asset {
        Asset::new(AssetKind::Image, "i", "media/i.png")
    }

    #[test]
    fn move_commit_applies_resolved_position() {
        let mut tl = Timeline::new();
        let track = tl.add_track(TrackKind::Video, "V1");
        tl.add_clip(&video_asset(5.0), track, 0.0, None).unwrap();
        let id = tl.add_clip(&video_asset(3.0), track, 10.0, None).unwrap();

        let mut session = DragSession::begin(&tl, id, DragKind::Move).unwrap();
        session.update_move(&tl, track, 4.9, 0.0).unwrap();
        let applied = session.finish(&mut tl).unwrap();

        assert_eq!(
            applied,
            Some(DragPreview::Move {
                track_id: track,
                start_time: 5.0
            })
        );
        assert_relative_eq!(tl.clip(id).unwrap().start_time, 5.0);
    }

    #[test]
    fn stale_session_commits_as_noop() {
        let mut tl = Timeline::new();
        let track = tl.add_track(TrackKind::Video, "V1");
        let id = tl.add_clip(&video_asset(5.0), track, 0.0, None).unwrap();

        let mut session = DragSession::begin(&tl, id, DragKind::Move).unwrap();
        session.update_move(&tl, track, 8.0, 0.0).unwrap();
        tl.delete_clip(id).unwrap();
        let rev = tl.revision();

        assert_eq!(session.finish(&mut tl).unwrap(), None);
        assert_eq!(tl.revision(), rev);
    }

    #[test]
    fn track_ceiling_frozen_at_start() {
        let mut tl = Timeline::new();
        let track = tl.add_track(TrackKind::Video, "V1");
        let id = tl.add_clip(&video_asset(5.0), track, 0.0, None).unwrap();

        let session = DragSession::begin(&tl, id, DragKind::Move).unwrap();
        assert_eq!(session.track_ceiling(), 2);
        tl.add_track(TrackKind::Video, "V2");
        assert_eq!(session.track_ceiling(), 2);
    }

    #[test]
    fn move_rejects_tracks_past_the_ceiling() {
        let mut tl = Timeline::new();
        let v1 = tl.add_track(TrackKind::Video, "V1");
        let id = tl.add_clip(&video_asset(5.0), v1, 0.0, None).unwrap();

        // Ceiling is 2: V1 plus one new lane. Tracks added after the
        // drag began beyond that are not drop targets.
        let mut session = DragSession::begin(&tl, id, DragKind::Move).unwrap();
        let v2 = tl.add_track(TrackKind::Video, "V2");
        let v3 = tl.add_track(TrackKind::Video, "V3");

        session.update_move(&tl, v2, 2.0, 0.0).unwrap();
        let err = session.update_move(&tl, v3, 2.0, 0.0).unwrap_err();
        assert!(matches!(err, TimelineError::UnknownTrack(t) if t == v3));
    }

    #[test]
    fn trim_start_clamps_at_source_begin() {
        let mut tl = Timeline::new();
        let track = tl.add_track(TrackKind::Video, "V1");
        let id = tl.add_clip(&video_asset(20.0), track, 5.0, Some(10.0)).unwrap();
        tl.trim_start(id, 7.0, 2.0, 8.0).unwrap();

        let mut session = DragSession::begin(&tl, id, DragKind::TrimStart).unwrap();
        // Asking for an edge far left of what in_point=2 allows.
        let preview = session.update_trim_start(&tl, 0.0);
        assert_eq!(
            preview,
            DragPreview::TrimStart {
                start_time: 5.0,
                in_point: 0.0,
                duration: 10.0
            }
        );
        session.finish(&mut tl).unwrap();
        assert_relative_eq!(tl.clip(id).unwrap().in_point, 0.0);
    }

    #[test]
    fn image_cannot_extend_past_drag_start_length() {
        let mut tl = Timeline::new();
        let track = tl.add_track(TrackKind::Video, "V1");
        let id = tl.add_clip(&image_asset(), track, 0.0, Some(4.0)).unwrap();

        let mut session = DragSession::begin(&tl, id, DragKind::TrimEnd).unwrap();
        assert_eq!(
            session.update_trim_end(&tl, 30.0),
            DragPreview::TrimEnd { duration: 4.0 }
        );
        // Shrinking still works.
        assert_eq!(
            session.update_trim_end(&tl, 2.0),
            DragPreview::TrimEnd { duration: 2.0 }
        );
    }

    #[test]
    fn trim_end_stops_at_next_clip() {
        let mut tl = Timeline::new();
        let track = tl.add_track(TrackKind::Video, "V1");
        let id = tl.add_clip(&video_asset(30.0), track, 0.0, Some(5.0)).unwrap();
        tl.add_clip(&video_asset(5.0), track, 8.0, None).unwrap();

        let mut session = DragSession::begin(&tl, id, DragKind::TrimEnd).unwrap();
        assert_eq!(
            session.update_trim_end(&tl, 12.0),
            DragPreview::TrimEnd { duration: 8.0 }
        );
    }
}
