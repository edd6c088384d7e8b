//! Drop-position resolution for interactive placement.
//!
//! Pure functions over the timeline: given a dragged clip's duration and
//! a raw pointer-derived start time, produce the position the drop would
//! actually land at, after snapping and overlap avoidance.

use crate::{ClipId, Timeline, TimelineError, TrackId};

/// Snap attraction threshold, seconds.
pub const SNAP_EPSILON: f64 = 0.15;

/// Snap points for a track: zero, the playhead, and the edges of every
/// clip on the track except the one being dragged.
pub fn snap_points(
    timeline: &Timeline,
    track_id: TrackId,
    playhead: f64,
    exclude: Option<ClipId>,
) -> Vec<f64> {
    let mut points = vec![0.0, playhead];
    for clip in timeline.clips_on_track(track_id) {
        if Some(clip.id) == exclude {
            continue;
        }
        points.push(clip.start_time);
        points.push(clip.end_time());
    }
    points
}

fn nearest_within(points: &[f64], value: f64, epsilon: f64) -> Option<f64> {
    points
        .iter()
        .copied()
        .filter(|p| (p - value).abs() <= epsilon)
        .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()))
}

/// Unoccupied ranges on a track, in order, ending with a final gap that
/// extends without bound. `end` is `f64::INFINITY` for that last gap.
fn gaps(timeline: &Timeline, track_id: TrackId, exclude: Option<ClipId>) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    let mut cursor = 0.0_f64;
    for clip in timeline.clips_on_track(track_id) {
        if Some(clip.id) == exclude {
            continue;
        }
        if clip.start_time > cursor {
            out.push((cursor, clip.start_time));
        }
        cursor = cursor.max(clip.end_time());
    }
    out.push((cursor, f64::INFINITY));
    out
}

/// Resolve where a clip of `duration` seconds dropped at `raw_start`
/// actually lands on `track_id`.
///
/// The start edge snaps first; if it is not near a snap point the end
/// edge gets a chance. If the snapped position collides with existing
/// clips, the clip is relocated to the alignment (gap start or gap end)
/// nearest the snapped position among gaps large enough to hold it.
pub fn resolve_drop(
    timeline: &Timeline,
    track_id: TrackId,
    duration: f64,
    raw_start: f64,
    playhead: f64,
    exclude: Option<ClipId>,
) -> Result<f64, TimelineError> {
    let points = snap_points(timeline, track_id, playhead, exclude);
    let desired = raw_start.max(0.0);

    let snapped = if let Some(p) = nearest_within(&points, desired, SNAP_EPSILON) {
        p
    } else if let Some(p) = nearest_within(&points, desired + duration, SNAP_EPSILON) {
        (p - duration).max(0.0)
    } else {
        desired
    };

    if timeline.region_is_free(track_id, snapped, duration, exclude) {
        return Ok(snapped);
    }

    let mut best: Option<f64> = None;
    for (gap_start, gap_end) in gaps(timeline, track_id, exclude) {
        if gap_end - gap_start < duration {
            continue;
        }
        let mut candidates = vec![gap_start];
        if gap_end.is_finite() {
            candidates.push(gap_end - duration);
        }
        for cand in candidates {
            let better = match best {
                Some(b) => (cand - snapped).abs() < (b - snapped).abs(),
                None => true,
            };
            if better {
                best = Some(cand);
            }
        }
    }

    best.ok_or(TimelineError::OverlapUnresolvable {
        track: track_id,
        duration,
    })
}
