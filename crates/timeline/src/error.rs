use library::AssetKind;
use thiserror::Error;

use crate::{ClipId, TrackId};

#[derive(Debug, Error)]
pub enum TimelineError {
    /// Duration outside the legal range for the clip (below the minimum
    /// or beyond what the source can supply).
    #[error("invalid duration {requested:.3}s (allowed {min:.3}s..={max:.3}s)")]
    InvalidDuration { requested: f64, min: f64, max: f64 },

    #[error("start time must not be negative: {0:.3}")]
    InvalidStart(f64),

    #[error("track {track} does not accept {kind:?} sources")]
    TrackKindMismatch { track: TrackId, kind: AssetKind },

    #[error("no free region on track {track} fits a {duration:.3}s clip")]
    OverlapUnresolvable { track: TrackId, duration: f64 },

    #[error("split point {at:.3}s is not strictly inside clip {clip}")]
    SplitOutOfBounds { clip: ClipId, at: f64 },

    #[error("unknown clip: {0}")]
    UnknownClip(ClipId),

    #[error("unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("track {0} still has clips on it")]
    TrackNotEmpty(TrackId),
}
