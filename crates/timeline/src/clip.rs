use library::{AssetId, AssetKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TrackId;

/// Shortest clip the model accepts, in seconds.
pub const MIN_CLIP_DURATION: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A placed reference to a range of a source asset. Clips carry their
/// track id as a plain key; tracks never hold clip lists themselves.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub track_id: TrackId,
    pub source_asset_id: AssetId,
    pub source_kind: AssetKind,
    /// Timeline position of the leading edge, seconds.
    pub start_time: f64,
    /// Visible length on the timeline, seconds.
    pub duration: f64,
    /// Offset into the source at which content begins.
    pub in_point: f64,
    /// Intrinsic source length for video/audio, absent for stills.
    pub source_duration: Option<f64>,
}

impl Clip {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Half-open containment test over `[start, start+duration)`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    /// The source offset corresponding to the clip's trailing edge.
    pub fn out_point(&self) -> f64 {
        self.in_point + self.duration
    }
}
