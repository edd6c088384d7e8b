use library::AssetKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Kind compatibility: video tracks carry visual sources, audio
    /// tracks carry audio only.
    pub fn accepts(self, kind: AssetKind) -> bool {
        match self {
            TrackKind::Video => matches!(
                kind,
                AssetKind::Video | AssetKind::Image | AssetKind::Animation
            ),
            TrackKind::Audio => matches!(kind, AssetKind::Audio),
        }
    }
}

/// A lane of non-overlapping clips. Video tracks are layered: the track
/// with the highest index paints on top. Audio tracks mix independently
/// with per-track mute and volume.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    pub name: String,
    pub muted: bool,
    pub volume: f32,
}

impl Track {
    pub fn new(kind: TrackKind, name: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            kind,
            name: name.into(),
            muted: false,
            volume: 1.0,
        }
    }
}
