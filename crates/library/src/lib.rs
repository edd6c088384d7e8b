//! Asset catalog for the composition engine.
//!
//! Assets are imported media sources (videos, images, audio, animations).
//! The timeline references them by id; the catalog owns the metadata
//! needed to validate placement and to drive playback.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Image,
    Audio,
    Animation,
}

impl AssetKind {
    /// Whether sources of this kind carry an intrinsic duration.
    pub fn has_intrinsic_duration(self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Audio)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub name: String,
    /// Opaque locator handed to transports and frame extractors. The
    /// catalog does not touch the filesystem itself.
    pub location: String,
    /// Source duration in seconds. `None` for images and other
    /// durationless sources.
    pub duration: Option<f64>,
}

impl Asset {
    pub fn new(kind: AssetKind, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(),
            kind,
            name: name.into(),
            location: location.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Lookup surface the timeline and playback layers depend on. Backed by
/// [`AssetCatalog`] in-memory here; a persistent store can implement the
/// same trait.
pub trait AssetStore {
    fn get(&self, id: AssetId) -> Option<&Asset>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AssetCatalog {
    assets: HashMap<AssetId, Asset>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: Asset) -> AssetId {
        let id = asset.id;
        self.assets.insert(id, asset);
        id
    }

    pub fn remove(&mut self, id: AssetId) -> Option<Asset> {
        self.assets.remove(&id)
    }

    pub fn require(&self, id: AssetId) -> Result<&Asset, LibraryError> {
        self.assets.get(&id).ok_or(LibraryError::UnknownAsset(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetStore for AssetCatalog {
    fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }
}
