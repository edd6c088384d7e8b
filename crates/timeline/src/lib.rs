//! Clip/track data model and interactive-editing core.
//!
//! The [`Timeline`] arena owns every track and clip and is the only
//! place that mutates them. [`placement`] computes snapped, collision
//! free drop positions; [`gesture`] wraps one live drag or trim into a
//! session object with drag-start snapshots and bounded previews.

mod clip;
mod error;
pub mod gesture;
mod model;
pub mod placement;
mod track;

pub use clip::{Clip, ClipId, MIN_CLIP_DURATION};
pub use error::TimelineError;
pub use gesture::{DragKind, DragPreview, DragSession};
pub use model::{Timeline, DEFAULT_STILL_DURATION, EMPTY_TIMELINE_DURATION};
pub use placement::{resolve_drop, snap_points, SNAP_EPSILON};
pub use track::{Track, TrackId, TrackKind};
