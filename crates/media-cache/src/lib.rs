//! Frame cache and thumbnail strips for scrub-time rendering.
//!
//! No timeline awareness here: sources are opaque string locators and
//! timestamps are plain seconds. Lookups never fail; a miss is `None`.

mod error;
mod frame;
mod lru;
mod thumbs;

pub use error::CacheError;
pub use frame::{Frame, FrameCache, FrameKey, PRELOAD_BATCH};
pub use lru::LruCache;
pub use thumbs::{ThumbnailGenerator, ThumbnailProgress, ThumbnailStrip, THUMBNAIL_INTERVAL};
