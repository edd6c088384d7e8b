//! Synchronized playback over a timeline.
//!
//! [`PlaybackClock`] owns the single authoritative time cursor;
//! [`MediaSynchronizer`] keeps per-clip media transports aligned to it.

pub mod clock;
pub mod scheduler;
pub mod sync;

pub use clock::{
    active_audio_clips, active_clip, active_visual_clip, ClockDrive, PlaybackClock, SEEK_DEBOUNCE,
};
pub use scheduler::{DebounceSlot, FrameTicker};
pub use sync::{
    MediaSynchronizer, MediaTransport, SyncError, TransportFactory, DRIFT_TOLERANCE,
};
