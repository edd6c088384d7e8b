//! Keeps media transports aligned to the playback cursor.
//!
//! One persistent transport per active clip: every audio clip sounding
//! at the cursor, plus the visually active video clip. Transports
//! free-run inside a drift tolerance and are hard-seeked only when they
//! wander, so normal playback never stutters from corrective seeks.

use std::collections::{HashMap, HashSet};

use library::{AssetId, AssetStore};
use thiserror::Error;
use timeline::{Clip, ClipId, Timeline};
use tracing::{debug, warn};

use crate::clock::{active_audio_clips, active_visual_clip, PlaybackClock};

/// Divergence between a transport's position and its computed target
/// before a hard seek is forced, seconds.
pub const DRIFT_TOLERANCE: f64 = 0.3;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot open transport for asset {asset}: {reason}")]
    TransportUnavailable { asset: AssetId, reason: String },
}

/// A playable handle on one media source. Implementations wrap whatever
/// the platform provides (decoder pipeline, audio sink); the
/// synchronizer only ever drives this surface.
pub trait MediaTransport {
    fn position(&self) -> f64;
    fn seek(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f32);
    fn set_playing(&mut self, playing: bool);
}

pub trait TransportFactory {
    fn open(&self, location: &str) -> Result<Box<dyn MediaTransport>, SyncError>;
}

pub struct MediaSynchronizer {
    factory: Box<dyn TransportFactory>,
    transports: HashMap<ClipId, Box<dyn MediaTransport>>,
    global_mute: bool,
}

impl MediaSynchronizer {
    pub fn new(factory: Box<dyn TransportFactory>) -> Self {
        Self {
            factory,
            transports: HashMap::new(),
            global_mute: false,
        }
    }

    pub fn set_global_mute(&mut self, muted: bool) {
        self.global_mute = muted;
    }

    pub fn global_mute(&self) -> bool {
        self.global_mute
    }

    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }

    /// Release every transport, e.g. when the media source set changes
    /// wholesale.
    pub fn clear(&mut self) {
        self.transports.clear();
    }

    /// Align all transports to the clock. Creates handles lazily for
    /// newly active clips, corrects drifted positions, applies per-track
    /// volume and mute, and tears down handles whose clips stopped being
    /// active.
    pub fn sync(&mut self, timeline: &Timeline, assets: &dyn AssetStore, clock: &PlaybackClock) {
        let time = clock.current_time();
        let mut active: Vec<&Clip> = active_audio_clips(timeline, time);
        if let Some(visual) = active_visual_clip(timeline, time) {
            if visual.source_duration.is_some() {
                active.push(visual);
            }
        }

        let active_ids: HashSet<ClipId> = active.iter().map(|c| c.id).collect();
        self.transports.retain(|clip_id, _| {
            let keep = active_ids.contains(clip_id);
            if !keep {
                debug!(clip = %clip_id, "releasing transport");
            }
            keep
        });

        for clip in active {
            if !self.transports.contains_key(&clip.id) {
                let Some(asset) = assets.get(clip.source_asset_id) else {
                    warn!(clip = %clip.id, asset = %clip.source_asset_id, "asset missing, no transport");
                    continue;
                };
                match self.factory.open(&asset.location) {
                    Ok(mut transport) => {
                        transport.seek(clip.in_point + (time - clip.start_time));
                        self.transports.insert(clip.id, transport);
                    }
                    Err(err) => {
                        warn!(clip = %clip.id, %err, "transport open failed");
                        continue;
                    }
                }
            }
            let Some(transport) = self.transports.get_mut(&clip.id) else {
                continue;
            };

            let target = clip.in_point + (time - clip.start_time);
            if (transport.position() - target).abs() > DRIFT_TOLERANCE {
                debug!(clip = %clip.id, target, actual = transport.position(), "drift correction");
                transport.seek(target);
            }

            let track = timeline.track(clip.track_id);
            let (track_muted, track_volume) = track
                .map(|t| (t.muted, t.volume))
                .unwrap_or((false, 1.0));
            let volume = if self.global_mute || track_muted {
                0.0
            } else {
                track_volume
            };
            transport.set_volume(volume);
            transport.set_playing(clock.is_playing());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use library::{Asset, AssetCatalog, AssetKind};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use timeline::TrackKind;

    #[derive(Debug, Default)]
    struct TransportState {
        position: f64,
        volume: f32,
        playing: bool,
        seeks: Vec<f64>,
    }

    struct FakeTransport(Arc<Mutex<TransportState>>);

    impl MediaTransport for FakeTransport {
        fn position(&self) -> f64 {
            self.0.lock().unwrap().position
        }
        fn seek(&mut self, seconds: f64) {
            let mut s = self.0.lock().unwrap();
            s.position = seconds;
            s.seeks.push(seconds);
        }
        fn set_volume(&mut self, volume: f32) {
            self.0.lock().unwrap().volume = volume;
        }
        fn set_playing(&mut self, playing: bool) {
            self.0.lock().unwrap().playing = playing;
        }
    }

    #[derive(Default)]
    struct FakeFactory {
        opened: Arc<Mutex<Vec<String>>>,
        states: Arc<Mutex<Vec<Arc<Mutex<TransportState>>>>>,
    }

    impl TransportFactory for FakeFactory {
        fn open(&self, location: &str) -> Result<Box<dyn MediaTransport>, SyncError> {
            self.opened.lock().unwrap().push(location.to_string());
            let state = Arc::new(Mutex::new(TransportState::default()));
            self.states.lock().unwrap().push(state.clone());
            Ok(Box::new(FakeTransport(state)))
        }
    }

    fn setup() -> (Timeline, AssetCatalog, ClipId, ClipId) {
        let mut tl = Timeline::new();
        let v1 = tl.add_track(TrackKind::Video, "V1");
        let a1 = tl.add_track(TrackKind::Audio, "A1");

        let mut catalog = AssetCatalog::new();
        let video = Asset::new(AssetKind::Video, "v", "media/v.mp4").with_duration(10.0);
        let audio = Asset::new(AssetKind::Audio, "a", "media/a.wav").with_duration(10.0);
        catalog.insert(video.clone());
        catalog.insert(audio.clone());

        let vclip = tl.add_clip(&video, v1, 0.0, Some(8.0)).unwrap();
        let aclip = tl.add_clip(&audio, a1, 2.0, Some(6.0)).unwrap();
        (tl, catalog, vclip, aclip)
    }

    #[test]
    fn transports_created_lazily_and_torn_down() {
        let (tl, catalog, _vclip, _aclip) = setup();
        let factory = FakeFactory::default();
        let opened = factory.opened.clone();
        let mut sync = MediaSynchronizer::new(Box::new(factory));
        let mut clock = PlaybackClock::new();

        // At t=0 only the video clip is active.
        sync.sync(&tl, &catalog, &clock);
        assert_eq!(sync.transport_count(), 1);
        assert_eq!(opened.lock().unwrap().as_slice(), ["media/v.mp4"]);

        // At t=3 the audio clip joined; no second open for the video.
        clock.seek(&tl, 3.0, Instant::now());
        sync.sync(&tl, &catalog, &clock);
        assert_eq!(sync.transport_count(), 2);
        assert_eq!(opened.lock().unwrap().len(), 2);

        // Past both clips everything is released.
        clock.seek(&tl, 9.0, Instant::now());
        sync.sync(&tl, &catalog, &clock);
        assert_eq!(sync.transport_count(), 0);
    }

    #[test]
    fn drift_inside_tolerance_free_runs() {
        let (tl, catalog, _vclip, _aclip) = setup();
        let factory = FakeFactory::default();
        let states = factory.states.clone();
        let mut sync = MediaSynchronizer::new(Box::new(factory));
        let mut clock = PlaybackClock::new();
        // t=1.0: only the video clip is active, target media time 1.0.
        clock.seek(&tl, 1.0, Instant::now());

        sync.sync(&tl, &catalog, &clock);
        let video_state = states.lock().unwrap()[0].clone();
        // Creation seeked to the target once.
        assert_eq!(video_state.lock().unwrap().seeks.len(), 1);

        // Drift of 0.2s: leave it alone.
        video_state.lock().unwrap().position = 1.2;
        sync.sync(&tl, &catalog, &clock);
        assert_eq!(video_state.lock().unwrap().seeks.len(), 1);

        // Drift past 0.3s: hard seek back to the target.
        video_state.lock().unwrap().position = 1.5;
        sync.sync(&tl, &catalog, &clock);
        let state = video_state.lock().unwrap();
        assert_eq!(state.seeks.len(), 2);
        assert_relative_eq!(state.position, 1.0);
    }

    #[test]
    fn mute_and_volume_flow_to_transports() {
        let (mut tl, catalog, _vclip, aclip) = setup();
        let audio_track = tl.clip(aclip).unwrap().track_id;
        tl.set_track_volume(audio_track, 0.6).unwrap();

        let factory = FakeFactory::default();
        let states = factory.states.clone();
        let mut sync = MediaSynchronizer::new(Box::new(factory));
        let mut clock = PlaybackClock::new();
        clock.seek(&tl, 3.0, Instant::now());

        // Audio clips sync before the visual clip, so the audio
        // transport is the first one opened.
        sync.sync(&tl, &catalog, &clock);
        let audio_state = states.lock().unwrap()[0].clone();
        assert_relative_eq!(audio_state.lock().unwrap().volume, 0.6);

        tl.set_track_muted(audio_track, true).unwrap();
        sync.sync(&tl, &catalog, &clock);
        assert_relative_eq!(audio_state.lock().unwrap().volume, 0.0);

        tl.set_track_muted(audio_track, false).unwrap();
        sync.set_global_mute(true);
        sync.sync(&tl, &catalog, &clock);
        assert_relative_eq!(audio_state.lock().unwrap().volume, 0.0);
    }

    #[test]
    fn play_state_reaches_transports() {
        let (tl, catalog, _vclip, _aclip) = setup();
        let factory = FakeFactory::default();
        let states = factory.states.clone();
        let mut sync = MediaSynchronizer::new(Box::new(factory));
        let mut clock = PlaybackClock::new();

        sync.sync(&tl, &catalog, &clock);
        let video_state = states.lock().unwrap()[0].clone();
        assert!(!video_state.lock().unwrap().playing);

        clock.play();
        sync.sync(&tl, &catalog, &clock);
        assert!(video_state.lock().unwrap().playing);
    }
}
