//! Small timing primitives shared by the clock: a cancellable debounce
//! slot and a measured-elapsed frame ticker.

use std::time::{Duration, Instant};

/// Holds at most one pending value; each `arm` restarts the quiet
/// period. The value fires through `poll` only once the delay has
/// passed without another `arm`.
#[derive(Debug)]
pub struct DebounceSlot<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> DebounceSlot<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn arm(&mut self, value: T, now: Instant) {
        self.pending = Some((now, value));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((armed_at, _)) if now.duration_since(*armed_at) >= self.delay => {
                self.pending.take().map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

/// Measures real elapsed time between frames. Uneven frame delivery
/// then advances the clock by exactly what passed, not a fixed step.
#[derive(Debug, Default)]
pub struct FrameTicker {
    last: Option<Instant>,
}

impl FrameTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed time since the previous tick; zero on the first tick
    /// after construction or a reset.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let elapsed = self
            .last
            .map(|last| now.duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last = Some(now);
        elapsed
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
