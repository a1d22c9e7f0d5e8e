//! Engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

use bgm_ipc::EngineStatsSnapshot;

/// Counts rendered frames, posted events and failures.
#[derive(Debug, Default)]
pub struct EngineStats {
    frames_rendered: AtomicU64,
    events_posted: AtomicU64,
    stop_requests: AtomicU64,
    init_failures: AtomicU64,
}

impl EngineStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rendered frame.
    pub fn record_frame(&self) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a play event that produced a playing instance.
    pub fn record_event_posted(&self) {
        self.events_posted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stop request.
    pub fn record_stop(&self) {
        self.stop_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed `init`.
    pub fn record_init_failure(&self) {
        self.init_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current counters.
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            events_posted: self.events_posted.load(Ordering::Relaxed),
            stop_requests: self.stop_requests.load(Ordering::Relaxed),
            init_failures: self.init_failures.load(Ordering::Relaxed),
        }
    }
}
