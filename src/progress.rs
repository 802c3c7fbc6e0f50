/*!
 * Progress reporting and cooperative cancellation for extraction runs.
 *
 * Progress is delivered as discrete `(percent, message)` milestones. The
 * reporter clamps every milestone so that percentages never go backwards
 * within one run, even when a nested stage (engine loading) reports its own
 * sub-progress.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Progress callback signature: percentage in `0..=100` and a short status phrase
pub type ProgressFn<'a> = dyn Fn(u8, &str) + Send + Sync + 'a;

/// Engine-level progress callback: percentage of the engine's own work
pub type EngineProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

// @const: Milestones of one pipeline run
pub const PROGRESS_ENGINE_LOAD_START: u8 = 5;
pub const PROGRESS_ENGINE_LOADED: u8 = 20;
pub const PROGRESS_SOURCE_WRITTEN: u8 = 30;
pub const PROGRESS_STREAMS_DISCOVERED: u8 = 35;
pub const PROGRESS_TRACKS_END: u8 = 95;
pub const PROGRESS_DONE: u8 = 100;

/// Non-decreasing wrapper around an optional progress callback
pub struct ProgressReporter<'a> {
    callback: Option<&'a ProgressFn<'a>>,
    last: AtomicU8,
}

impl<'a> ProgressReporter<'a> {
    /// Create a reporter; `None` discards every milestone
    pub fn new(callback: Option<&'a ProgressFn<'a>>) -> Self {
        Self {
            callback,
            last: AtomicU8::new(0),
        }
    }

    /// Report a milestone, clamped to `[last, 100]`
    pub fn report(&self, percent: u8, message: &str) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        let effective = previous.max(percent);
        if let Some(callback) = self.callback {
            callback(effective, message);
        }
    }

    /// Highest percentage reported so far
    pub fn last_percent(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    /// Map a sub-stage's own 0-100 progress into `[start, end]`
    pub fn scaled(start: u8, end: u8, sub_percent: u8) -> u8 {
        let span = end.saturating_sub(start) as u32;
        start + (span * sub_percent.min(100) as u32 / 100) as u8
    }

    /// Milestone for the `done`-th of `total` per-track attempts
    pub fn track_milestone(done: usize, total: usize) -> u8 {
        if total == 0 {
            return PROGRESS_TRACKS_END;
        }
        let span = (PROGRESS_TRACKS_END - PROGRESS_STREAMS_DISCOVERED) as usize;
        PROGRESS_STREAMS_DISCOVERED + (span * done.min(total) / total) as u8
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone it, hand one copy to the pipeline and call [`cancel`](Self::cancel)
/// from anywhere else. The pipeline checks the token between engine
/// invocations and cleans up its staged files before returning.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
