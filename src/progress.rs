//! Progress-callback trait for per-file pipeline events.
//!
//! Inject an `Arc<dyn FetchProgressCallback>` via
//! [`crate::config::FetchConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each stage. The callback approach is
//! the least-invasive integration point: callers can forward events to a
//! terminal progress bar, a log file, or a channel without the library
//! knowing how the host application communicates. All methods have default
//! no-op implementations so callers only override what they care about.

use crate::output::{FetchStats, Stage};
use std::sync::Arc;

/// Called by the orchestrator as it processes each file.
///
/// The pipeline is sequential, so events for a given run arrive in order
/// from a single task; implementations still must be `Send + Sync` because
/// the callback crosses `spawn_blocking` boundaries.
pub trait FetchProgressCallback: Send + Sync {
    /// Called once when a stage begins, with the number of files it will
    /// process.
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let _ = (stage, total);
    }

    /// Called just before a file is processed.
    fn on_file_start(&self, stage: Stage, name: &str, index: usize, total: usize) {
        let _ = (stage, name, index, total);
    }

    /// Called when a file completes its stage successfully.
    ///
    /// `bytes` is the stage's output size (for the extract stage, the
    /// number of files produced).
    fn on_file_complete(&self, stage: Stage, name: &str, bytes: u64) {
        let _ = (stage, name, bytes);
    }

    /// Called when a file fails its stage.
    fn on_file_error(&self, stage: Stage, name: &str, error: String) {
        let _ = (stage, name, error);
    }

    /// Called once after the last stage finishes.
    fn on_fetch_complete(&self, stats: &FetchStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FetchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::FetchConfig`].
pub type ProgressCallback = Arc<dyn FetchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        finished: AtomicUsize,
    }

    impl FetchProgressCallback for TrackingCallback {
        fn on_file_start(&self, _stage: Stage, _name: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _stage: Stage, _name: &str, _bytes: u64) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _stage: Stage, _name: &str, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fetch_complete(&self, stats: &FetchStats) {
            self.finished.store(stats.converted, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Download, 3);
        cb.on_file_start(Stage::Download, "a.zip", 1, 3);
        cb.on_file_complete(Stage::Download, "a.zip", 1024);
        cb.on_file_error(Stage::Convert, "b.doc", "HTTP 500".to_string());
        cb.on_fetch_complete(&FetchStats::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        };

        tracker.on_file_start(Stage::Download, "a.zip", 1, 2);
        tracker.on_file_complete(Stage::Download, "a.zip", 100);
        tracker.on_file_start(Stage::Download, "b.zip", 2, 2);
        tracker.on_file_error(Stage::Download, "b.zip", "timed out".to_string());

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        let stats = FetchStats {
            converted: 5,
            ..FetchStats::default()
        };
        tracker.on_fetch_complete(&stats);
        assert_eq!(tracker.finished.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn FetchProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Extract, 10);
        cb.on_file_complete(Stage::Extract, "a.zip", 2);
    }
}
