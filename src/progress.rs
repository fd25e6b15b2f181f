//! Progress-callback trait for per-object transfer events.
//!
//! Inject an [`Arc<dyn TransferProgress>`] via
//! [`crate::config::FlowConfigBuilder::progress`] to receive real-time events
//! as the transfer layer fans batches out across the worker pool.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database record,
//! or a terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` so it works
//! correctly when objects are transferred concurrently.
//!
//! # Example
//!
//! ```rust
//! use docprep::{TransferDirection, TransferProgress, FlowConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl TransferProgress for CountingCallback {
//!     fn on_object_complete(&self, direction: TransferDirection, key: &str) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{direction} {key} done ({done} so far)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = FlowConfig::builder()
//!     .progress(counter as Arc<dyn TransferProgress>)
//!     .build()
//!     .unwrap();
//! # let _ = config;
//! ```

use std::sync::Arc;

/// Which way a batch is moving through the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Download,
    Upload,
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferDirection::Download => write!(f, "download"),
            TransferDirection::Upload => write!(f, "upload"),
        }
    }
}

/// Called by the transfer layer as it moves each object.
///
/// Implementations must be `Send + Sync` (objects inside one batch are
/// transferred concurrently). All methods have default no-op implementations
/// so callers only override what they care about.
///
/// # Thread safety
///
/// `on_object_complete` and `on_object_error` may be called concurrently from
/// different tasks. Implementations must protect shared mutable state with
/// appropriate synchronisation primitives (e.g. `Mutex`, `AtomicUsize`).
pub trait TransferProgress: Send + Sync {
    /// Called once before any object in the batch is transferred.
    fn on_batch_start(&self, direction: TransferDirection, total: usize) {
        let _ = (direction, total);
    }

    /// Called when one object finishes successfully.
    fn on_object_complete(&self, direction: TransferDirection, key: &str) {
        let _ = (direction, key);
    }

    /// Called when one object fails. The batch continues without it.
    fn on_object_error(&self, direction: TransferDirection, key: &str, error: &str) {
        let _ = (direction, key, error);
    }

    /// Called once after every object in the batch has been attempted.
    fn on_batch_complete(&self, direction: TransferDirection, succeeded: usize, failed: usize) {
        let _ = (direction, succeeded, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopTransferProgress;

impl TransferProgress for NoopTransferProgress {}

/// Convenience alias matching the type stored in [`crate::config::FlowConfig`].
pub type ProgressHandle = Arc<dyn TransferProgress>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        started_total: Arc<AtomicUsize>,
        completes: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
        final_succeeded: Arc<AtomicUsize>,
    }

    impl TransferProgress for TrackingCallback {
        fn on_batch_start(&self, _direction: TransferDirection, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_object_complete(&self, _direction: TransferDirection, _key: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_object_error(&self, _direction: TransferDirection, _key: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _direction: TransferDirection, succeeded: usize, _failed: usize) {
            self.final_succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopTransferProgress;
        cb.on_batch_start(TransferDirection::Download, 5);
        cb.on_object_complete(TransferDirection::Download, "a.pdf");
        cb.on_object_error(TransferDirection::Download, "b.pdf", "connection reset");
        cb.on_batch_complete(TransferDirection::Download, 4, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            started_total: Arc::new(AtomicUsize::new(0)),
            completes: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(AtomicUsize::new(0)),
            final_succeeded: Arc::new(AtomicUsize::new(0)),
        };

        tracker.on_batch_start(TransferDirection::Upload, 3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        tracker.on_object_complete(TransferDirection::Upload, "one.jpg");
        tracker.on_object_complete(TransferDirection::Upload, "two.jpg");
        tracker.on_object_error(TransferDirection::Upload, "three.jpg", "access denied");

        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_batch_complete(TransferDirection::Upload, 2, 1);
        assert_eq!(tracker.final_succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn TransferProgress> = Arc::new(NoopTransferProgress);
        cb.on_batch_start(TransferDirection::Download, 10);
        cb.on_object_complete(TransferDirection::Download, "doc.pdf");
    }

    #[test]
    fn direction_display() {
        assert_eq!(TransferDirection::Download.to_string(), "download");
        assert_eq!(TransferDirection::Upload.to_string(), "upload");
    }
}
