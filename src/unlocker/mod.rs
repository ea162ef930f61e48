//! Batch orchestrator split into focused submodules
//!
//! The `BatchUnlocker` struct and its methods are organized by domain:
//! - [`admission`] - Submission validation and queue admission
//! - [`drain`] - FIFO drain loop, archive step, and idle reset
//!
//! State machine per batch: `Idle → Draining → (Archiving)? → Idle`. The
//! drain gate (a one-permit semaphore) is the mutual-exclusion primitive: a
//! submission that arrives while a drain is running merges into the live
//! queue instead of starting a second concurrent drain.

mod admission;
mod drain;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::sync::Arc;

use crate::archive::{ArchiveEntry, Archiver, ZipArchiver};
use crate::config::Config;
use crate::delivery::{ArtifactSink, FsArtifactSink};
use crate::engine::{DecryptBackend, EngineAdapter, SettleHook};
use crate::types::{BatchStats, Event, NoOpStatusObserver, Status, StatusObserver};

/// Queue and batch state
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Pending files in FIFO submission order (protected by Mutex)
    pub(crate) queue: Arc<tokio::sync::Mutex<VecDeque<crate::types::InputFile>>>,
    /// One permit: at most one drain loop runs at a time
    pub(crate) drain_gate: Arc<tokio::sync::Semaphore>,
    /// The active batch's working state; `None` while idle
    pub(crate) batch: Arc<tokio::sync::Mutex<Option<BatchJob>>>,
}

/// Working state for one batch
///
/// Created when a drain picks up the queue, destroyed when the queue empties
/// and any archive step completes. The archive-mode decision is taken once
/// at creation and held fixed for the batch's duration.
pub(crate) struct BatchJob {
    /// Files admitted into this batch so far (merged submissions bump it)
    pub(crate) total: usize,
    /// Files processed so far, for `(i/n)` progress display
    pub(crate) processed: usize,
    /// Files unlocked
    pub(crate) succeeded: usize,
    /// Files that failed
    pub(crate) failed: usize,
    /// Total declared byte size computed once at batch start
    pub(crate) total_bytes: u64,
    /// Whether successful outputs accumulate for one combined archive
    pub(crate) archive_mode: bool,
    /// Accumulated named outputs when in archive mode
    pub(crate) collected: Vec<ArchiveEntry>,
}

/// Main batch-unlock orchestrator (cloneable - all fields are Arc-wrapped)
///
/// Sequences submitted files one at a time against the single-instance
/// decryption engine, decides per batch between individual artifacts and one
/// combined archive, and drives user-visible progress through the status
/// observer and the broadcast event stream.
#[derive(Clone)]
pub struct BatchUnlocker {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Adapter around the single decryption-engine instance
    pub(crate) engine: EngineAdapter,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Presentation-layer observer
    pub(crate) observer: Arc<dyn StatusObserver>,
    /// Archive-builder capability
    pub(crate) archiver: Arc<dyn Archiver>,
    /// Output surface for the combined archive
    pub(crate) sink: Arc<dyn ArtifactSink>,
    /// Queue and batch state
    pub(crate) queue_state: QueueState,
}

impl BatchUnlocker {
    /// Create a new orchestrator over the given engine backend
    ///
    /// Defaults: artifacts are written to `config.delivery.output_dir` by a
    /// filesystem sink, archives are built in-memory as ZIP, and status
    /// updates are dropped. Use the `with_*` builders to attach a real
    /// observer or replace the sink and archiver.
    pub fn new(config: Config, backend: Arc<dyn DecryptBackend>) -> Self {
        let config = Arc::new(config);
        let sink: Arc<dyn ArtifactSink> =
            Arc::new(FsArtifactSink::new(config.delivery.output_dir.clone()));
        let engine = EngineAdapter::new(config.clone(), backend, sink.clone());

        // Broadcast buffer of 256 events; a subscriber that falls further
        // behind receives a Lagged error.
        let (event_tx, _rx) = tokio::sync::broadcast::channel(256);

        Self {
            config,
            engine,
            event_tx,
            observer: Arc::new(NoOpStatusObserver),
            archiver: Arc::new(ZipArchiver),
            sink,
            queue_state: QueueState {
                queue: Arc::new(tokio::sync::Mutex::new(VecDeque::new())),
                drain_gate: Arc::new(tokio::sync::Semaphore::new(1)),
                batch: Arc::new(tokio::sync::Mutex::new(None)),
            },
        }
    }

    /// Attach a status observer for the presentation layer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the artifact sink (both single-file and archive delivery)
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.engine = self.engine.clone().with_sink(sink.clone());
        self.sink = sink;
        self
    }

    /// Replace the archive builder
    #[must_use]
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Attach a hook invoked after every decode attempt, on every exit path
    #[must_use]
    pub fn with_settle_hook(mut self, hook: SettleHook) -> Self {
        self.engine = self.engine.clone().with_settle_hook(hook);
        self
    }

    /// Subscribe to batch events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Access the engine adapter (state inspection, explicit pre-warming)
    pub fn engine(&self) -> &EngineAdapter {
        &self.engine
    }

    /// Snapshot of queue and batch state
    pub async fn stats(&self) -> BatchStats {
        let queued = self.queue_state.queue.lock().await.len();
        let draining = self.queue_state.drain_gate.available_permits() == 0;
        let batch = self.queue_state.batch.lock().await;
        match batch.as_ref() {
            Some(job) => BatchStats {
                queued,
                processed: job.processed,
                succeeded: job.succeeded,
                failed: job.failed,
                draining,
            },
            None => BatchStats {
                queued,
                draining,
                ..BatchStats::default()
            },
        }
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// processing never depends on anyone listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Push a status transition to the observer
    pub(crate) fn emit_status(&self, state: Status, main_text: &str, sub_text: &str) {
        self.observer.on_status(state, main_text, sub_text);
    }
}
