//! FIFO drain loop, archive step, and idle reset
//!
//! One drain task owns the queue for as long as it holds the gate permit.
//! Files are processed strictly in submission order, one at a time, awaiting
//! the engine adapter per file — there is no parallel fan-out because the
//! engine instance is not safe for concurrent use.

use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, error, info, warn};

use super::{BatchJob, BatchUnlocker};
use crate::archive::ArchiveEntry;
use crate::delivery::Artifact;
use crate::error::ErrorKind;
use crate::naming::ARCHIVE_NAME;
use crate::types::{Event, ProcessOptions, ProcessingOutcome, Status};

impl BatchUnlocker {
    /// Drain the queue until empty, batch by batch
    ///
    /// A submission merged while a batch is mid-drain joins that batch; a
    /// submission that lands between the last dequeue and the permit release
    /// is picked up here by the re-check, so no admitted file is ever left
    /// waiting without a drain.
    pub(crate) async fn run_drain(self, permit: OwnedSemaphorePermit) {
        loop {
            let started = self.begin_batch().await;
            if !started {
                break;
            }
            self.drain_current_batch().await;
        }
        drop(permit);

        // A submission can land between the empty-queue check above and the
        // permit release; its try_acquire lost against our still-held permit,
        // so re-check now that the gate is open.
        if !self.queue_state.queue.lock().await.is_empty() {
            self.try_start_drain();
            return;
        }
        self.schedule_idle_reset();
    }

    /// Create the working state for the files currently queued
    ///
    /// Computes, once per batch: the total declared size and the
    /// archive-mode decision (`more than one file` and `total below the
    /// accumulation ceiling`). Neither is revisited mid-batch even if later
    /// files are rejected, keeping progress messaging and accumulation
    /// consistent for the whole run.
    async fn begin_batch(&self) -> bool {
        let queue = self.queue_state.queue.lock().await;
        if queue.is_empty() {
            return false;
        }

        let total = queue.len();
        let total_bytes: u64 = queue.iter().map(|f| f.len()).sum();
        let archive_mode =
            total > 1 && total_bytes < self.config.limits.archive_memory_limit;

        let mut batch = self.queue_state.batch.lock().await;
        *batch = Some(BatchJob {
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            total_bytes,
            archive_mode,
            collected: Vec::new(),
        });
        debug!(total, total_bytes, archive_mode, "batch started");
        true
    }

    async fn drain_current_batch(&self) {
        let archive_mode = {
            let batch = self.queue_state.batch.lock().await;
            batch.as_ref().map(|job| job.archive_mode).unwrap_or(false)
        };

        loop {
            let file = { self.queue_state.queue.lock().await.pop_front() };
            let Some(file) = file else { break };

            let (index, total) = {
                let mut batch = self.queue_state.batch.lock().await;
                match batch.as_mut() {
                    Some(job) => {
                        job.processed += 1;
                        (job.processed, job.total)
                    }
                    None => break,
                }
            };

            let name = file.name().to_string();
            self.emit_status(
                Status::Processing,
                &format!("Unlocking ({index}/{total})..."),
                &name,
            );
            self.emit_event(Event::FileStarted {
                name: name.clone(),
                index,
                total,
            });

            let outcome = self
                .engine
                .process_one(
                    file,
                    ProcessOptions {
                        return_raw_bytes: archive_mode,
                    },
                )
                .await;

            match outcome {
                ProcessingOutcome::Unlocked { output_name, bytes } => {
                    info!(name = %name, output = %output_name, "file unlocked");
                    let mut batch = self.queue_state.batch.lock().await;
                    if let Some(job) = batch.as_mut() {
                        job.succeeded += 1;
                        if let Some(bytes) = bytes {
                            job.collected.push(ArchiveEntry {
                                name: output_name.clone(),
                                bytes,
                            });
                        }
                    }
                    drop(batch);
                    self.emit_event(Event::FileUnlocked { name, output_name });
                }
                ProcessingOutcome::Rejected { kind, message } => {
                    // Per-file isolation: one bad file never loses the rest
                    // of the batch.
                    warn!(name = %name, ?kind, %message, "file failed; continuing batch");
                    {
                        let mut batch = self.queue_state.batch.lock().await;
                        if let Some(job) = batch.as_mut() {
                            job.failed += 1;
                        }
                    }
                    self.emit_event(Event::FileFailed {
                        name,
                        kind,
                        message,
                    });

                    if kind == ErrorKind::EnginePolicyBlocked {
                        // Retrying cannot succeed this session; the rest of
                        // the queue would fail identically.
                        let dropped = {
                            let mut queue = self.queue_state.queue.lock().await;
                            let dropped = queue.len();
                            queue.clear();
                            dropped
                        };
                        warn!(dropped, "engine blocked by host policy; aborting batch");
                        break;
                    }
                }
            }
        }

        self.finish_batch().await;
    }

    /// Archive step (when applicable) and terminal status for one batch
    async fn finish_batch(&self) {
        let Some(job) = self.queue_state.batch.lock().await.take() else {
            return;
        };

        if job.archive_mode && !job.collected.is_empty() {
            self.build_and_deliver_archive(job.collected).await;
        } else if job.succeeded > 0 {
            let sub = if job.failed > 0 {
                format!("{} file(s) could not be unlocked", job.failed)
            } else {
                String::new()
            };
            self.emit_status(
                Status::Success,
                &format!("Unlocked {} file(s)", job.succeeded),
                &sub,
            );
        } else {
            self.emit_status(
                Status::Error,
                "No files could be unlocked",
                "Check the files and try again",
            );
        }

        self.emit_event(Event::BatchComplete {
            succeeded: job.succeeded,
            failed: job.failed,
        });
        debug!(
            succeeded = job.succeeded,
            failed = job.failed,
            "batch finished"
        );
    }

    /// `Archiving` state: combine accumulated outputs into one blob
    ///
    /// An assembly or delivery failure is reported as its own distinct
    /// failure state — the already-decrypted content is described to the
    /// user rather than silently discarded.
    async fn build_and_deliver_archive(&self, entries: Vec<ArchiveEntry>) {
        let count = entries.len();
        self.emit_status(
            Status::Processing,
            "Creating archive...",
            &format!("{count} file(s)"),
        );
        self.emit_event(Event::ArchiveStarted { entries: count });

        let blob = match self.archiver.build(entries).await {
            Ok(blob) => blob,
            Err(e) => {
                error!(error = %e, "archive assembly failed");
                let (state, main, sub) = e.status_triple();
                self.emit_status(state, &main, &sub);
                return;
            }
        };

        let size = blob.len() as u64;
        match self
            .sink
            .deliver(Artifact::zip_archive(ARCHIVE_NAME, blob))
            .await
        {
            Ok(()) => {
                self.emit_event(Event::ArchiveBuilt {
                    name: ARCHIVE_NAME.to_string(),
                    size,
                });
                self.emit_status(
                    Status::Success,
                    &format!("Unlocked {count} file(s)"),
                    &format!("Saved as {ARCHIVE_NAME}"),
                );
            }
            Err(e) => {
                error!(error = %e, "archive delivery failed");
                let (state, main, sub) = e.status_triple();
                self.emit_status(state, &main, &sub);
            }
        }
    }

    /// Revert the display to the neutral state after a fixed delay
    ///
    /// Deferred and re-checked, not an unconditional timer: the reset only
    /// fires if no drain is running and the queue is still empty when the
    /// delay elapses.
    fn schedule_idle_reset(&self) {
        let unlocker = self.clone();
        let delay = self.config.limits.idle_reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if unlocker.queue_state.drain_gate.available_permits() == 0 {
                return;
            }
            if !unlocker.queue_state.queue.lock().await.is_empty() {
                return;
            }
            if unlocker.queue_state.batch.lock().await.is_some() {
                return;
            }

            unlocker.emit_status(
                Status::Default,
                "Drop PDF files here",
                "or click to select files",
            );
            unlocker.emit_event(Event::IdleReset);
        });
    }
}
