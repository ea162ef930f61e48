//! Submission validation and queue admission
//!
//! A submission is admitted or rejected as a whole before anything reaches
//! the queue: no partial admission on rejection, and silently filtered
//! non-PDF entries only after the whole submission has passed the
//! batch-level checks.

use tracing::{debug, warn};

use super::BatchUnlocker;
use crate::error::{Error, Result};
use crate::types::{Event, InputFile};

impl BatchUnlocker {
    /// Submit a batch of files for unlocking
    ///
    /// Admission rules, evaluated in order against the whole submission:
    /// 1. rejected when the engine is in the sticky policy-blocked state;
    /// 2. rejected when no entry has the PDF content type;
    /// 3. rejected when the entry count exceeds the batch ceiling
    ///    (the queue is left unchanged).
    ///
    /// Otherwise non-PDF entries are filtered out silently, the rest join
    /// the FIFO queue, and a drain starts unless one is already running —
    /// in that case the files merge into the live batch.
    ///
    /// Returns the number of files admitted.
    pub async fn submit(&self, files: Vec<InputFile>) -> Result<usize> {
        if self.engine.policy_blocked().await {
            let err = Error::EnginePolicyBlocked(
                "engine blocked by host policy".to_string(),
            );
            self.report_rejection(&err);
            return Err(err);
        }

        if !files.iter().any(InputFile::is_pdf) {
            let err = Error::InvalidFormat {
                name: files
                    .first()
                    .map(|f| f.name().to_string())
                    .unwrap_or_else(|| "(empty submission)".to_string()),
                content_type: files
                    .first()
                    .map(|f| f.content_type().to_string())
                    .unwrap_or_default(),
            };
            self.report_rejection(&err);
            return Err(err);
        }

        let limit = self.config.limits.max_batch_files;
        if files.len() > limit {
            let err = Error::BatchLimitExceeded {
                submitted: files.len(),
                limit,
            };
            self.report_rejection(&err);
            return Err(err);
        }

        let (pdfs, skipped): (Vec<_>, Vec<_>) =
            files.into_iter().partition(InputFile::is_pdf);
        for file in &skipped {
            debug!(
                name = file.name(),
                content_type = file.content_type(),
                "skipping non-PDF entry"
            );
        }

        let admitted = pdfs.len();
        {
            let mut queue = self.queue_state.queue.lock().await;
            queue.extend(pdfs);
            let queued = queue.len();

            // Merged into a live batch: bump its total so the progress
            // display reflects the larger run. The archive-mode decision
            // taken at batch entry is not revisited.
            let mut batch = self.queue_state.batch.lock().await;
            if let Some(job) = batch.as_mut() {
                job.total += admitted;
                debug!(admitted, total = job.total, "merged into running batch");
            }

            self.emit_event(Event::Queued { admitted, queued });
        }

        self.try_start_drain();
        Ok(admitted)
    }

    /// Start the drain loop unless one is already running
    ///
    /// `try_acquire` on the one-permit gate makes double-starting
    /// structurally impossible; a held permit means the running drain will
    /// pick up the merged files itself.
    pub(crate) fn try_start_drain(&self) {
        match self.queue_state.drain_gate.clone().try_acquire_owned() {
            Ok(permit) => {
                let unlocker = self.clone();
                tokio::spawn(async move {
                    unlocker.run_drain(permit).await;
                });
            }
            Err(_) => {
                debug!("drain already running; submission merged into live queue");
            }
        }
    }

    /// Log a whole-submission rejection and push its user-facing status
    fn report_rejection(&self, err: &Error) {
        warn!(error = %err, "submission rejected");
        let (state, main, sub) = err.status_triple();
        self.emit_status(state, &main, &sub);
    }
}
