//! Engine adapter — lifecycle and single-flight access to the decryption engine
//!
//! Owns the single engine instance's state machine (idempotent, awaitable
//! initialization with a sticky policy-blocked terminal) and the per-file
//! decode pipeline: precondition checks, content sniffing, staging with
//! unique generated names, buffer zeroing, and unconditional cleanup.

mod backend;


pub use backend::DecryptBackend;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::config::Config;
use crate::delivery::{Artifact, ArtifactSink};
use crate::error::{Error, Result};
use crate::naming::{has_pdf_signature, unlocked_name};
use crate::types::{InputFile, ProcessOptions, ProcessingOutcome};

/// Lifecycle state of the engine singleton
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No initialization attempted yet
    Uninitialized,
    /// Initialization in flight
    Initializing,
    /// Engine loaded and usable
    Ready,
    /// Initialization failed
    Failed {
        /// True when the host policy blocks the engine; sticky for the
        /// session because retrying cannot succeed
        policy_blocked: bool,
    },
}

/// Callback invoked after every decode attempt, on every exit path
///
/// Hosts use this to reset their input element (or equivalent) regardless of
/// whether the decode succeeded, was rejected, or failed.
pub type SettleHook = Arc<dyn Fn() + Send + Sync>;

/// Adapter owning the lifecycle of the single decryption-engine instance
///
/// Cloneable — all fields are Arc-wrapped and clones share the same engine
/// state, decode gate, and staging-name counter, so the single-flight
/// invariant holds process-wide across clones.
#[derive(Clone)]
pub struct EngineAdapter {
    backend: Arc<dyn DecryptBackend>,
    config: Arc<Config>,
    state: Arc<tokio::sync::Mutex<EngineState>>,
    /// One permit: at most one decode in flight at any instant
    decode_gate: Arc<tokio::sync::Semaphore>,
    /// Monotonic counter for staging names; never timestamp-derived, so
    /// names cannot collide even under fast successive calls
    staging_seq: Arc<AtomicU64>,
    sink: Arc<dyn ArtifactSink>,
    settle_hook: Option<SettleHook>,
}

impl EngineAdapter {
    /// Create an adapter over the given backend and artifact sink
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn DecryptBackend>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            backend,
            config,
            state: Arc::new(tokio::sync::Mutex::new(EngineState::Uninitialized)),
            decode_gate: Arc::new(tokio::sync::Semaphore::new(1)),
            staging_seq: Arc::new(AtomicU64::new(0)),
            sink,
            settle_hook: None,
        }
    }

    /// Replace the artifact sink used for inline single-file delivery
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Attach a hook invoked after every decode attempt, on every exit path
    #[must_use]
    pub fn with_settle_hook(mut self, hook: SettleHook) -> Self {
        self.settle_hook = Some(hook);
        self
    }

    /// Current lifecycle state
    ///
    /// Awaits any in-flight initialization, so callers observe the settled
    /// state.
    pub async fn state(&self) -> EngineState {
        *self.state.lock().await
    }

    /// Whether the engine is in the sticky policy-blocked state
    pub async fn policy_blocked(&self) -> bool {
        matches!(
            *self.state.lock().await,
            EngineState::Failed {
                policy_blocked: true
            }
        )
    }

    /// Initialize the engine
    ///
    /// Idempotent: returns immediately when already `Ready`. Concurrent and
    /// redundant callers await the in-flight initialization rather than
    /// starting a second one (the state lock is held across the backend
    /// call). A transient failure may be retried by a later call; a
    /// policy-blocked failure is sticky for the rest of the session.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            EngineState::Ready => return Ok(()),
            EngineState::Failed {
                policy_blocked: true,
            } => {
                return Err(Error::EnginePolicyBlocked(
                    "engine blocked by host policy".to_string(),
                ));
            }
            _ => {}
        }

        *state = EngineState::Initializing;
        debug!(
            asset_locator = %self.config.engine.asset_locator,
            "initializing decryption engine"
        );

        match self.backend.initialize(&self.config.engine).await {
            Ok(()) => {
                *state = EngineState::Ready;
                info!("decryption engine ready");
                Ok(())
            }
            Err(e) => {
                let policy_blocked = matches!(e, Error::EnginePolicyBlocked(_));
                *state = EngineState::Failed { policy_blocked };
                warn!(error = %e, policy_blocked, "engine initialization failed");
                match e {
                    Error::EnginePolicyBlocked(_) | Error::EngineUnavailable(_) => Err(e),
                    other => Err(Error::EngineUnavailable(other.to_string())),
                }
            }
        }
    }

    /// Validate, decode, and hand off one file
    ///
    /// Never returns an `Err`: every failure becomes a
    /// [`ProcessingOutcome::Rejected`] with a sanitized message. The decode
    /// gate permit and the settle hook are handled on every exit path,
    /// including validation short-circuits.
    pub async fn process_one(
        &self,
        file: InputFile,
        opts: ProcessOptions,
    ) -> ProcessingOutcome {
        let outcome = self.process_inner(&file, opts).await;
        if let Some(hook) = &self.settle_hook {
            hook();
        }
        match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(name = file.name(), error = %e, "file rejected");
                ProcessingOutcome::Rejected {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    async fn process_inner(
        &self,
        file: &InputFile,
        opts: ProcessOptions,
    ) -> Result<ProcessingOutcome> {
        // Precondition 1: declared content type, before the engine is touched.
        if !file.is_pdf() {
            return Err(Error::InvalidFormat {
                name: file.name().to_string(),
                content_type: file.content_type().to_string(),
            });
        }

        // Precondition 2: declared size against the per-file limit.
        let limit = self.config.limits.max_file_size;
        if file.len() > limit {
            return Err(Error::FileTooLarge {
                name: file.name().to_string(),
                size: file.len(),
                limit,
            });
        }

        // Precondition 3: engine readiness, lazily triggering initialization.
        self.initialize().await?;

        // Single-flight: overlapping callers queue on the one permit.
        let _permit = self
            .decode_gate
            .acquire()
            .await
            .map_err(|_| Error::EngineUnavailable("decode gate closed".to_string()))?;

        let mut bytes = file.read_bytes().await.map_err(|e| {
            warn!(name = file.name(), error = %e, "reading file content failed");
            Error::ProcessingFailed {
                name: file.name().to_string(),
                reason: "could not read file content".to_string(),
            }
        })?;

        // Precondition 4: content sniffing, only after the whole buffer is in
        // memory. The declared MIME type alone is not trusted.
        if !has_pdf_signature(&bytes) {
            bytes.zeroize();
            return Err(Error::InvalidPdfSignature {
                name: file.name().to_string(),
            });
        }

        let input_name = format!("in-{}.pdf", self.staging_seq.fetch_add(1, Ordering::Relaxed));
        let staged_output = format!("out-{}.pdf", self.staging_seq.fetch_add(1, Ordering::Relaxed));
        debug!(
            name = file.name(),
            input = %input_name,
            output = %staged_output,
            "staging decode"
        );

        let decoded = self
            .decode_staged(file.name(), &input_name, &staged_output, &mut bytes)
            .await;

        // Unconditional cleanup, success or failure, each independently
        // guarded so one failure does not block the other. Warn-only.
        if let Err(e) = self.backend.stage_remove(&input_name).await {
            warn!(name = %input_name, error = %e, "staging input cleanup failed");
        }
        if let Err(e) = self.backend.stage_remove(&staged_output).await {
            warn!(name = %staged_output, error = %e, "staging output cleanup failed");
        }

        let output = decoded?;
        let output_name = unlocked_name(file.name());

        if opts.return_raw_bytes {
            Ok(ProcessingOutcome::Unlocked {
                output_name,
                bytes: Some(output),
            })
        } else {
            self.sink
                .deliver(Artifact::pdf(output_name.clone(), output))
                .await?;
            Ok(ProcessingOutcome::Unlocked {
                output_name,
                bytes: None,
            })
        }
    }

    /// Write, decrypt, and read back through the staging area
    ///
    /// The caller-side plaintext copy is zeroed immediately after the staging
    /// write hands it to the engine — the content is nominally sensitive and
    /// must not linger in memory. Backend error text is logged here and
    /// replaced with our own wording.
    async fn decode_staged(
        &self,
        file_name: &str,
        input_name: &str,
        output_name: &str,
        bytes: &mut Vec<u8>,
    ) -> Result<Vec<u8>> {
        let written = self.backend.stage_write(input_name, bytes).await;
        bytes.zeroize();
        written.map_err(|e| {
            warn!(name = file_name, error = %e, "staging write failed");
            Error::ProcessingFailed {
                name: file_name.to_string(),
                reason: "staging write failed".to_string(),
            }
        })?;

        self.backend
            .decrypt(input_name, output_name)
            .await
            .map_err(|e| {
                warn!(name = file_name, error = %e, "engine decrypt call failed");
                Error::ProcessingFailed {
                    name: file_name.to_string(),
                    reason: "decrypt call failed".to_string(),
                }
            })?;

        let output = self.backend.stage_read(output_name).await.map_err(|e| {
            warn!(name = file_name, error = %e, "staging read-back failed");
            Error::ProcessingFailed {
                name: file_name.to_string(),
                reason: "could not read decrypted output".to_string(),
            }
        })?;

        if output.is_empty() {
            return Err(Error::ProcessingFailed {
                name: file_name.to_string(),
                reason: "engine produced no output".to_string(),
            });
        }

        Ok(output)
    }
}
