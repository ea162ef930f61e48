//! Core types and events for pdf-unlock

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};
use crate::naming::PDF_MIME;

/// Lazy byte access for a submitted file
///
/// Hosts implement this over whatever their file handles are (browser `File`
/// objects, filesystem paths, in-memory buffers). The orchestrator reads a
/// file's bytes at most once, immediately before the decode attempt, so large
/// batches never hold more than one file's content in memory at a time
/// outside archive accumulation.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read the full byte content of the file
    async fn read(&self) -> Result<Vec<u8>>;
}

/// In-memory [`FileSource`] backing [`InputFile::from_bytes`]
struct MemorySource(Vec<u8>);

#[async_trait]
impl FileSource for MemorySource {
    async fn read(&self) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// One submitted file: a name, a declared content type, a declared byte
/// length, and a lazy byte accessor
///
/// The declared metadata arrives from the host and is not trusted: the
/// content type gates admission but the engine adapter additionally sniffs
/// the `%PDF` signature from the actual bytes before any decode.
#[derive(Clone)]
pub struct InputFile {
    name: String,
    content_type: String,
    len: u64,
    source: Arc<dyn FileSource>,
}

impl InputFile {
    /// Create an input file from a custom byte source
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        len: u64,
        source: Arc<dyn FileSource>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            len,
            source,
        }
    }

    /// Create an input file backed by an in-memory buffer
    ///
    /// The declared length is taken from the buffer.
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let len = bytes.len() as u64;
        Self {
            name: name.into(),
            content_type: content_type.into(),
            len,
            source: Arc::new(MemorySource(bytes)),
        }
    }

    /// The file's name as supplied by the host
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared content type (MIME)
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The declared byte length
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the declared length is zero
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the declared content type is the PDF MIME type
    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_MIME
    }

    /// Read the full byte content through the lazy source
    pub(crate) async fn read_bytes(&self) -> Result<Vec<u8>> {
        self.source.read().await
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Output-mode flag for a single decode
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessOptions {
    /// When true, the adapter returns the raw output bytes to the caller
    /// (archive accumulation). When false, the adapter delivers the single
    /// unlocked file through its artifact sink itself.
    pub return_raw_bytes: bool,
}

/// Result of processing one [`InputFile`]
///
/// Ephemeral: consumed immediately by the orchestrator and not retained.
#[derive(Debug)]
pub enum ProcessingOutcome {
    /// The file was decrypted
    Unlocked {
        /// Derived output name (`<stem>_unlocked.pdf`)
        output_name: String,
        /// Raw output bytes when the caller asked for them, `None` when the
        /// adapter already delivered the artifact
        bytes: Option<Vec<u8>>,
    },
    /// The file was rejected or the decode failed; never fatal to the batch
    /// on its own
    Rejected {
        /// Machine-readable failure code
        kind: ErrorKind,
        /// Sanitized, loggable description
        message: String,
    },
}

/// User-visible presentation state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Neutral awaiting-input presentation
    Default,
    /// A batch is being worked on
    Processing,
    /// The last batch finished with at least one unlocked file
    Success,
    /// Something went wrong (per-file or batch-level)
    Error,
}

/// Observer interface for the presentation layer
///
/// One method, called on every user-visible state transition. The core never
/// depends on concrete UI types; any presentation layer implements this.
pub trait StatusObserver: Send + Sync {
    /// Receive a status transition as a `(state, main_text, sub_text)` triple
    fn on_status(&self, state: Status, main_text: &str, sub_text: &str);
}

/// Observer that ignores all status updates
pub struct NoOpStatusObserver;

impl StatusObserver for NoOpStatusObserver {
    fn on_status(&self, _state: Status, _main_text: &str, _sub_text: &str) {}
}

/// Event emitted during batch processing
///
/// Broadcast to all subscribers of
/// [`BatchUnlocker::subscribe`](crate::unlocker::BatchUnlocker::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A submission was admitted into the queue
    Queued {
        /// Number of files admitted from this submission
        admitted: usize,
        /// Queue depth after admission
        queued: usize,
    },

    /// A file was dequeued and its decode started
    FileStarted {
        /// File name
        name: String,
        /// 1-based position within the batch
        index: usize,
        /// Batch total at this moment (merged submissions may grow it)
        total: usize,
    },

    /// A file was unlocked
    FileUnlocked {
        /// Original file name
        name: String,
        /// Derived output name
        output_name: String,
    },

    /// A file failed; the batch continues
    FileFailed {
        /// File name
        name: String,
        /// Machine-readable failure code
        kind: ErrorKind,
        /// Sanitized description
        message: String,
    },

    /// Archive assembly started for the accumulated batch outputs
    ArchiveStarted {
        /// Number of entries going into the archive
        entries: usize,
    },

    /// The combined archive was built and delivered
    ArchiveBuilt {
        /// Archive artifact name
        name: String,
        /// Archive size in bytes
        size: u64,
    },

    /// The batch drained (and any archive step completed)
    BatchComplete {
        /// Files unlocked in this batch
        succeeded: usize,
        /// Files that failed in this batch
        failed: usize,
    },

    /// The deferred idle timer reverted the display to the neutral state
    IdleReset,
}

/// Snapshot of orchestrator state for embedders
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Files currently waiting in the queue
    pub queued: usize,
    /// Files processed so far in the active batch (0 when idle)
    pub processed: usize,
    /// Files unlocked so far in the active batch
    pub succeeded: usize,
    /// Files failed so far in the active batch
    pub failed: usize,
    /// Whether a drain is currently running
    pub draining: bool,
}
