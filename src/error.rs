//! Error types for pdf-unlock
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants with contextual fields
//! - Machine-readable error codes ([`ErrorKind`]) for event payloads
//! - User-facing status mapping via [`Error::status_triple`], which never
//!   exposes engine-internal error text

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Status;

/// Result type alias for pdf-unlock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pdf-unlock
///
/// Each variant includes contextual information to help diagnose issues.
/// Variants that wrap collaborator failures (engine, archive, delivery)
/// carry sanitized text only — raw collaborator error messages are logged,
/// never stored here.
#[derive(Debug, Error)]
pub enum Error {
    /// Declared content type of a submitted file is not the PDF MIME type
    #[error("not a PDF: {name} has content type {content_type}")]
    InvalidFormat {
        /// Name of the offending file
        name: String,
        /// The declared (attacker-controllable) content type
        content_type: String,
    },

    /// Submitted file exceeds the per-file size limit
    #[error("file too large: {name} is {size} bytes (limit {limit})")]
    FileTooLarge {
        /// Name of the offending file
        name: String,
        /// Declared size in bytes
        size: u64,
        /// Configured per-file limit in bytes
        limit: u64,
    },

    /// File content does not start with the `%PDF` signature
    #[error("missing %PDF signature: {name}")]
    InvalidPdfSignature {
        /// Name of the offending file
        name: String,
    },

    /// Decryption engine could not be initialized (transient or unsupported host)
    #[error("decryption engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Host execution policy blocks the decryption engine; sticky for the session
    #[error("decryption engine blocked by host policy: {0}")]
    EnginePolicyBlocked(String),

    /// The decode attempt itself failed (staging write, decrypt call, or read-back)
    #[error("processing failed for {name}: {reason}")]
    ProcessingFailed {
        /// Name of the file being processed
        name: String,
        /// Which step failed, in our own words (never engine-internal text)
        reason: String,
    },

    /// Archive assembly failed after the batch was decrypted
    #[error("archive assembly failed: {0}")]
    ArchiveFailed(String),

    /// Submission contained more files than the batch ceiling allows
    #[error("batch limit exceeded: {submitted} files submitted (limit {limit})")]
    BatchLimitExceeded {
        /// Number of files in the rejected submission
        submitted: usize,
        /// Configured batch ceiling
        limit: usize,
    },

    /// Artifact could not be handed to the output surface
    #[error("artifact delivery failed: {0}")]
    Delivery(String),

    /// Staging-area operation failed outside the decode path
    #[error("staging area error: {0}")]
    Staging(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-readable error code, carried in [`Event`](crate::types::Event)
/// payloads and per-file failure outcomes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Declared content type is not `application/pdf`
    InvalidFormat,
    /// File exceeds the per-file size limit
    FileTooLarge,
    /// Content does not begin with `%PDF`
    InvalidPdfSignature,
    /// Engine failed to initialize (may succeed on retry)
    EngineUnavailable,
    /// Engine blocked by host policy (retrying cannot succeed)
    EnginePolicyBlocked,
    /// Decode attempt failed
    ProcessingFailed,
    /// Archive assembly failed
    ArchiveFailed,
    /// Too many files in one submission
    BatchLimitExceeded,
    /// Artifact delivery failed
    Delivery,
    /// Staging-area failure
    Staging,
    /// I/O failure
    Io,
}

impl Error {
    /// The machine-readable code for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Error::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Error::InvalidPdfSignature { .. } => ErrorKind::InvalidPdfSignature,
            Error::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            Error::EnginePolicyBlocked(_) => ErrorKind::EnginePolicyBlocked,
            Error::ProcessingFailed { .. } => ErrorKind::ProcessingFailed,
            Error::ArchiveFailed(_) => ErrorKind::ArchiveFailed,
            Error::BatchLimitExceeded { .. } => ErrorKind::BatchLimitExceeded,
            Error::Delivery(_) => ErrorKind::Delivery,
            Error::Staging(_) => ErrorKind::Staging,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Translate this error into a user-facing `(state, main_text, sub_text)`
    /// triple for the status observer
    ///
    /// The texts are complete sentences a presentation layer can show
    /// verbatim. No internal exception detail or collaborator error text
    /// appears here.
    pub fn status_triple(&self) -> (Status, String, String) {
        let (main, sub) = match self {
            Error::InvalidFormat { .. } => (
                "Only PDF files can be unlocked".to_string(),
                "Check the file type and try again".to_string(),
            ),
            Error::FileTooLarge { limit, .. } => (
                "File is too large".to_string(),
                format!("The limit is {} MiB per file", limit / (1024 * 1024)),
            ),
            Error::InvalidPdfSignature { .. } => (
                "Not a valid PDF".to_string(),
                "The file content does not look like a PDF".to_string(),
            ),
            Error::EngineUnavailable(_) => (
                "The unlock engine failed to load".to_string(),
                "Please try again".to_string(),
            ),
            Error::EnginePolicyBlocked(_) => (
                "Unlocking is not available here".to_string(),
                "The host environment does not allow the engine to run".to_string(),
            ),
            Error::ProcessingFailed { .. } => (
                "Could not unlock this file".to_string(),
                "It may use an unsupported protection scheme".to_string(),
            ),
            Error::ArchiveFailed(_) => (
                "Could not build the archive".to_string(),
                "Your files were unlocked but packaging them failed".to_string(),
            ),
            Error::BatchLimitExceeded { limit, .. } => (
                "Too many files".to_string(),
                format!("Submit at most {limit} files at once"),
            ),
            Error::Delivery(_) => (
                "Could not save the unlocked file".to_string(),
                "Please try again".to_string(),
            ),
            Error::Staging(_) | Error::Io(_) => (
                "Something went wrong".to_string(),
                "Please try again".to_string(),
            ),
        };
        (Status::Error, main, sub)
    }
}
