//! # pdf-unlock
//!
//! Library-first backend for batch PDF restriction-removal applications.
//!
//! ## Design Philosophy
//!
//! pdf-unlock is designed to be:
//! - **Engine-agnostic** - The decryption engine is a trait boundary, not a dependency
//! - **Sequenced, not parallel** - One decode in flight at a time, by design
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! The hard problem this crate solves is not decryption (delegated to the
//! host's engine) but sequencing multiple untrusted, variable-size,
//! asynchronous file operations against a single-instance, stateful engine
//! without exceeding memory budgets or corrupting observer-visible state.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pdf_unlock::{BatchUnlocker, Config, DecryptBackend, EngineConfig, InputFile, Result};
//!
//! // Wraps the host's PDF toolkit (e.g. a WASM-compiled engine).
//! struct MyEngine;
//!
//! #[async_trait::async_trait]
//! impl DecryptBackend for MyEngine {
//!     async fn initialize(&self, _config: &EngineConfig) -> Result<()> { Ok(()) }
//!     async fn stage_write(&self, _name: &str, _bytes: &[u8]) -> Result<()> { Ok(()) }
//!     async fn decrypt(&self, _input: &str, _output: &str) -> Result<()> { Ok(()) }
//!     async fn stage_read(&self, _name: &str) -> Result<Vec<u8>> { Ok(Vec::new()) }
//!     async fn stage_remove(&self, _name: &str) -> Result<()> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let unlocker = BatchUnlocker::new(Config::default(), Arc::new(MyEngine));
//!
//!     // Subscribe to events
//!     let mut events = unlocker.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     unlocker
//!         .submit(vec![InputFile::from_bytes(
//!             "locked.pdf",
//!             "application/pdf",
//!             std::fs::read("locked.pdf")?,
//!         )])
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive assembly
pub mod archive;
/// Configuration types
pub mod config;
/// Artifact delivery surface
pub mod delivery;
/// Engine adapter and the external decryption-engine boundary
pub mod engine;
/// Error types
pub mod error;
/// Name derivation and PDF content constants
pub mod naming;
/// Core types and events
pub mod types;
/// Batch orchestrator
pub mod unlocker;

// Re-export commonly used types
pub use archive::{ArchiveEntry, Archiver, ZipArchiver};
pub use config::{Config, DeliveryConfig, EngineConfig, LimitsConfig};
pub use delivery::{Artifact, ArtifactSink, FsArtifactSink};
pub use engine::{DecryptBackend, EngineAdapter, EngineState, SettleHook};
pub use error::{Error, ErrorKind, Result};
pub use naming::{ARCHIVE_NAME, PDF_MIME, ZIP_MIME, unlocked_name};
pub use types::{
    BatchStats, Event, FileSource, InputFile, NoOpStatusObserver, ProcessOptions,
    ProcessingOutcome, Status, StatusObserver,
};
pub use unlocker::BatchUnlocker;
