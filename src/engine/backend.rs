//! External decryption-engine boundary
//!
//! The engine itself is a black box supplied by the host (typically a
//! WASM-compiled PDF toolkit). This crate only sequences work against it
//! through the [`DecryptBackend`] trait: a private staging area plus a
//! decrypt operation between two staged names.

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::error::Result;

/// The external decryption engine and its private staging area
///
/// Implementations are expected to serialize nothing themselves — the
/// [`EngineAdapter`](super::EngineAdapter) guarantees at most one decode is
/// in flight at any instant, so a backend may assume exclusive access during
/// `stage_write`/`decrypt`/`stage_read` sequences.
#[async_trait]
pub trait DecryptBackend: Send + Sync {
    /// Load and initialize the engine
    ///
    /// Called lazily before the first decode and again after a transient
    /// failure. Errors must be classified:
    /// [`Error::EnginePolicyBlocked`](crate::error::Error::EnginePolicyBlocked)
    /// when the host execution policy forbids running the engine (retrying
    /// cannot succeed this session), and
    /// [`Error::EngineUnavailable`](crate::error::Error::EngineUnavailable)
    /// for anything else (missing module, failed asset fetch).
    async fn initialize(&self, config: &EngineConfig) -> Result<()>;

    /// Write a byte buffer into the staging area under the given name
    async fn stage_write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Decrypt the staged input, producing the staged output
    async fn decrypt(&self, input_name: &str, output_name: &str) -> Result<()>;

    /// Read back a staged entry's bytes
    async fn stage_read(&self, name: &str) -> Result<Vec<u8>>;

    /// Remove a staged entry
    ///
    /// Must be idempotent: removing a name that does not exist (or was
    /// already removed) returns `Ok(())` or a harmless error, never panics.
    async fn stage_remove(&self, name: &str) -> Result<()>;
}
