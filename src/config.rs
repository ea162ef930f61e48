//! Configuration types for pdf-unlock

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Decryption-engine configuration
///
/// Groups settings for locating and observing the external engine.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Resource locator the backend uses to fetch engine binary assets
    /// (default: "./engine/")
    #[serde(default = "default_asset_locator")]
    pub asset_locator: String,

    /// Route engine stdout/stderr-style diagnostics to tracing (default: true)
    #[serde(default = "default_true")]
    pub log_engine_output: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_locator: default_asset_locator(),
            log_engine_output: true,
        }
    }
}

/// Batch and memory limits
///
/// Defaults match the consumer-facing batch-unlock use case: bounded batch
/// size, bounded per-file size, and an archive accumulation ceiling that
/// keeps multi-file batches from growing memory without bound.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum declared size of a single file in bytes (default: 100 MiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Total declared batch size below which multi-file batches are combined
    /// into one archive in memory (default: 150 MiB)
    #[serde(default = "default_archive_memory_limit")]
    pub archive_memory_limit: u64,

    /// Maximum number of files in one submission (default: 20)
    #[serde(default = "default_max_batch_files")]
    pub max_batch_files: usize,

    /// Delay before the display reverts to the neutral awaiting-input state
    /// after a batch finishes (default: 5 s)
    #[serde(default = "default_idle_reset_delay")]
    pub idle_reset_delay: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            archive_memory_limit: default_archive_memory_limit(),
            max_batch_files: default_max_batch_files(),
            idle_reset_delay: default_idle_reset_delay(),
        }
    }
}

/// Artifact delivery configuration
///
/// Only used by the default filesystem sink; hosts that supply their own
/// [`ArtifactSink`](crate::delivery::ArtifactSink) ignore it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Directory the default sink writes unlocked artifacts into
    /// (default: "./unlocked")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Main configuration for [`BatchUnlocker`](crate::unlocker::BatchUnlocker)
///
/// Fields are organized into logical sub-configs:
/// - [`engine`](EngineConfig) — engine asset locator and diagnostics
/// - [`limits`](LimitsConfig) — batch, size, and memory ceilings
/// - [`delivery`](DeliveryConfig) — default artifact sink settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Batch and memory limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Artifact delivery settings
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

fn default_asset_locator() -> String {
    "./engine/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}

fn default_archive_memory_limit() -> u64 {
    150 * 1024 * 1024
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./unlocked")
}

fn default_max_batch_files() -> usize {
    20
}

fn default_idle_reset_delay() -> Duration {
    Duration::from_secs(5)
}
