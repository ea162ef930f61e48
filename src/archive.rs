//! Archive assembly for multi-file batches
//!
//! The archive step is a black-box capability behind the [`Archiver`] trait:
//! given a set of named byte buffers, produce one combined blob. The shipped
//! implementation builds an in-memory ZIP.

use async_trait::async_trait;
use std::io::Write;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One named output destined for the combined archive
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    /// Entry name inside the archive
    pub name: String,
    /// Entry content
    pub bytes: Vec<u8>,
}

/// Archive-builder capability
///
/// Implementations take the whole accumulated batch at once and either
/// produce a single combined blob or fail atomically with
/// [`Error::ArchiveFailed`] — a partial archive is never returned.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Combine all entries into one archive blob
    async fn build(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>>;
}

/// In-memory ZIP archiver
pub struct ZipArchiver;

#[async_trait]
impl Archiver for ZipArchiver {
    async fn build(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>> {
        let count = entries.len();
        debug!(entries = count, "assembling ZIP archive");

        // Compression is CPU-bound; keep it off the async workers.
        let blob = tokio::task::spawn_blocking(move || build_zip(entries))
            .await
            .map_err(|e| Error::ArchiveFailed(format!("archive task panicked: {e}")))??;

        info!(entries = count, size = blob.len(), "ZIP archive assembled");
        Ok(blob)
    }
}

fn build_zip(entries: Vec<ArchiveEntry>) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|e| Error::ArchiveFailed(format!("start entry {}: {e}", entry.name)))?;
        writer
            .write_all(&entry.bytes)
            .map_err(|e| Error::ArchiveFailed(format!("write entry {}: {e}", entry.name)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::ArchiveFailed(format!("finalize archive: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry(name: &str, content: &[u8]) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            bytes: content.to_vec(),
        }
    }

    #[tokio::test]
    async fn builds_archive_containing_all_entries() {
        let entries = vec![
            entry("a_unlocked.pdf", b"%PDF-1.7 first"),
            entry("b_unlocked.pdf", b"%PDF-1.7 second"),
        ];

        let blob = ZipArchiver.build(entries).await.unwrap();
        assert!(!blob.is_empty());

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(blob)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = Vec::new();
        archive
            .by_name("a_unlocked.pdf")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"%PDF-1.7 first");
    }

    #[tokio::test]
    async fn empty_entry_list_builds_empty_archive() {
        let blob = ZipArchiver.build(Vec::new()).await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(blob)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
