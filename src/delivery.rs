//! Output surface — delivering unlocked artifacts to the host
//!
//! A browser host implements [`ArtifactSink`] over object-URL downloads; the
//! crate ships [`FsArtifactSink`] for desktop and CLI embeddings. Artifact
//! bytes are owned by the delivery call and nothing is retained afterwards.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::naming::{PDF_MIME, ZIP_MIME};

/// Maximum number of rename attempts when resolving output-name collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// One deliverable output: a name, a media type, and the bytes
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Suggested output name
    pub name: String,
    /// Media type of the content
    pub media_type: String,
    /// The content itself
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// An unlocked PDF artifact
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: PDF_MIME.to_string(),
            bytes,
        }
    }

    /// A combined ZIP archive artifact
    pub fn zip_archive(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: ZIP_MIME.to_string(),
            bytes,
        }
    }
}

/// Host-facing delivery boundary
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Hand one artifact to the host
    async fn deliver(&self, artifact: Artifact) -> Result<()>;
}

/// Sink that writes artifacts into a directory
///
/// Name collisions are resolved by appending ` (1)`, ` (2)`, … before the
/// extension rather than overwriting a previous artifact.
pub struct FsArtifactSink {
    output_dir: PathBuf,
}

impl FsArtifactSink {
    /// Create a sink writing into the given directory (created on demand)
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn deliver(&self, artifact: Artifact) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                Error::Delivery(format!(
                    "create output directory '{}': {e}",
                    self.output_dir.display()
                ))
            })?;

        let path = unique_target(&self.output_dir, &artifact.name)?;
        debug!(path = %path.display(), media_type = %artifact.media_type, "writing artifact");

        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(|e| Error::Delivery(format!("write '{}': {e}", path.display())))?;

        info!(
            path = %path.display(),
            size = artifact.bytes.len(),
            "artifact delivered"
        );
        Ok(())
    }
}

/// Find a non-colliding path for `name` inside `dir`
fn unique_target(dir: &Path, name: &str) -> Result<PathBuf> {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let base = Path::new(name);
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let extension = base.extension().and_then(|e| e.to_str());

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let renamed = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let path = dir.join(renamed);
        if !path.exists() {
            return Ok(path);
        }
    }

    Err(Error::Delivery(format!(
        "could not find a unique name for '{name}' after {MAX_RENAME_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_artifact_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArtifactSink::new(dir.path());

        sink.deliver(Artifact::pdf("doc_unlocked.pdf", b"%PDF-1.7 out".to_vec()))
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("doc_unlocked.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.7 out");
    }

    #[tokio::test]
    async fn collision_gets_numbered_suffix_instead_of_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArtifactSink::new(dir.path());

        sink.deliver(Artifact::pdf("doc_unlocked.pdf", b"first".to_vec()))
            .await
            .unwrap();
        sink.deliver(Artifact::pdf("doc_unlocked.pdf", b"second".to_vec()))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("doc_unlocked.pdf")).unwrap(),
            b"first"
        );
        assert_eq!(
            std::fs::read(dir.path().join("doc_unlocked (1).pdf")).unwrap(),
            b"second"
        );
    }

    #[tokio::test]
    async fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/out");
        let sink = FsArtifactSink::new(&nested);

        sink.deliver(Artifact::zip_archive("Unlocked_PDFs.zip", vec![1, 2, 3]))
            .await
            .unwrap();

        assert!(nested.join("Unlocked_PDFs.zip").exists());
    }
}
