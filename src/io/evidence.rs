use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::{info, warn};

use crate::error::EncodingError;
use crate::models::{EvidenceDocument, EvidenceSet};

/// MIME type for extensions we don't recognise
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Read a file and encode it for inline transport
pub async fn encode_file(path: &Path) -> Result<EvidenceDocument, EncodingError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| EncodingError::Unnamed(path.to_path_buf()))?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| EncodingError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(EvidenceDocument::from_bytes(name, &bytes, mime_type_for(path)))
}

/// Guess a MIME type from the file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => FALLBACK_MIME_TYPE,
    }
}

impl EvidenceSet {
    /// Encode one upload batch concurrently and append it.
    ///
    /// All-or-nothing: if any file fails, nothing from this batch is added and
    /// documents from earlier batches are left as they were. Returns the number
    /// of documents added.
    pub async fn ingest_batch(&mut self, paths: &[PathBuf]) -> Result<usize, EncodingError> {
        let batch = try_join_all(paths.iter().map(|p| encode_file(p)))
            .await
            .inspect_err(|e| warn!("Evidence batch of {} rejected: {}", paths.len(), e))?;

        let added = batch.len();
        let bytes: usize = batch.iter().map(EvidenceDocument::decoded_len).sum();
        self.extend(batch);

        info!(
            "Evidence batch accepted: {} documents, {} bytes ({} total)",
            added,
            bytes,
            self.len()
        );
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for_known_and_unknown() {
        assert_eq!(mime_type_for(Path::new("brief.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("archive.zip")), FALLBACK_MIME_TYPE);
        assert_eq!(mime_type_for(Path::new("README")), FALLBACK_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_encode_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("programs.txt");
        std::fs::write(&path, b"hello").unwrap();

        let doc = encode_file(&path).await.unwrap();

        assert_eq!(doc.name, "programs.txt");
        assert_eq!(doc.mime_type, "text/plain");
        assert_eq!(doc.payload, "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_previous_batches() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.md");
        std::fs::write(&first, b"one").unwrap();
        std::fs::write(&second, b"two").unwrap();

        let mut evidence = EvidenceSet::new();
        assert_eq!(evidence.ingest_batch(&[first.clone()]).await.unwrap(), 1);

        let missing = dir.path().join("missing.pdf");
        let err = evidence
            .ingest_batch(&[second.clone(), missing])
            .await
            .unwrap_err();

        assert!(matches!(err, EncodingError::Read { .. }));
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence.documents()[0].name, "first.txt");

        assert_eq!(evidence.ingest_batch(&[second]).await.unwrap(), 1);
        let names: Vec<_> = evidence.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["first.txt", "second.md"]);
    }

    #[tokio::test]
    async fn test_batch_preserves_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["c.txt", "a.txt", "b.txt"]
            .iter()
            .map(|n| {
                let p = dir.path().join(n);
                std::fs::write(&p, n.as_bytes()).unwrap();
                p
            })
            .collect();

        let mut evidence = EvidenceSet::new();
        evidence.ingest_batch(&paths).await.unwrap();

        let names: Vec<_> = evidence.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["c.txt", "a.txt", "b.txt"]);
        // Each file holds its own name
        assert!(evidence.documents().iter().all(|d| d.decoded_len() == d.name.len()));
    }

    #[tokio::test]
    async fn test_empty_batch_adds_nothing() {
        let mut evidence = EvidenceSet::new();
        assert_eq!(evidence.ingest_batch(&[]).await.unwrap(), 0);
        assert!(evidence.is_empty());
    }
}
