//! Filesystem text source.
//!
//! Resolves document ids as paths relative to `[source].root` and loads the
//! freshest bytes on every call. The document version is the SHA-256 of
//! those bytes, so any edit produces a new cache key while an untouched file
//! keeps hitting the cache even if its mtime changes.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use docchat_core::source::{LoadedDocument, TextSource};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::extract;

pub struct FsTextSource {
    root: PathBuf,
}

impl FsTextSource {
    /// # Errors
    ///
    /// Returns an error if the root directory does not exist.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let root = config
            .root
            .canonicalize()
            .with_context(|| format!("Source root does not exist: {}", config.root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `document_id`, rejecting ids that escape the root.
    fn resolve(&self, document_id: &str) -> Result<PathBuf> {
        let candidate = self.root.join(document_id);
        let path = candidate
            .canonicalize()
            .with_context(|| format!("Document not found: {}", document_id))?;
        if !path.starts_with(&self.root) {
            bail!("Document id escapes the source root: {}", document_id);
        }
        if !path.is_file() {
            bail!("Document is not a file: {}", document_id);
        }
        Ok(path)
    }
}

#[async_trait]
impl TextSource for FsTextSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn load(&self, document_id: &str) -> Result<LoadedDocument> {
        let path = self.resolve(document_id)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let metadata = tokio::fs::metadata(&path).await?;
        let modified: DateTime<Utc> = metadata
            .modified()
            .unwrap_or(std::time::UNIX_EPOCH)
            .into();

        let mime_type = mime_for_path(&path);
        let version = content_version(&bytes);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| document_id.to_string());

        let text = read_text(bytes, mime_type, document_id).await?;
        debug!(
            document = document_id,
            mime = mime_type,
            version = %version,
            text_chars = text.as_ref().map(|t| t.chars().count()),
            "loaded document"
        );

        Ok(LoadedDocument {
            id: document_id.to_string(),
            name,
            mime_type: mime_type.to_string(),
            modified_time: modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            version,
            text,
        })
    }
}

/// Hex SHA-256 of the document bytes.
pub fn content_version(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Decode or extract text; `None` for types with no text representation.
///
/// An extractable file that fails to parse is treated as non-text rather than
/// failing the whole request.
async fn read_text(
    bytes: Vec<u8>,
    mime_type: &'static str,
    document_id: &str,
) -> Result<Option<String>> {
    if is_text_mime(mime_type) {
        return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
    }
    if !extract::is_extractable(mime_type) {
        return Ok(None);
    }

    let extracted =
        tokio::task::spawn_blocking(move || extract::extract_text(&bytes, mime_type)).await?;
    match extracted {
        Ok(text) => Ok(Some(text)),
        Err(e) => {
            warn!(document = document_id, error = %e, "text extraction failed");
            Ok(None)
        }
    }
}

pub fn is_text_mime(mime_type: &str) -> bool {
    mime_type.starts_with("text/") || matches!(mime_type, "application/json" | "application/xml")
}

/// Mime type from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "txt" | "text" | "log" | "rst" | "toml" | "yaml" | "yml" | "ini" => "text/plain",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => extract::MIME_PDF,
        "docx" => extract::MIME_DOCX,
        "pptx" => extract::MIME_PPTX,
        "xlsx" => extract::MIME_XLSX,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
