
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ConfigError, DocumentConfig};
use crate::{RagError, Result};

/// Page separator emitted by the PDF text extractor
const PAGE_BREAK: char = '\x0c';

/// Plain text pulled out of a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub document_id: String,
    pub path: PathBuf,
    pub pages: usize,
    pub text: String,
}

/// Pick the document to ingest: an explicit path wins over the configured one.
///
/// A missing path is a configuration problem; a path that does not exist is
/// reported as [`RagError::DocumentNotFound`].
#[inline]
pub fn resolve_document_path(explicit: Option<&Path>, config: &DocumentConfig) -> Result<PathBuf> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| config.path.clone())
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ConfigError::MissingDocumentPath)?;

    if !path.exists() {
        return Err(RagError::DocumentNotFound(path));
    }

    Ok(path)
}

/// Chunks are grouped under the source file name
#[inline]
pub fn document_id_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Trim every page, drop the blank ones and join the rest with a blank line.
/// Returns the text and the number of pages kept.
#[inline]
pub fn join_pages<I, S>(pages: I) -> (String, usize)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kept: Vec<String> = pages
        .into_iter()
        .map(|page| page.as_ref().trim().to_string())
        .filter(|page| !page.is_empty())
        .collect();

    (kept.join("\n\n"), kept.len())
}

/// Extract the text of a PDF file
#[inline]
pub async fn read_pdf(path: &Path) -> Result<ExtractedDocument> {
    if !path.exists() {
        return Err(RagError::DocumentNotFound(path.to_path_buf()));
    }

    info!("Extracting text from {}", path.display());
    let bytes = tokio::fs::read(path).await?;

    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| anyhow::anyhow!("PDF extraction task failed: {e}"))?
        .map_err(|e| RagError::PdfExtraction {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let (text, pages) = join_pages(raw.split(PAGE_BREAK));
    let document_id = document_id_for(path);
    debug!(
        "Extracted {} characters from {} pages of '{}'",
        text.chars().count(),
        pages,
        document_id
    );

    Ok(ExtractedDocument {
        document_id,
        path: path.to_path_buf(),
        pages,
        text,
    })
}
