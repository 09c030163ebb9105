//! Document Text Extractor — turns an uploaded PDF into plain text, page by page.
//!
//! Text is passed through exactly as pdf-extract returns it. No whitespace,
//! encoding, or ligature normalization happens here.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

/// The only media type accepted for uploaded documents.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Only PDF files are supported: {document} was uploaded as '{found}'")]
    UnsupportedMediaType {
        document: &'static str,
        found: String,
    },

    #[error("Failed to extract text from {document}: {message}")]
    Unreadable {
        document: &'static str,
        message: String,
    },
}

/// Rejects anything whose declared media type is not exactly `application/pdf`.
pub fn ensure_pdf(document: &'static str, content_type: Option<&str>) -> Result<(), ExtractionError> {
    match content_type {
        Some(PDF_MEDIA_TYPE) => Ok(()),
        other => Err(ExtractionError::UnsupportedMediaType {
            document,
            found: other.unwrap_or("<none>").to_string(),
        }),
    }
}

/// Each page's text followed by a newline, in page order.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages.into_iter().fold(String::new(), |mut text, page| {
        text.push_str(page.as_ref());
        text.push('\n');
        text
    })
}

/// Synchronous page-by-page extraction. CPU-bound; call from a blocking context.
pub fn extract_pdf_text(document: &'static str, data: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(data).map_err(|e| {
        ExtractionError::Unreadable {
            document,
            message: e.to_string(),
        }
    })?;
    debug!("Extracted {} page(s) from {document}", pages.len());
    Ok(join_pages(pages))
}

/// Pluggable extractor held in `AppState`.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &'static str, data: Bytes) -> Result<String, ExtractionError>;
}

/// Default extractor backed by pdf-extract, run on the blocking thread pool.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, document: &'static str, data: Bytes) -> Result<String, ExtractionError> {
        tokio::task::spawn_blocking(move || extract_pdf_text(document, &data))
            .await
            .map_err(|e| ExtractionError::Unreadable {
                document,
                // pdf-extract panics on some malformed inputs; JoinError carries it
                message: if e.is_panic() {
                    "PDF parser aborted on malformed input".to_string()
                } else {
                    e.to_string()
                },
            })?
    }
}
