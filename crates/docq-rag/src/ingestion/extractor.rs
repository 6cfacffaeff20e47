//! Plain text extraction from uploaded documents

use std::sync::mpsc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::document::{Document, DocumentFormat};

/// Whole document PDF extraction can stall on malformed font tables, so the
/// secondary pass runs on its own thread under this deadline.
const PDF_WHOLE_DOC_TIMEOUT: Duration = Duration::from_secs(60);

/// Page level extraction under this many characters is treated as failed and
/// retried against the whole document.
const PDF_NEAR_EMPTY_CHARS: usize = 64;

/// Extraction output: the text plus a content hash for logging and
/// duplicate spotting.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub content_hash: String,
}

pub struct Extractor;

impl Extractor {
    /// Pull the text out of a document according to its format. Documents
    /// with no extractable text are rejected here, before any embedding
    /// work happens.
    pub fn extract(document: &Document) -> Result<ExtractedText> {
        let text = match document.format {
            DocumentFormat::Txt | DocumentFormat::Markdown => {
                Self::extract_utf8(&document.filename, &document.bytes)?
            }
            DocumentFormat::Pdf => Self::extract_pdf(&document.filename, &document.bytes)?,
            DocumentFormat::Docx => Self::extract_docx(&document.filename, &document.bytes)?,
        };

        if text.trim().is_empty() {
            return Err(Error::empty_document(document.filename.clone()));
        }

        Ok(ExtractedText {
            content_hash: hash_content(&text),
            text,
        })
    }

    /// Strict UTF-8 first; invalid input is logged and decoded lossily so a
    /// stray byte does not sink an otherwise readable file.
    fn extract_utf8(filename: &str, data: &[u8]) -> Result<String> {
        match std::str::from_utf8(data) {
            Ok(text) => Ok(text.to_string()),
            Err(e) => {
                let err = Error::decode(
                    filename,
                    format!("invalid UTF-8 at byte {}", e.valid_up_to()),
                );
                tracing::warn!("{}, decoding lossily", err);
                Ok(String::from_utf8_lossy(data).into_owned())
            }
        }
    }

    /// Page by page extraction. A page that yields nothing contributes empty
    /// text rather than failing the document. If the whole pass comes back
    /// near empty the document gets one more chance as a single unit, which
    /// recovers PDFs whose page tree confuses the per page path.
    fn extract_pdf(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::decode(filename, format!("unreadable PDF: {e}")))?;

        let mut pages: Vec<String> = Vec::new();
        for (page_number, _) in doc.get_pages() {
            match doc.extract_text(&[page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::debug!(
                        "No text from page {} of '{}': {}",
                        page_number,
                        filename,
                        e
                    );
                    pages.push(String::new());
                }
            }
        }

        let mut text = normalize_pdf_text(&pages.join("\n\n"));
        if text.trim().chars().count() < PDF_NEAR_EMPTY_CHARS {
            tracing::warn!(
                "Page level extraction of '{}' was near empty, retrying whole document",
                filename
            );
            if let Some(whole) = Self::extract_pdf_whole(data) {
                let whole = normalize_pdf_text(&whole);
                if whole.trim().len() > text.trim().len() {
                    text = whole;
                }
            }
        }
        Ok(text)
    }

    /// Run pdf-extract over the full document on a worker thread so a
    /// pathological file cannot hang the ingestion request.
    fn extract_pdf_whole(data: &[u8]) -> Option<String> {
        let data = data.to_vec();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(pdf_extract::extract_text_from_mem(&data));
        });
        match rx.recv_timeout(PDF_WHOLE_DOC_TIMEOUT) {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                tracing::warn!("Whole document PDF extraction failed: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!("Whole document PDF extraction timed out");
                None
            }
        }
    }

    /// Walk the docx body and collect the text runs, one line per paragraph.
    fn extract_docx(filename: &str, data: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::decode(filename, format!("unreadable docx: {e}")))?;

        let mut text = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
                for child in paragraph.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }
        Ok(text)
    }
}

/// PDF extractors leave NUL bytes and ragged line endings behind. Strip the
/// noise while keeping paragraph structure.
fn normalize_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Content fingerprint used in logs.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
