//! Documents, formats, and the chunks they break into

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Txt,
    Docx,
    Markdown,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::Txt),
            "docx" => Some(Self::Docx),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Resolve the format of an uploaded file from its name. Extension wins;
    /// MIME guessing catches aliases of the supported types. Anything else is
    /// rejected before the file body is touched.
    pub fn detect(filename: &str) -> Result<Self> {
        let ext = filename.rsplit('.').next().unwrap_or("");
        if let Some(format) = Self::from_extension(ext) {
            return Ok(format);
        }
        match mime_guess::from_path(filename).first().as_ref().map(|m| m.essence_str()) {
            Some("text/plain") => Ok(Self::Txt),
            Some("text/markdown") => Ok(Self::Markdown),
            Some("application/pdf") => Ok(Self::Pdf),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => {
                Ok(Self::Docx)
            }
            _ => Err(Error::unsupported_format(filename)),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text",
            Self::Docx => "Word Document",
            Self::Markdown => "Markdown",
        }
    }
}

/// An uploaded file waiting to be ingested. Held in memory only; the raw
/// bytes are dropped once extraction and chunking are done.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            format,
            bytes,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// A contiguous piece of a document's extracted text. Chunks are what gets
/// embedded, indexed, and cited back to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    /// Filename of the originating document
    pub source: String,
    /// Position within the document's chunk sequence
    pub sequence_index: u32,
    pub text: String,
    /// Half open character interval into the extracted text
    pub char_start: usize,
    pub char_end: usize,
}

impl Chunk {
    pub fn new(
        document_id: Uuid,
        source: impl Into<String>,
        sequence_index: u32,
        text: impl Into<String>,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        debug_assert!(char_end > char_start, "chunks must cover a non-empty interval");
        Self {
            id: Uuid::new_v4(),
            document_id,
            source: source.into(),
            sequence_index,
            text: text.into(),
            char_start,
            char_end,
        }
    }

    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}
