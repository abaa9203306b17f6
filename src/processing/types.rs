//! Core data types and error definitions for the processing pipeline.

use crate::blob::BlobError;
use crate::embedding::EmbeddingError;
use crate::layout::LayoutError;
use crate::pdf::PdfError;
use crate::processing::chunking::ChunkingError;
use crate::queue::QueueError;
use crate::search::SearchError;
use thiserror::Error;

/// One source document fetched from the blob store.
///
/// The content buffer lives exactly as long as one pipeline pass over the
/// file; dropping the value releases it on every exit path.
#[derive(Debug)]
pub struct SourceFile {
    /// Blob name identifying the file.
    pub name: String,
    /// Raw downloaded bytes.
    pub content: Vec<u8>,
}

/// Kind tag distinguishing the three extractor outputs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnitKind {
    /// Tabular content detected by layout analysis.
    Table,
    /// Natural-language description of an embedded image.
    Image,
    /// The document's page-ordered prose body.
    Prose,
}

impl UnitKind {
    /// Stable lowercase label used inside record identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Image => "image",
            Self::Prose => "prose",
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one extractor applied to one source file.
#[derive(Debug, Clone)]
pub struct ExtractedUnit {
    /// Which extractor produced the unit.
    pub kind: UnitKind,
    /// Table ordinal (0-based), physical page number (1-based), or 0 for prose.
    pub sub_index: u32,
    /// Raw extracted text.
    pub text: String,
}

/// Errors raised by the individual extractors.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Layout-analysis call failed.
    #[error("Layout analysis failed: {0}")]
    Layout(#[from] LayoutError),
    /// Document text could not be extracted.
    #[error("Text extraction failed: {0}")]
    Pdf(#[from] PdfError),
}

/// Errors emitted by the document processing pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Chunker configuration was invalid.
    #[error("Failed to configure chunker: {0}")]
    Chunking(#[from] ChunkingError),
    /// Blob store interaction failed.
    #[error("Blob store request failed: {0}")]
    Blob(#[from] BlobError),
    /// Queue notifier could not be constructed.
    #[error("Queue setup failed: {0}")]
    Queue(#[from] QueueError),
    /// Source document could not be decoded.
    #[error("Failed to decode document: {0}")]
    Pdf(#[from] PdfError),
    /// An extractor failed in a way that aborts the file.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),
    /// Embedding provider failed to produce a vector.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Search index interaction failed.
    #[error("Search index request failed: {0}")]
    Search(#[from] SearchError),
    /// Layout client could not be constructed.
    #[error("Layout client setup failed: {0}")]
    Layout(#[from] LayoutError),
    /// Vision client could not be constructed.
    #[error("Vision client setup failed: {0}")]
    Vision(#[from] crate::vision::VisionError),
}

/// Summary of one completed upload operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOutcome {
    /// PDF blobs found in the container.
    pub files_discovered: usize,
    /// Files that were new and processed without a fatal error.
    pub files_indexed: usize,
    /// Files skipped because processing failed.
    pub files_failed: usize,
    /// Records written to the search index.
    pub records_uploaded: usize,
}
