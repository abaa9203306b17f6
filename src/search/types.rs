//! Shared types used by the search index client and writer.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the search index.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Search service responded with an unexpected status code.
    #[error("Unexpected search service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the search service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Aggregate failure raised after every batch has been attempted.
    #[error("Indexing failed for {failed} document(s); distinct errors: {}", .messages.join("; "))]
    IndexingFailed {
        /// Number of documents that failed to index across all batches.
        failed: usize,
        /// Distinct error messages reported by the service.
        messages: Vec<String>,
    },
}

/// Action applied to a document when a batch is submitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexAction {
    /// Insert or replace the document.
    Upload,
    /// Remove the document by key.
    Delete,
}

/// The unit of storage in the search index.
#[derive(Clone, Debug, Serialize)]
pub struct IndexRecord {
    /// Globally unique document key.
    pub id: String,
    /// Source file identifier.
    pub filepath: String,
    /// Chunk text.
    pub content: String,
    /// Source file identifier, duplicated for filter convenience.
    pub metadata: String,
    /// Embedding vector for the chunk.
    #[serde(rename = "contentVector")]
    pub content_vector: Vec<f32>,
    /// Action applied when the record is submitted.
    #[serde(rename = "@search.action")]
    pub action: IndexAction,
}

/// Failure reported for one document within a batch.
#[derive(Debug, Clone)]
pub struct IndexingFailure {
    /// Key of the document that failed.
    pub key: String,
    /// Error message reported by the service.
    pub message: String,
}

/// Projection of one stored document returned by index scans.
#[derive(Debug, Deserialize)]
pub struct FoundDocument {
    /// Document key, when selected.
    #[serde(default)]
    pub id: Option<String>,
    /// Source file identifier, when selected.
    #[serde(default)]
    pub filepath: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct UploadBatch<'a> {
    pub(crate) value: &'a [IndexRecord],
}

#[derive(Serialize)]
pub(crate) struct DeleteBatch {
    pub(crate) value: Vec<DeleteAction>,
}

#[derive(Serialize)]
pub(crate) struct DeleteAction {
    #[serde(rename = "@search.action")]
    pub(crate) action: IndexAction,
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct BatchResponse {
    #[serde(default)]
    pub(crate) value: Vec<DocumentResult>,
}

#[derive(Deserialize)]
pub(crate) struct DocumentResult {
    pub(crate) key: String,
    pub(crate) status: bool,
    #[serde(rename = "errorMessage", default)]
    pub(crate) error_message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct SearchQuery<'a> {
    pub(crate) search: &'a str,
    pub(crate) select: &'a str,
    pub(crate) top: usize,
    pub(crate) skip: usize,
}

#[derive(Deserialize)]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub(crate) value: Vec<FoundDocument>,
}
