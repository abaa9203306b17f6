//! Search index integration.

pub mod client;
mod schema;
pub mod types;
pub mod writer;

pub use client::SearchIndexClient;
pub use types::{FoundDocument, IndexAction, IndexRecord, IndexingFailure, SearchError};
pub use writer::{IndexWriter, UploadSummary};
