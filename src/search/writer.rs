//! Batched index writes and filepath-scoped deletion.

use crate::search::client::SearchIndexClient;
use crate::search::types::{IndexRecord, SearchError};
use std::collections::BTreeSet;

/// Summary of a completed upload.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadSummary {
    /// Number of records submitted.
    pub documents: usize,
    /// Number of batches issued.
    pub batches: usize,
}

/// Writes assembled records into the search index in fixed-size batches.
pub struct IndexWriter {
    client: SearchIndexClient,
    batch_size: usize,
}

impl IndexWriter {
    /// Build a writer over the given client with the given batch size.
    pub fn new(client: SearchIndexClient, batch_size: usize) -> Self {
        Self { client, batch_size }
    }

    /// Create the backing index when absent.
    pub async fn ensure_index(&self, vector_dimension: usize) -> Result<(), SearchError> {
        self.client.ensure_index(vector_dimension).await
    }

    /// Distinct filepaths currently present in the index.
    pub async fn list_existing_files(&self) -> Result<BTreeSet<String>, SearchError> {
        let documents = self.client.scan_documents("filepath").await?;
        Ok(documents
            .into_iter()
            .filter_map(|document| document.filepath)
            .collect())
    }

    /// Upsert records in order-preserving batches.
    ///
    /// Every batch is attempted even after earlier failures; per-document and
    /// whole-batch errors are accumulated and raised as one aggregate error
    /// afterwards. Batches already accepted are not rolled back, so a failed
    /// run can leave a file partially indexed; re-running the upload is the
    /// recovery mechanism.
    pub async fn upload(&self, records: &[IndexRecord]) -> Result<UploadSummary, SearchError> {
        if records.is_empty() {
            return Ok(UploadSummary::default());
        }

        let mut failed = 0usize;
        let mut messages = BTreeSet::new();
        let mut batches = 0usize;

        for batch in records.chunks(self.batch_size) {
            batches += 1;
            match self.client.upload_batch(batch).await {
                Ok(failures) => {
                    for failure in failures {
                        tracing::error!(
                            key = %failure.key,
                            error = %failure.message,
                            "Indexing failed for document"
                        );
                        failed += 1;
                        messages.insert(failure.message);
                    }
                }
                Err(error) => {
                    tracing::error!(
                        batch = batches,
                        documents = batch.len(),
                        error = %error,
                        "Batch submit failed; continuing with remaining batches"
                    );
                    failed += batch.len();
                    messages.insert(error.to_string());
                }
            }
        }

        if failed > 0 {
            return Err(SearchError::IndexingFailed {
                failed,
                messages: messages.into_iter().collect(),
            });
        }

        tracing::info!(
            index = %self.client.index_name(),
            documents = records.len(),
            batches,
            "Uploaded documents to index"
        );
        Ok(UploadSummary {
            documents: records.len(),
            batches,
        })
    }

    /// Delete every record whose filepath exactly matches one of the given
    /// blob names. Requires a full index scan; no matches is a logged no-op.
    pub async fn delete_files(&self, blob_names: &[String]) -> Result<usize, SearchError> {
        let targets: BTreeSet<&str> = blob_names.iter().map(String::as_str).collect();
        let documents = self.client.scan_documents("id,filepath").await?;

        let ids: Vec<String> = documents
            .into_iter()
            .filter(|document| {
                document
                    .filepath
                    .as_deref()
                    .map(|filepath| targets.contains(filepath))
                    .unwrap_or(false)
            })
            .filter_map(|document| document.id)
            .collect();

        if ids.is_empty() {
            tracing::info!("No documents found for the provided blob names");
            return Ok(0);
        }

        let deleted = ids.len();
        let failures = self.client.delete_batch(ids).await?;
        if !failures.is_empty() {
            let failed = failures.len();
            let messages: BTreeSet<String> =
                failures.into_iter().map(|failure| failure.message).collect();
            return Err(SearchError::IndexingFailed {
                failed,
                messages: messages.into_iter().collect(),
            });
        }

        tracing::info!(deleted, "Deleted documents from index");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::IndexAction;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn record(id: &str, filepath: &str) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            filepath: filepath.to_string(),
            content: format!("content of {id}"),
            metadata: filepath.to_string(),
            content_vector: vec![0.0, 1.0],
            action: IndexAction::Upload,
        }
    }

    fn writer_for(server: &MockServer, batch_size: usize) -> IndexWriter {
        let client =
            SearchIndexClient::new(&server.base_url(), "admin", "user-1", 5).expect("client");
        IndexWriter::new(client, batch_size)
    }

    #[tokio::test]
    async fn upload_issues_ceiling_of_m_over_b_batches_in_order() {
        let server = MockServer::start_async().await;
        let submit = server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/user-1/docs/index");
                then.status(200).json_body(json!({ "value": [] }));
            })
            .await;

        let records: Vec<IndexRecord> = (0..5)
            .map(|i| record(&format!("1_prose_0_{i}"), "a.pdf"))
            .collect();
        let summary = writer_for(&server, 2).upload(&records).await.expect("upload");

        submit.assert_hits(3);
        assert_eq!(summary.documents, 5);
        assert_eq!(summary.batches, 3);
    }

    #[tokio::test]
    async fn upload_aggregates_failures_after_attempting_all_batches() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/indexes/user-1/docs/index")
                    .body_contains("\"id\":\"r0\"");
                then.status(207).json_body(json!({
                    "value": [
                        { "key": "r0", "status": false, "errorMessage": "quota exceeded", "statusCode": 503 },
                        { "key": "r1", "status": true, "statusCode": 201 }
                    ]
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/indexes/user-1/docs/index")
                    .body_contains("\"id\":\"r2\"");
                then.status(200).json_body(json!({
                    "value": [
                        { "key": "r2", "status": true, "statusCode": 201 }
                    ]
                }));
            })
            .await;

        let records = vec![
            record("r0", "a.pdf"),
            record("r1", "a.pdf"),
            record("r2", "a.pdf"),
        ];
        let error = writer_for(&server, 2).upload(&records).await.unwrap_err();

        first.assert();
        second.assert();
        match error {
            SearchError::IndexingFailed { failed, messages } => {
                assert_eq!(failed, 1);
                assert_eq!(messages, vec!["quota exceeded".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn delete_scopes_to_matching_filepaths_only() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/user-1/docs/search");
                then.status(200).json_body(json!({
                    "value": [
                        { "id": "1", "filepath": "a.pdf" },
                        { "id": "2", "filepath": "b.pdf" },
                        { "id": "3", "filepath": "c.pdf" }
                    ]
                }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/indexes/user-1/docs/index")
                    .json_body(json!({
                        "value": [ { "@search.action": "delete", "id": "2" } ]
                    }));
                then.status(200).json_body(json!({
                    "value": [ { "key": "2", "status": true, "statusCode": 200 } ]
                }));
            })
            .await;

        let deleted = writer_for(&server, 50)
            .delete_files(&["b.pdf".to_string()])
            .await
            .expect("delete");

        delete.assert();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn delete_with_no_matches_is_a_noop() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/user-1/docs/search");
                then.status(200).json_body(json!({ "value": [] }));
            })
            .await;

        let deleted = writer_for(&server, 50)
            .delete_files(&["missing.pdf".to_string()])
            .await
            .expect("delete");

        assert_eq!(deleted, 0);
    }
}
