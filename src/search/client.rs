//! HTTP client wrapper for the search index service.

use crate::retry::send_with_retry;
use crate::search::schema::index_schema;
use crate::search::types::{
    BatchResponse, DeleteAction, DeleteBatch, FoundDocument, IndexAction, IndexRecord,
    IndexingFailure, SearchError, SearchPage, SearchQuery, UploadBatch,
};
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;

const API_VERSION: &str = "2023-07-01-Preview";
const SCAN_PAGE_SIZE: usize = 1000;

/// Lightweight HTTP client scoped to one search index.
pub struct SearchIndexClient {
    client: Client,
    endpoint: String,
    api_key: String,
    index_name: String,
}

impl SearchIndexClient {
    /// Construct a client for the given service endpoint and index name.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        index_name: &str,
        timeout_secs: u64,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .user_agent("docdex/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            index_name: index_name.to_string(),
        })
    }

    /// Name of the index this client operates on.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Create the index when it is absent; an existing index is never altered.
    pub async fn ensure_index(&self, vector_dimension: usize) -> Result<(), SearchError> {
        let path = format!("indexes/{}", self.index_name);
        let response =
            send_with_retry(|| self.request(Method::GET, &path), "search index probe").await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(index = %self.index_name, "Search index already exists");
                return Ok(());
            }
            StatusCode::NOT_FOUND => {
                tracing::info!(index = %self.index_name, "Search index does not exist; creating");
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(SearchError::UnexpectedStatus { status, body });
            }
        }

        let schema = index_schema(&self.index_name, vector_dimension);
        let response = send_with_retry(
            || self.request(Method::PUT, &path).json(&schema),
            "search index create",
        )
        .await?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!(index = %self.index_name, vector_dimension, "Created search index");
                Ok(())
            }
            StatusCode::NO_CONTENT => {
                tracing::info!(index = %self.index_name, "Updated existing search index");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(index = %self.index_name, status = %status, "Failed to create search index");
                Err(SearchError::UnexpectedStatus { status, body })
            }
        }
    }

    /// Submit one upload batch, returning the per-document failures.
    pub async fn upload_batch(
        &self,
        records: &[IndexRecord],
    ) -> Result<Vec<IndexingFailure>, SearchError> {
        let batch = UploadBatch { value: records };
        self.submit_batch(&batch).await
    }

    /// Submit one delete batch for the given document keys.
    pub async fn delete_batch(&self, ids: Vec<String>) -> Result<Vec<IndexingFailure>, SearchError> {
        let batch = DeleteBatch {
            value: ids
                .into_iter()
                .map(|id| DeleteAction {
                    action: IndexAction::Delete,
                    id,
                })
                .collect(),
        };
        self.submit_batch(&batch).await
    }

    /// Scan every document in the index, projecting the given fields.
    ///
    /// This walks the whole index page by page; cost grows with index size,
    /// not with the caller's working set.
    pub async fn scan_documents(
        &self,
        select: &str,
    ) -> Result<Vec<FoundDocument>, SearchError> {
        let path = format!("indexes/{}/docs/search", self.index_name);
        let mut documents = Vec::new();
        let mut skip = 0;

        loop {
            let query = SearchQuery {
                search: "*",
                select,
                top: SCAN_PAGE_SIZE,
                skip,
            };
            let response = send_with_retry(
                || self.request(Method::POST, &path).json(&query),
                "search scan",
            )
            .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(index = %self.index_name, status = %status, "Failed to scan index");
                return Err(SearchError::UnexpectedStatus { status, body });
            }

            let page: SearchPage = response.json().await?;
            let page_len = page.value.len();
            documents.extend(page.value);

            if page_len < SCAN_PAGE_SIZE {
                break;
            }
            skip += page_len;
        }

        Ok(documents)
    }

    async fn submit_batch(
        &self,
        batch: &impl serde::Serialize,
    ) -> Result<Vec<IndexingFailure>, SearchError> {
        let path = format!("indexes/{}/docs/index", self.index_name);
        let response = send_with_retry(
            || self.request(Method::POST, &path).json(batch),
            "search batch submit",
        )
        .await?;

        let status = response.status();
        if !(status.is_success() || status == StatusCode::MULTI_STATUS) {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(index = %self.index_name, status = %status, "Batch submit failed");
            return Err(SearchError::UnexpectedStatus { status, body });
        }

        let payload: BatchResponse = response.json().await?;
        let failures = payload
            .value
            .into_iter()
            .filter(|result| !result.status)
            .map(|result| IndexingFailure {
                key: result.key,
                message: result
                    .error_message
                    .unwrap_or_else(|| "no error message provided".to_string()),
            })
            .collect();
        Ok(failures)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{path}?api-version={API_VERSION}", self.endpoint);
        self.client
            .request(method, url)
            .header("api-key", &self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::PUT, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn ensure_index_skips_creation_when_present() {
        let server = MockServer::start_async().await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/indexes/user-1")
                    .query_param("api-version", API_VERSION)
                    .header("api-key", "admin");
                then.status(200).json_body(json!({ "name": "user-1" }));
            })
            .await;

        let client =
            SearchIndexClient::new(&server.base_url(), "admin", "user-1", 5).expect("client");
        client.ensure_index(1536).await.expect("ensure");

        probe.assert();
    }

    #[tokio::test]
    async fn ensure_index_creates_on_missing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes/user-1");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/indexes/user-1")
                    .body_contains("\"dimensions\":4")
                    .body_contains("contentVector");
                then.status(201);
            })
            .await;

        let client =
            SearchIndexClient::new(&server.base_url(), "admin", "user-1", 5).expect("client");
        client.ensure_index(4).await.expect("ensure");

        create.assert();
    }
}
