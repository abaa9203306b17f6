//! Embedding client abstraction and the remote deployments adapter.

use crate::retry::send_with_retry;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Embedding service responded with an unexpected status code.
    #[error("Unexpected embedding service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the embedding service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The service answered without any embedding data.
    #[error("Embedding service returned no vectors")]
    EmptyResponse,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the index's vector field.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for one chunk of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding client backed by a deployments-style embeddings endpoint.
pub struct RemoteEmbeddings {
    client: Client,
    url: String,
    api_key: String,
    dimension: usize,
}

impl RemoteEmbeddings {
    /// Construct a client for the given endpoint, deployment, and API version.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        deployment: &str,
        api_version: &str,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .user_agent("docdex/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let url = format!(
            "{}/openai/deployments/{deployment}/embeddings?api-version={api_version}",
            endpoint.trim_end_matches('/')
        );

        Ok(Self {
            client,
            url,
            api_key: api_key.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingClient for RemoteEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest { input: text };
        let response = send_with_retry(
            || {
                self.client
                    .post(&self.url)
                    .header("api-key", &self.api_key)
                    .json(&request)
            },
            "embedding",
        )
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Embedding request failed");
            return Err(EmbeddingError::UnexpectedStatus { status, body });
        }

        let payload: EmbeddingResponse = response.json().await?;
        let vector = payload
            .data
            .into_iter()
            .next()
            .ok_or(EmbeddingError::EmptyResponse)?
            .embedding;

        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn embed_returns_vector_of_configured_dimension() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/ada/embeddings")
                    .query_param("api-version", "2024-02-01")
                    .header("api-key", "key")
                    .body_contains("\"input\":\"Hello world\"");
                then.status(200).json_body(json!({
                    "data": [ { "embedding": [0.1, 0.2, 0.3] } ]
                }));
            })
            .await;

        let client =
            RemoteEmbeddings::new(&server.base_url(), "key", "ada", "2024-02-01", 3, 5)
                .expect("client");
        let vector = client.embed("Hello world").await.expect("vector");

        mock.assert();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/openai/deployments/ada/embeddings");
                then.status(200).json_body(json!({
                    "data": [ { "embedding": [0.1, 0.2] } ]
                }));
            })
            .await;

        let client =
            RemoteEmbeddings::new(&server.base_url(), "key", "ada", "2024-02-01", 3, 5)
                .expect("client");
        let error = client.embed("Hello world").await.unwrap_err();

        assert!(matches!(
            error,
            EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
