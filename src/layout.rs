//! Layout-analysis client for table detection and extraction.
//!
//! The service is submit-then-poll: a document is posted to the prebuilt
//! layout model, the service answers `202 Accepted` with an
//! `Operation-Location` header, and the result is fetched from that URL until
//! the operation reaches a terminal status. Responses are deserialized into
//! typed structures so schema drift is caught at the boundary.

use crate::retry::send_with_retry;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const API_VERSION: &str = "2023-07-31";
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLLS: u32 = 120;

/// Errors returned while analyzing document layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Layout service responded with an unexpected status code.
    #[error("Unexpected layout service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the layout service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The submit response carried no operation URL to poll.
    #[error("Layout service accepted the document but returned no Operation-Location")]
    MissingOperationLocation,
    /// The analysis operation reported failure.
    #[error("Layout analysis failed: {0}")]
    AnalysisFailed(String),
    /// The operation did not reach a terminal status within the poll limit.
    #[error("Layout analysis did not complete after {0} polls")]
    Timeout(u32),
}

/// Completed layout analysis for one document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    /// Tables detected in the document, in reading order.
    #[serde(default)]
    pub tables: Vec<LayoutTable>,
}

/// One detected table.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTable {
    /// Number of rows the service assigned to the table.
    #[serde(default)]
    pub row_count: u32,
    /// Number of columns the service assigned to the table.
    #[serde(default)]
    pub column_count: u32,
    /// Cells in row-major order.
    #[serde(default)]
    pub cells: Vec<LayoutCell>,
}

/// One table cell.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutCell {
    /// Zero-based row of the cell.
    pub row_index: u32,
    /// Zero-based column of the cell.
    pub column_index: u32,
    /// Text content of the cell.
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: OperationStatus,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    analyze_result: Option<LayoutResult>,
}

#[derive(Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// HTTP client for the layout-analysis service.
pub struct LayoutClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl LayoutClient {
    /// Construct a client for the given service endpoint.
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self, LayoutError> {
        let client = Client::builder()
            .user_agent("docdex/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Submit a document and poll until the analysis completes.
    pub async fn analyze(&self, document: &[u8]) -> Result<LayoutResult, LayoutError> {
        let url = format!(
            "{}/formrecognizer/documentModels/prebuilt-layout:analyze?api-version={API_VERSION}",
            self.endpoint
        );
        let payload = document.to_vec();
        let response = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .header("Ocp-Apim-Subscription-Key", &self.api_key)
                    .header(header::CONTENT_TYPE, "application/pdf")
                    .body(payload.clone())
            },
            "layout submit",
        )
        .await?;

        if response.status() != StatusCode::ACCEPTED {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Layout service rejected the document");
            return Err(LayoutError::UnexpectedStatus { status, body });
        }

        let operation_url = response
            .headers()
            .get("Operation-Location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(LayoutError::MissingOperationLocation)?;

        self.poll_operation(&operation_url).await
    }

    async fn poll_operation(&self, operation_url: &str) -> Result<LayoutResult, LayoutError> {
        for poll in 0..MAX_POLLS {
            let response = send_with_retry(
                || {
                    self.client
                        .get(operation_url)
                        .header("Ocp-Apim-Subscription-Key", &self.api_key)
                },
                "layout poll",
            )
            .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(LayoutError::UnexpectedStatus { status, body });
            }

            let operation: AnalyzeOperation = response.json().await?;
            match operation.status {
                OperationStatus::Succeeded => {
                    let result = operation.analyze_result.unwrap_or_default();
                    tracing::debug!(tables = result.tables.len(), "Layout analysis complete");
                    return Ok(result);
                }
                OperationStatus::Failed => {
                    let message = operation
                        .error
                        .map(|error| error.message)
                        .unwrap_or_else(|| "no error detail provided".to_string());
                    return Err(LayoutError::AnalysisFailed(message));
                }
                OperationStatus::NotStarted
                | OperationStatus::Running
                | OperationStatus::Unknown => {
                    tracing::trace!(poll, "Layout analysis still running");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }

        Err(LayoutError::Timeout(MAX_POLLS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn analyze_polls_operation_until_succeeded() {
        let server = MockServer::start_async().await;
        let submit = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/formrecognizer/documentModels/prebuilt-layout:analyze")
                    .header("Ocp-Apim-Subscription-Key", "key");
                then.status(202)
                    .header("Operation-Location", server.url("/operations/1"));
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/1");
                then.status(200).json_body(json!({
                    "status": "succeeded",
                    "analyzeResult": {
                        "tables": [
                            {
                                "rowCount": 1,
                                "columnCount": 2,
                                "cells": [
                                    { "rowIndex": 0, "columnIndex": 0, "content": "name" },
                                    { "rowIndex": 0, "columnIndex": 1, "content": "value" }
                                ]
                            }
                        ]
                    }
                }));
            })
            .await;

        let client = LayoutClient::new(&server.base_url(), "key", 5).expect("client");
        let result = client.analyze(b"%PDF-1.4").await.expect("analysis");

        submit.assert();
        poll.assert();
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].cells.len(), 2);
        assert_eq!(result.tables[0].cells[1].content, "value");
    }

    #[tokio::test]
    async fn failed_operation_surfaces_service_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/formrecognizer/documentModels/prebuilt-layout:analyze");
                then.status(202)
                    .header("Operation-Location", server.url("/operations/2"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/2");
                then.status(200).json_body(json!({
                    "status": "failed",
                    "error": { "message": "document is encrypted" }
                }));
            })
            .await;

        let client = LayoutClient::new(&server.base_url(), "key", 5).expect("client");
        let error = client.analyze(b"%PDF-1.4").await.unwrap_err();

        assert!(matches!(
            error,
            LayoutError::AnalysisFailed(message) if message.contains("encrypted")
        ));
    }
}
