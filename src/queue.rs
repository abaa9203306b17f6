//! Queue notifications for newly indexed files.
//!
//! One message is enqueued per indexed file. The message body is the base64
//! encoding of a typed JSON payload, wrapped in the queue service's XML
//! envelope. Notification is best-effort: the caller logs failures and never
//! rolls back index work on account of the queue.

use crate::retry::send_with_retry;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors returned while enqueueing notifications.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Connection string was missing a required field.
    #[error("Invalid queue connection string: {0}")]
    InvalidConnectionString(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Queue service responded with an unexpected status code.
    #[error("Unexpected queue response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the queue service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The message payload could not be serialized.
    #[error("Failed to serialize queue message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Payload of one indexed-file notification.
#[derive(Debug, Serialize)]
pub struct IndexedFileMessage<'a> {
    /// Name of the blob that was indexed.
    pub blob_name: &'a str,
}

/// HTTP client scoped to one named queue.
pub struct QueueNotifier {
    client: Client,
    endpoint: String,
    sas_token: String,
    queue_name: String,
}

impl QueueNotifier {
    /// Construct a notifier from a connection string and queue name.
    pub fn from_connection_string(
        connection_string: &str,
        queue_name: &str,
        timeout_secs: u64,
    ) -> Result<Self, QueueError> {
        let endpoint = connection_field(connection_string, "QueueEndpoint").ok_or_else(|| {
            QueueError::InvalidConnectionString("QueueEndpoint not present".to_string())
        })?;
        let sas_token = connection_field(connection_string, "SharedAccessSignature")
            .ok_or_else(|| {
                QueueError::InvalidConnectionString(
                    "SharedAccessSignature not present".to_string(),
                )
            })?;
        let client = Client::builder()
            .user_agent("docdex/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            sas_token: sas_token.trim_start_matches('?').to_string(),
            queue_name: queue_name.to_string(),
        })
    }

    /// Enqueue one notification naming a newly indexed blob.
    pub async fn notify_indexed(&self, blob_name: &str) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&IndexedFileMessage { blob_name })?;
        let body = format!(
            "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
            STANDARD.encode(payload)
        );
        let url = format!(
            "{}/{}/messages?{}",
            self.endpoint, self.queue_name, self.sas_token
        );

        let response = send_with_retry(
            || self.client.post(&url).body(body.clone()),
            "queue enqueue",
        )
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueueError::UnexpectedStatus { status, body });
        }

        tracing::info!(blob = blob_name, queue = %self.queue_name, "Queued blob name");
        Ok(())
    }
}

fn connection_field(connection_string: &str, key: &str) -> Option<String> {
    connection_string
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == key)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
