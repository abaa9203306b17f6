//! Blob store client: container probe, listing, and download.
//!
//! Authorization uses a shared-access signature carried in the connection
//! string (`BlobEndpoint=…;SharedAccessSignature=…`) and appended to every
//! request URL. Listing is paged via the `NextMarker` cursor and filtered
//! client-side to `.pdf` names.

use crate::retry::send_with_retry;
use quick_xml::events::Event;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Errors returned while interacting with the blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Connection string was missing a required field.
    #[error("Invalid blob connection string: {0}")]
    InvalidConnectionString(String),
    /// The requested container is not present in the storage account.
    #[error("Container '{0}' does not exist in the blob storage")]
    ContainerMissing(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Blob store responded with an unexpected status code.
    #[error("Unexpected blob store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the blob store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The listing response body could not be parsed.
    #[error("Failed to parse blob listing: {0}")]
    InvalidListing(String),
}

/// HTTP client scoped to one container of a blob storage account.
#[derive(Debug)]
pub struct BlobStore {
    client: Client,
    endpoint: String,
    sas_token: String,
    container: String,
}

struct ListingPage {
    names: Vec<String>,
    next_marker: Option<String>,
}

impl BlobStore {
    /// Construct a client from a connection string and container name.
    pub fn from_connection_string(
        connection_string: &str,
        container: &str,
        timeout_secs: u64,
    ) -> Result<Self, BlobError> {
        let endpoint = connection_field(connection_string, "BlobEndpoint").ok_or_else(|| {
            BlobError::InvalidConnectionString("BlobEndpoint not present".to_string())
        })?;
        let sas_token = connection_field(connection_string, "SharedAccessSignature")
            .ok_or_else(|| {
                BlobError::InvalidConnectionString(
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
            container: container.to_string(),
        })
    }

    /// Verify that the container exists; missing containers are fatal.
    pub async fn ensure_container(&self) -> Result<(), BlobError> {
        let url = format!(
            "{}/{}?restype=container&{}",
            self.endpoint, self.container, self.sas_token
        );
        let response = send_with_retry(|| self.client.get(&url), "blob container probe").await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BlobError::ContainerMissing(self.container.clone())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(BlobError::UnexpectedStatus { status, body })
            }
        }
    }

    /// List the names of every `.pdf` blob in the container (case-insensitive
    /// suffix match), following listing continuation markers to the end.
    pub async fn list_pdf_names(&self) -> Result<Vec<String>, BlobError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/{}?restype=container&comp=list&{}",
                self.endpoint, self.container, self.sas_token
            );
            if let Some(marker) = &marker {
                url.push_str("&marker=");
                url.push_str(marker);
            }

            let response = send_with_retry(|| self.client.get(&url), "blob list").await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(container = %self.container, status = %status, "Failed to list blobs");
                return Err(BlobError::UnexpectedStatus { status, body });
            }

            let body = response.text().await?;
            let page = parse_listing(&body)?;
            names.extend(page.names);

            match page.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }

        names.retain(|name| name.to_lowercase().ends_with(".pdf"));
        tracing::debug!(container = %self.container, count = names.len(), "Listed PDF blobs");
        Ok(names)
    }

    /// Download one blob's content into memory.
    pub async fn download(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let url = format!(
            "{}/{}/{}?{}",
            self.endpoint, self.container, name, self.sas_token
        );
        let response = send_with_retry(|| self.client.get(&url), "blob download").await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(blob = name, status = %status, "Failed to download blob");
            return Err(BlobError::UnexpectedStatus { status, body });
        }

        Ok(response.bytes().await?.to_vec())
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

fn parse_listing(xml: &str) -> Result<ListingPage, BlobError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut names = Vec::new();
    let mut next_marker = None;
    let mut in_blob = false;
    let mut in_name = false;
    let mut in_marker = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"Blob" => in_blob = true,
                b"Name" if in_blob => in_name = true,
                b"NextMarker" => in_marker = true,
                _ => {}
            },
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|error| BlobError::InvalidListing(error.to_string()))?;
                if in_name {
                    names.push(text.into_owned());
                } else if in_marker {
                    next_marker = Some(text.into_owned());
                }
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"Blob" => in_blob = false,
                b"Name" => in_name = false,
                b"NextMarker" => in_marker = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => return Err(BlobError::InvalidListing(error.to_string())),
            _ => {}
        }
    }

    Ok(ListingPage { names, next_marker })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};

    fn store_for(server: &MockServer) -> BlobStore {
        let connection = format!(
            "BlobEndpoint={};SharedAccessSignature=sv=2024&sig=test",
            server.base_url()
        );
        BlobStore::from_connection_string(&connection, "docs", 5).expect("client")
    }

    #[test]
    fn connection_string_fields_are_extracted() {
        let conn = "BlobEndpoint=https://acct.blob.example;SharedAccessSignature=sv=1&sig=abc";
        assert_eq!(
            connection_field(conn, "BlobEndpoint").as_deref(),
            Some("https://acct.blob.example")
        );
        assert_eq!(
            connection_field(conn, "SharedAccessSignature").as_deref(),
            Some("sv=1&sig=abc")
        );
        assert!(connection_field(conn, "QueueEndpoint").is_none());
    }

    #[test]
    fn missing_endpoint_is_rejected() {
        let error = BlobStore::from_connection_string("AccountName=a", "docs", 5).unwrap_err();
        assert!(matches!(error, BlobError::InvalidConnectionString(_)));
    }

    #[tokio::test]
    async fn listing_follows_markers_and_filters_pdfs() {
        let server = MockServer::start_async().await;

        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/docs")
                    .query_param("comp", "list")
                    .matches(|req| {
                        req.query_params
                            .as_ref()
                            .is_none_or(|params| !params.iter().any(|(key, _)| key == "marker"))
                    });
                then.status(200).body(
                    "<?xml version=\"1.0\"?><EnumerationResults><Blobs>\
                     <Blob><Name>report.pdf</Name></Blob>\
                     <Blob><Name>notes.txt</Name></Blob>\
                     </Blobs><NextMarker>page2</NextMarker></EnumerationResults>",
                );
            })
            .await;

        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/docs")
                    .query_param("comp", "list")
                    .query_param("marker", "page2");
                then.status(200).body(
                    "<?xml version=\"1.0\"?><EnumerationResults><Blobs>\
                     <Blob><Name>SCAN.PDF</Name></Blob>\
                     </Blobs><NextMarker /></EnumerationResults>",
                );
            })
            .await;

        let names = store_for(&server).list_pdf_names().await.expect("listing");

        first.assert();
        second.assert();
        assert_eq!(names, vec!["report.pdf".to_string(), "SCAN.PDF".to_string()]);
    }

    #[tokio::test]
    async fn missing_container_is_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/docs").query_param("restype", "container");
                then.status(404);
            })
            .await;

        let error = store_for(&server).ensure_container().await.unwrap_err();
        assert!(matches!(error, BlobError::ContainerMissing(name) if name == "docs"));
    }

    #[tokio::test]
    async fn download_returns_raw_bytes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/docs/report.pdf");
                then.status(200).body(b"%PDF-1.4 payload");
            })
            .await;

        let bytes = store_for(&server).download("report.pdf").await.expect("bytes");
        assert_eq!(bytes, b"%PDF-1.4 payload");
    }
}
