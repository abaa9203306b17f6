//! Vision-description client.
//!
//! Each embedded image is submitted to a chat-completions endpoint with a
//! fixed prompt asking for a description of diagrams, workflows, and legends.
//! Failures here are recoverable: the caller skips the affected image and
//! keeps going.

use crate::retry::send_with_retry;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SYSTEM_PROMPT: &str = "You can analyze images. You are an expert in understanding diagrams \
and workflows based on legends found in an image.";
const USER_PROMPT: &str = "Analyze this image and describe its contents, including any legends, \
diagrams, or workflows you can identify.";

/// Errors returned while describing an image.
#[derive(Debug, Error)]
pub enum VisionError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Vision service responded with an unexpected status code.
    #[error("Unexpected vision service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the vision service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The service answered without any completion choices.
    #[error("Vision service returned no completion choices")]
    EmptyResponse,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// HTTP client for the vision-description endpoint.
pub struct VisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl VisionClient {
    /// Construct a client for the given completions endpoint.
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self, VisionError> {
        let client = Client::builder()
            .user_agent("docdex/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Describe one image, returning the model's natural-language text.
    pub async fn describe(&self, image: &[u8]) -> Result<String, VisionError> {
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(image));
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(SYSTEM_PROMPT),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                        ContentPart::Text { text: USER_PROMPT },
                    ]),
                },
            ],
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 800,
        };

        let response = send_with_retry(
            || {
                self.client
                    .post(&self.endpoint)
                    .header("api-key", &self.api_key)
                    .json(&request)
            },
            "vision describe",
        )
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::UnexpectedStatus { status, body });
        }

        let payload: ChatResponse = response.json().await?;
        let choice = payload
            .choices
            .into_iter()
            .next()
            .ok_or(VisionError::EmptyResponse)?;
        Ok(choice.message.content)
    }
}
