//! Bounded retry with exponential backoff for outbound HTTP calls.
//!
//! Transient failures are HTTP 429, any 5xx, and transport-level errors
//! (timeouts, connection resets). Everything else is permanent and returned
//! to the caller on the first attempt. Backoff doubles per retry: 1s, 2s, 4s.

use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

const MAX_RETRIES: u32 = 3;

/// Send a request, retrying transient failures a bounded number of times.
///
/// `build` must produce a fresh request on every call since a `RequestBuilder`
/// is consumed by `send`. The final response is returned even when its status
/// is an error; mapping statuses to domain errors is the caller's job.
pub(crate) async fn send_with_retry(
    build: impl Fn() -> RequestBuilder,
    context: &'static str,
) -> Result<Response, reqwest::Error> {
    let mut attempt: u32 = 0;
    loop {
        match build().send().await {
            Ok(response) => {
                if attempt < MAX_RETRIES && is_transient(response.status()) {
                    tracing::warn!(
                        context,
                        status = %response.status(),
                        attempt,
                        "Transient response status; retrying"
                    );
                } else {
                    return Ok(response);
                }
            }
            Err(error) => {
                if attempt < MAX_RETRIES && (error.is_timeout() || error.is_connect()) {
                    tracing::warn!(context, error = %error, attempt, "Transport error; retrying");
                } else {
                    return Err(error);
                }
            }
        }

        tokio::time::sleep(backoff_delay(attempt)).await;
        attempt += 1;
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.min(4))
}
