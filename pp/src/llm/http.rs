//! JSON POST with retry and exponential backoff, shared by every provider

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

use super::LlmError;

/// Maximum number of retries for transient errors
pub const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Parse a `retry-after` header value in seconds, defaulting to 60
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    Duration::from_secs(value.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(60))
}

/// POST `body` to `url`, retrying network errors and transient statuses.
///
/// Returns the first successful response. A 429 is surfaced immediately as
/// `RateLimited`; non-retryable statuses surface as `ApiError`.
pub async fn post_json(
    http: &Client,
    url: &str,
    headers: &[(&'static str, String)],
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<Response, LlmError> {
    debug!(%url, "post_json: called");

    let mut last_error = None;
    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
            warn!(attempt, backoff_ms = backoff, "post_json: retrying after transient error");
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let mut builder = http.post(url).header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }

        let response = match builder.json(body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                debug!(attempt, "post_json: timed out");
                last_error = Some(LlmError::Timeout(timeout));
                continue;
            }
            Err(e) => {
                debug!(attempt, error = %e, "post_json: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!("post_json: rate limited (429)");
            let retry_after = parse_retry_after(response.headers().get("retry-after").and_then(|v| v.to_str().ok()));
            return Err(LlmError::RateLimited { retry_after });
        }

        if is_retryable_status(status) && attempt < MAX_RETRIES {
            let text = response.text().await.unwrap_or_default();
            debug!(attempt, status, "post_json: retryable error");
            last_error = Some(LlmError::ApiError { status, message: text });
            continue;
        }

        if !response.status().is_success() {
            debug!(%status, "post_json: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        debug!("post_json: success");
        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}
