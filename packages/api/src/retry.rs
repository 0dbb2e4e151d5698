//! HTTP send helpers with retry for transient errors.
//!
//! Idempotent reads go through [`send_json`], which retries connection
//! failures, timeouts, HTTP 429, and HTTP 5xx with exponential backoff.
//! Requests with side effects go through [`send_once`], which never
//! retries: the collection endpoint records no idempotency key, so a
//! second attempt could queue a duplicate job.
//!
//! # Usage
//!
//! ```ignore
//! use crate::retry;
//!
//! // GET → JSON, retried
//! let flares: Vec<FlareRecord> = retry::send_json(|| client.get(&url), 2).await?;
//!
//! // POST, exactly one attempt
//! let response = retry::send_once(|| client.post(&url).json(&range)).await?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::ApiError;

/// Delay before the first retry. Doubles on each subsequent retry
/// (0.5s, 1s, 2s, ...).
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Maximum length of the response body preview included in error logs
/// and error details.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and decodes the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// # Errors
///
/// Returns [`ApiError`] if the request fails after `max_retries` retries,
/// the server answers with a non-retryable error status, or the body is
/// not valid JSON for `T`.
pub async fn send_json<T, F>(build_request: F, max_retries: u32) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;

    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "JSON decode failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {}",
            text.len(),
            preview(&text),
        );
        ApiError::Decode {
            message: format!(
                "{e} (status={status}, received {} bytes)",
                text.len()
            ),
        }
    })
}

/// Sends an HTTP request exactly once and returns the successful response.
///
/// # Errors
///
/// Returns [`ApiError::Http`] on transport failure and
/// [`ApiError::Status`] when the server answers with a 4xx or 5xx status.
pub async fn send_once<F>(build_request: F) -> Result<reqwest::Response, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    send_inner(&build_request, 0).await
}

/// Core retry loop shared by [`send_json`] and [`send_once`].
///
/// Returns the response once it has a 1xx/2xx/3xx status.
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = RETRY_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt - 1));
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < max_retries;
        attempt += 1;

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) => {
                if is_transient(&e) && can_retry {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(ApiError::Http(e));
            }
        };

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if can_retry {
                log::warn!("  HTTP {status} from {}", response.url());
                continue;
            }
            return Err(status_error(response).await);
        }

        // 4xx Client Error (not 429) is permanent
        if status.is_client_error() {
            return Err(status_error(response).await);
        }

        return Ok(response);
    }
}

/// Converts an error response into [`ApiError::Status`], keeping the
/// backend's explanation when it sent one.
async fn status_error(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = extract_detail(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    ApiError::Status {
        status: status.as_u16(),
        detail,
    }
}

/// Pulls a human-readable explanation out of an error body.
///
/// The API reports errors as `{"detail": ...}`; validation errors put a
/// list there instead of a string. Non-JSON bodies are returned as a
/// truncated preview.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(preview(body)),
        },
        _ => Some(preview(body)),
    }
}

fn preview(text: &str) -> String {
    if text.len() > BODY_PREVIEW_LEN {
        let cut = (0..=BODY_PREVIEW_LEN)
            .rev()
            .find(|i| text.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_string_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "Solar flare not found"}"#).as_deref(),
            Some("Solar flare not found")
        );
    }

    #[test]
    fn stringifies_structured_detail() {
        let detail = extract_detail(r#"{"detail": [{"loc": ["body", "start_date"]}]}"#).unwrap();
        assert!(detail.contains("start_date"));
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(extract_detail("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert!(extract_detail("   ").is_none());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_PREVIEW_LEN);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert!(p.len() <= BODY_PREVIEW_LEN + 3);
    }
}
