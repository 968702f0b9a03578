//! Shared HTTP client, SSE parsing, and error-body mapping.

use std::str::FromStr;
use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{ApiErrorCode, TychoError};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Build Azure-style headers (api-key).
pub fn api_key_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(api_key) {
        headers.insert("api-key", val);
    }
    headers
}

/// Parse an SSE "data:" line, returning None for "[DONE]".
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data: ")?;
    if data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Map a non-200 status and error body to a typed error.
///
/// The OpenAI-style backends wrap failures as
/// `{"error": {"message": ..., "code": ...}}`; the code drives the
/// retryable/non-retryable classification.
pub fn status_to_error(status: u16, body: &str) -> TychoError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let error_obj = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error_obj
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or(body)
        .to_string();
    let code = error_obj
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
        .and_then(|c| ApiErrorCode::from_str(c).ok());

    match status {
        401 | 403 => TychoError::Authentication(message),
        404 if code == Some(ApiErrorCode::ModelNotFound) => TychoError::ModelNotFound(message),
        429 => TychoError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => TychoError::Api {
            status,
            message,
            code,
        },
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_code_is_classified() {
        let body = r#"{"error": {"message": "blocked", "code": "content_filter"}}"#;
        let err = status_to_error(400, body);
        assert!(err.is_content_filtered());

        let body = r#"{"error": {"message": "no such model", "code": "model_not_found"}}"#;
        assert!(matches!(
            status_to_error(404, body),
            TychoError::ModelNotFound(_)
        ));
    }

    #[test]
    fn unparseable_body_falls_back_to_raw_text() {
        let err = status_to_error(500, "upstream exploded");
        match err {
            TychoError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sse_done_marker_ends_stream() {
        assert_eq!(parse_sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(parse_sse_data("data: [DONE]"), None);
        assert_eq!(parse_sse_data(": keepalive"), None);
    }
}
