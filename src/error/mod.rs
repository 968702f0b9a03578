//! Error types for Tycho.

use thiserror::Error;

/// Primary error type for all Tycho operations.
#[derive(Error, Debug)]
pub enum TychoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Machine-readable code extracted from the provider error body.
        code: Option<ApiErrorCode>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Tool execution error: {tool_name} — {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Chat completion failed: {0}")]
    ChatCompletion(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Error codes reported in chat-completion error bodies.
///
/// Parsed from the `error.code` field the OpenAI-style APIs put in their
/// JSON error payloads; unknown codes fall back to [`ApiErrorCode::ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidRequestError,
    InvalidApiKey,
    AuthenticationError,
    RateLimitExceeded,
    QuotaExceeded,
    ContentFilter,
    ContextLengthExceeded,
    ModelNotFound,
    UnsupportedLanguage,
    BadRequest,
    ServerError,
    ApiError,
    ServiceUnavailable,
}

impl ApiErrorCode {
    /// Human-readable explanation, used when surfacing a terminal failure.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::InvalidRequestError => {
                "Invalid request: The request was malformed or missing parameters."
            }
            Self::InvalidApiKey => "Authentication failed: Invalid or expired API key.",
            Self::AuthenticationError => "Authentication failed: Please check your credentials.",
            Self::RateLimitExceeded => "Rate limit exceeded: Too many requests.",
            Self::QuotaExceeded => "Quota exceeded: Account usage limit reached.",
            Self::ContentFilter => {
                "Content filtered: Response blocked by content moderation policy."
            }
            Self::ContextLengthExceeded => {
                "Context length exceeded: Request exceeds model's token limit."
            }
            Self::ModelNotFound => "Model not found: The requested model does not exist.",
            Self::UnsupportedLanguage => {
                "Unsupported language: The model doesn't support the requested language."
            }
            Self::BadRequest => "Bad request: The request was invalid.",
            Self::ServerError => "Server error: A general server-side failure occurred.",
            Self::ApiError => "API error: An unexpected API failure occurred.",
            Self::ServiceUnavailable => "Service unavailable: The service is temporarily down.",
        }
    }

    /// Codes that must never be retried.
    pub fn is_non_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequestError
                | Self::InvalidApiKey
                | Self::AuthenticationError
                | Self::ModelNotFound
                | Self::UnsupportedLanguage
                | Self::BadRequest
        )
    }
}

impl TychoError {
    /// Create an API error without a parsed code.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            code: None,
        }
    }

    /// The API error code, when one was parsed from the response body.
    pub fn api_code(&self) -> Option<ApiErrorCode> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether this error names a content-filter rejection.
    pub fn is_content_filtered(&self) -> bool {
        self.api_code() == Some(ApiErrorCode::ContentFilter)
    }

    /// Whether this error is worth retrying with the same request.
    ///
    /// Timeouts are deliberately terminal: a call that blew its execution
    /// budget is not re-run.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited { .. } => true,
            Self::Api { status, code, .. } => {
                if let Some(code) = code {
                    if code.is_non_retryable() || *code == ApiErrorCode::ContentFilter {
                        return false;
                    }
                }
                matches!(status, 408 | 409 | 429 | 500..=599)
            }
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TychoError>;
