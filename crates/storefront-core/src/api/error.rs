use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token rejected")]
    Unauthorized { message: Option<String> },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request rejected ({status})")]
    Rejected { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload shape used by the API server: `{ "message": "..." }`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the `message` field out of a JSON error body, if there is one.
    fn parse_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::parse_message(body);
        let truncated = message.clone().unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized { message },
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            code @ 400..=499 => ApiError::Rejected { status: code, message },
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True only when the server explicitly rejected the bearer credential.
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Human-readable message sent by the server, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message } | ApiError::Rejected { message, .. } => {
                message.as_deref()
            }
            ApiError::AccessDenied(m) | ApiError::NotFound(m) | ApiError::ServerError(m) => {
                readable(m)
            }
            _ => None,
        }
    }
}

// Bodies that were not JSON get truncated raw text; never show those to users.
fn readable(m: &str) -> Option<&str> {
    if m.is_empty() || m.starts_with('<') || m.starts_with('{') || m.contains("(truncated,") {
        None
    } else {
        Some(m)
    }
}

/// Classify an `anyhow` error chain coming out of `ApiClient`.
pub fn is_invalid_credential(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .map(ApiError::is_invalid_credential)
        .unwrap_or(false)
}

/// Server-provided message for a failed call, or the given fallback.
pub fn failure_message(err: &anyhow::Error, fallback: &str) -> String {
    err.downcast_ref::<ApiError>()
        .and_then(ApiError::server_message)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_unauthorized_carries_server_message() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid email or password"}"#);
        assert!(err.is_invalid_credential());
        assert_eq!(err.server_message(), Some("Invalid email or password"));
    }

    #[test]
    fn test_client_error_becomes_rejection() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"User already exists"}"#);
        assert!(!err.is_invalid_credential());
        assert!(matches!(err, ApiError::Rejected { status: 400, .. }));
        assert_eq!(err.server_message(), Some("User already exists"));
    }

    #[test]
    fn test_server_error_with_html_body_has_no_message() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(err, ApiError::ServerError(_)));
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_rate_limited() {
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, ApiError::RateLimited));
    }

    #[test]
    fn test_truncate_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
        assert!(truncated.len() < body.len() + 40);
    }

    #[test]
    fn test_failure_message_fallback() {
        let err: anyhow::Error = ApiError::RateLimited.into();
        assert_eq!(failure_message(&err, "Login failed"), "Login failed");

        let err: anyhow::Error = ApiError::Rejected { status: 409, message: Some("Taken".into()) }.into();
        let err = err.context("Failed to send signup request");
        assert_eq!(failure_message(&err, "Signup failed"), "Taken");
        assert!(!is_invalid_credential(&err));
    }

    #[test]
    fn test_invalid_credential_survives_context() {
        let err: anyhow::Error = ApiError::Unauthorized { message: None }.into();
        let err = err.context("Failed to fetch identity");
        assert!(is_invalid_credential(&err));
    }
}
