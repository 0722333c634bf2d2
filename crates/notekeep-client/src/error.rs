//! Client-side error taxonomy.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

/// Error codes derived from the HTTP status of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    ServerError,
    ServiceUnavailable,
    /// No response was received.
    NetworkError,
    /// The client gave up waiting for a response.
    Timeout,
    UnknownError,
}

impl ErrorCode {
    /// Determine the code from an HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::ValidationError,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            500 => Self::ServerError,
            502..=504 => Self::ServiceUnavailable,
            _ => Self::UnknownError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError => "SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed API call, normalized for callers.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct ClientError {
    /// Human-readable message, taken from the response body when present.
    pub message: String,
    pub code: ErrorCode,
    /// HTTP status, absent when no response arrived.
    pub status: Option<u16>,
    /// Field errors (`errors`) or the offending `field`/`value` pair.
    pub details: Option<JsonValue>,
    pub timestamp: DateTime<Utc>,
}

impl ClientError {
    pub fn new(code: ErrorCode, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            status,
            details: None,
            timestamp: Utc::now(),
        }
    }

    /// Build from a non-success response and its decoded body, if any.
    pub fn from_response(status: u16, body: Option<&JsonValue>) -> Self {
        let message = body
            .and_then(|b| b.get("message"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        let details = body.and_then(|b| {
            if let Some(errors) = b.get("errors") {
                Some(errors.clone())
            } else {
                b.get("field").map(|field| {
                    json!({
                        "field": field,
                        "value": b.get("value").cloned().unwrap_or(JsonValue::Null),
                    })
                })
            }
        });

        Self {
            details,
            ..Self::new(ErrorCode::from_status(status), Some(status), message)
        }
    }

    /// Build from a transport failure.
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::Timeout, None, format!("Request timed out: {}", err))
        } else {
            Self::new(ErrorCode::NetworkError, None, format!("Network error: {}", err))
        }
    }

    /// A successful response that lacked the entity the operation returns.
    pub fn missing_data(op: &str, status: u16) -> Self {
        Self::new(
            ErrorCode::UnknownError,
            Some(status),
            format!("Response to {} carried no data", op),
        )
    }

    /// A successful response whose body could not be decoded.
    pub fn invalid_body(status: u16, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::UnknownError,
            Some(status),
            format!("Invalid response body: {}", reason),
        )
    }

    /// Transport failures and 5xx responses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => status >= 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(ErrorCode::from_status(400), ErrorCode::ValidationError);
        assert_eq!(ErrorCode::from_status(422), ErrorCode::ValidationError);
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(403), ErrorCode::Forbidden);
        assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(409), ErrorCode::Conflict);
        assert_eq!(ErrorCode::from_status(429), ErrorCode::RateLimited);
        assert_eq!(ErrorCode::from_status(500), ErrorCode::ServerError);
        assert_eq!(ErrorCode::from_status(502), ErrorCode::ServiceUnavailable);
        assert_eq!(ErrorCode::from_status(503), ErrorCode::ServiceUnavailable);
        assert_eq!(ErrorCode::from_status(504), ErrorCode::ServiceUnavailable);
        assert_eq!(ErrorCode::from_status(418), ErrorCode::UnknownError);
        assert_eq!(ErrorCode::from_status(501), ErrorCode::UnknownError);
    }

    #[test]
    fn test_validation_details_are_kept() {
        let body = json!({
            "success": false,
            "message": "Validation failed",
            "errors": [{"field": "title", "message": "Title is required", "value": ""}]
        });
        let err = ClientError::from_response(400, Some(&body));
        assert_eq!(err.message, "Validation failed");
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.details.unwrap()[0]["field"], "title");
        assert!(!ClientError::from_response(400, Some(&body)).is_retryable());
    }

    #[test]
    fn test_field_value_details() {
        let body = json!({"success": false, "message": "Invalid id format", "field": "id", "value": "abc"});
        let err = ClientError::from_response(400, Some(&body));
        assert_eq!(err.details, Some(json!({"field": "id", "value": "abc"})));
    }

    #[test]
    fn test_missing_body_message() {
        let err = ClientError::from_response(503, None);
        assert_eq!(err.message, "Request failed with status 503");
        assert!(err.is_retryable());
        assert!(err.details.is_none());
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let v = serde_json::to_value(ErrorCode::ServiceUnavailable).unwrap();
        assert_eq!(v, json!("SERVICE_UNAVAILABLE"));
        assert_eq!(ErrorCode::RateLimited.to_string(), "RATE_LIMITED");
    }
}
