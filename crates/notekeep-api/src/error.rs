//! Error classification.
//!
//! Every failure a handler or extractor produces becomes an [`ApiError`],
//! and [`ApiError::into_response`] is the only place that picks a failure
//! status code. The response carries an [`ErrorReport`] extension that the
//! [`report_errors`] middleware logs once per request.

use std::any::Any;
use std::fmt;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value as JsonValue};
use tracing::{error, warn};

use notekeep_core::{Error, FieldError};

use crate::state::AppState;

/// Failure categories surfaced to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailure,
    MalformedIdentifier,
    NotFound,
    StoreUnavailable,
    DuplicateConflict,
    AuthFailure,
    Unclassified,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ValidationFailure | ErrorKind::MalformedIdentifier => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::DuplicateConflict => StatusCode::CONFLICT,
            ErrorKind::AuthFailure => StatusCode::UNAUTHORIZED,
            ErrorKind::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::MalformedIdentifier => "malformed_identifier",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::DuplicateConflict => "duplicate_conflict",
            ErrorKind::AuthFailure => "auth_failure",
            ErrorKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API error type with proper HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<FieldError>),
    MalformedId { field: String, value: String },
    NotFound(String),
    Unavailable(String),
    Conflict { field: String, value: String },
    /// Reserved; no route requires authentication yet.
    Unauthorized(String),
    /// Anything else. `detail` is the full error chain, shown outside production.
    Internal { message: String, detail: String },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::ValidationFailure,
            ApiError::MalformedId { .. } => ErrorKind::MalformedIdentifier,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Unavailable(_) => ErrorKind::StoreUnavailable,
            ApiError::Conflict { .. } => ErrorKind::DuplicateConflict,
            ApiError::Unauthorized(_) => ErrorKind::AuthFailure,
            ApiError::Internal { .. } => ErrorKind::Unclassified,
        }
    }

    /// Single-field validation failure, used for extractor rejections.
    pub fn invalid_body(message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new("body", message, JsonValue::Null)])
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(_) => "Validation failed".to_string(),
            ApiError::MalformedId { field, .. } => format!("Invalid {} format", field),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Unavailable(_) => "Service temporarily unavailable".to_string(),
            ApiError::Conflict { field, .. } => format!("Duplicate value for {}", field),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

/// Classify a core error.
pub fn classify(err: Error) -> ApiError {
    match err {
        Error::Validation(errors) => ApiError::Validation(errors),
        Error::MalformedId { field, value } => ApiError::MalformedId { field, value },
        Error::NoteNotFound(_) => ApiError::NotFound("Note not found".to_string()),
        Error::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
        Error::Unavailable(msg) => ApiError::Unavailable(msg),
        Error::Conflict { field, value } => ApiError::Conflict { field, value },
        Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
        other => ApiError::Internal {
            message: other.to_string(),
            detail: error_chain(&other),
        },
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        classify(err)
    }
}

/// Render an error and its sources, one per line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\ncaused by: {}", cause));
        source = cause.source();
    }
    out
}

/// What went wrong on a failed request, attached to the response for logging.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    /// Cause and error chain, for store and unclassified failures.
    pub detail: Option<(String, String)>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = self.message();

        let (body, detail) = match self {
            ApiError::Validation(errors) => (
                json!({"success": false, "message": message, "errors": errors}),
                None,
            ),
            ApiError::MalformedId { field, value } | ApiError::Conflict { field, value } => (
                json!({"success": false, "message": message, "field": field, "value": value}),
                None,
            ),
            ApiError::Unavailable(cause) => (
                json!({"success": false, "message": message}),
                Some((cause.clone(), cause)),
            ),
            ApiError::Internal {
                message: cause,
                detail,
            } => (
                json!({"success": false, "message": message}),
                Some((cause, detail)),
            ),
            ApiError::NotFound(_) | ApiError::Unauthorized(_) => {
                (json!({"success": false, "message": message}), None)
            }
        };

        let mut response = (kind.status(), Json(body)).into_response();
        response.extensions_mut().insert(ErrorReport {
            kind,
            message,
            detail,
        });
        response
    }
}

/// Shape a caught panic as an unclassified failure.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let cause = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal {
        message: format!("handler panicked: {}", cause),
        detail: format!("panic: {}", cause),
    }
    .into_response()
}

/// Log each failed request once and, outside production, expose the cause
/// of unclassified failures in the response body.
pub async fn report_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let mut response = next.run(request).await;
    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    let status = response.status().as_u16();
    let show_detail = !state.environment.is_production();
    let cause = report.detail.as_ref().map(|(cause, _)| cause.as_str()).unwrap_or("");

    match report.kind {
        ErrorKind::Unclassified | ErrorKind::StoreUnavailable => {
            if show_detail {
                let chain = report.detail.as_ref().map(|(_, d)| d.as_str()).unwrap_or("");
                error!(
                    subsystem = "api",
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error_kind = %report.kind,
                    status,
                    error = cause,
                    chain,
                    "{}",
                    report.message
                );
            } else {
                error!(
                    subsystem = "api",
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error_kind = %report.kind,
                    status,
                    error = cause,
                    "{}",
                    report.message
                );
            }
        }
        _ => {
            warn!(
                subsystem = "api",
                request_id = %request_id,
                method = %method,
                path = %path,
                error_kind = %report.kind,
                status,
                "{}",
                report.message
            );
        }
    }

    if report.kind == ErrorKind::Unclassified && show_detail {
        if let Some((cause, chain)) = report.detail {
            let body = json!({
                "success": false,
                "message": report.message,
                "error": cause,
                "stack": chain,
            });
            return (response.status(), Json(body)).into_response();
        }
    }

    response
}
