//! Error types for notekeep.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result type alias using notekeep's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected request field.
///
/// `value` holds the value the caller sent (after sanitization), so a UI can
/// highlight the offending input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default)]
    pub value: JsonValue,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, value: JsonValue) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value,
        }
    }
}

/// Core error type for notekeep operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// One or more fields violated a validation or schema rule
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Identifier does not have the expected shape
    #[error("Invalid {field}: {value}")]
    MalformedId { field: String, value: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Uniqueness constraint violated
    #[error("Duplicate value for {field}: {value}")]
    Conflict { field: String, value: String },

    /// The store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Build a single-field validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>, value: JsonValue) -> Self {
        Error::Validation(vec![FieldError::new(field, message, value)])
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_note_not_found() {
        let id = Uuid::nil();
        let err = Error::NoteNotFound(id);
        assert_eq!(err.to_string(), format!("Note not found: {}", id));
    }

    #[test]
    fn test_error_display_validation_lists_fields() {
        let err = Error::Validation(vec![
            FieldError::new("title", "Title is required", json!("")),
            FieldError::new("content", "Content is required", JsonValue::Null),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: title: Title is required; content: Content is required"
        );
    }

    #[test]
    fn test_error_display_malformed_id() {
        let err = Error::MalformedId {
            field: "id".to_string(),
            value: "not-an-id".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid id: not-an-id");
    }

    #[test]
    fn test_invalid_builds_single_field_error() {
        match Error::invalid("q", "Search query is required", json!("")) {
            Error::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "q");
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(msg) if !msg.is_empty()));
    }

    #[test]
    fn test_field_error_serializes_value() {
        let fe = FieldError::new("tags", "At most 10 tags are allowed", json!(["a"]));
        let v = serde_json::to_value(&fe).unwrap();
        assert_eq!(v["field"], "tags");
        assert_eq!(v["value"], json!(["a"]));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
