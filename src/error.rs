//! Structured error types for board operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,
    GroupNotFound,

    // Capability errors
    Unauthorized,
    NotEditable,

    // Internal errors
    InternalError,
}

/// Structured error returned by rejected board operations.
#[derive(Debug, Clone, Serialize)]
pub struct BoardError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl BoardError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn group_not_found(group_id: &str) -> Self {
        Self::new(
            ErrorCode::GroupNotFound,
            format!("Task group not found: {}", group_id),
        )
    }

    pub fn unauthorized(principal_id: &str, action: &str) -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            format!("{} is not allowed to {}", principal_id, action),
        )
    }

    pub fn not_editable(task_id: &str, column: &str) -> Self {
        Self::new(
            ErrorCode::NotEditable,
            format!("Task {} cannot be edited while in {}", task_id, column),
        )
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BoardError {}

impl From<anyhow::Error> for BoardError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<BoardError>() {
            Ok(board_err) => board_err,
            Err(err) => BoardError::internal(err),
        }
    }
}

/// Result type for board operations.
pub type BoardResult<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_code_and_field() {
        let err = BoardError::invalid_value("tokens", "tokens must be non-negative");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "INVALID_FIELD_VALUE");
        assert_eq!(json["field"], "tokens");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_anyhow_downcast_keeps_board_error() {
        let original = BoardError::task_not_found("t-1");
        let wrapped = anyhow::Error::new(original);
        let back: BoardError = wrapped.into();

        assert_eq!(back.code, ErrorCode::TaskNotFound);
        assert_eq!(back.message, "Task not found: t-1");
    }

    #[test]
    fn test_anyhow_other_errors_become_internal() {
        let back: BoardError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(back.code, ErrorCode::InternalError);
    }
}
