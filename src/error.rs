//! Structured error types for board operations.
//!
//! Every rejection carries a user-facing message. Permission and
//! precondition failures are raised before any persistence call, so an
//! error of those kinds always means "nothing changed".

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Rejected before any write
    PermissionDenied,
    PreconditionFailed,
    MissingRequiredField,
    InvalidFieldValue,
    ResolutionFailed,

    // Not found errors
    TaskNotFound,
    CollaboratorNotFound,
    CompanyNotFound,
    FaqNotFound,

    // Store errors
    PersistenceError,
    InternalError,
}

/// Structured error for engine and board operations.
#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl EngineError {
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

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PreconditionFailed, message)
    }

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

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResolutionFailed, message)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn collaborator_not_found(collaborator_id: &str) -> Self {
        Self::new(
            ErrorCode::CollaboratorNotFound,
            format!("Collaborator not found: {}", collaborator_id),
        )
    }

    pub fn company_not_found(company_id: &str) -> Self {
        Self::new(
            ErrorCode::CompanyNotFound,
            format!("Company not found: {}", company_id),
        )
    }

    pub fn faq_not_found(faq_id: &str) -> Self {
        Self::new(ErrorCode::FaqNotFound, format!("FAQ entry not found: {}", faq_id))
            .with_field("faq_id")
    }

    /// Deadlines and due dates must lie strictly after the submission instant.
    pub fn deadline_not_in_future(field: &str) -> Self {
        Self::new(
            ErrorCode::PreconditionFailed,
            "The deadline must be later than the current date and time",
        )
        .with_field(field)
    }

    pub fn persistence(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::PersistenceError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// True for errors raised before any write was attempted.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self.code,
            ErrorCode::PersistenceError | ErrorCode::InternalError
        )
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

// Store failures surface as persistence errors unless they already carry a code.
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine_err) => engine_err,
            Err(err) => EngineError::persistence(err),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
