//! Error types for SocialHub.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    /// A referenced entity other than a user or post does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No user with the given ID or username, or the account is deactivated.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// No post with the given ID.
    #[error("Post not found: {0}")]
    PostNotFound(String),

    /// The viewer is not allowed to see or interact with the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The principal tried to act on something owned by someone else.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Self-follow, self-block and self-report attempts.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Input rejected before any state change (length, charset, email, duplicates).
    #[error("Validation error: {0}")]
    Validation(String),

    // === Server Errors ===
    /// The store failed; the message carries the driver error.
    #[error("Database error: {0}")]
    Database(String),

    /// The background job queue is full or closed.
    #[error("Queue error: {0}")]
    Queue(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An outbound integration such as SMTP failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Anything else; usually converted from `anyhow::Error`.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::PostNotFound(_) => "POST_NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error is caused by infrastructure rather than the caller.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Queue(_)
                | Self::Config(_)
                | Self::ExternalService(_)
                | Self::Internal(_)
        )
    }

    /// Returns whether the referenced entity does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::UserNotFound(_) | Self::PostNotFound(_)
        )
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
