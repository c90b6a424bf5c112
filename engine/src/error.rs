//! Error handling for the Warehouse Inventory Management Platform
//!
//! All engine operations return structured [`AppError`] values; callers
//! (API/UI layers) decide user-facing presentation from the stable error
//! code, never from the message text.

use rust_decimal::Decimal;
use thiserror::Error;

use shared::MovementStatus;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors: surfaced before anything is persisted
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business policy rejections
    #[error("Policy rejection [{code}]: {message}")]
    PolicyRejection { code: String, message: String },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Invalid state transition from '{from}' to '{to}'")]
    StateTransition {
        from: MovementStatus,
        to: MovementStatus,
    },

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event publish error: {0}")]
    Event(String),

    #[error("Projector queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for each error class
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PolicyRejection { .. } => "POLICY_REJECTION",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::StateTransition { .. } => "STATE_TRANSITION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Event(_) => "EVENT_ERROR",
            AppError::Queue(_) => "QUEUE_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error originates in infrastructure rather than the
    /// request itself; these are logged with full context and surfaced
    /// to callers as a generic failure
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Event(_)
                | AppError::Queue(_)
                | AppError::Configuration(_)
                | AppError::Internal(_)
        )
    }

    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a policy rejection with a stable sub-code
    pub fn policy(code: &str, message: &str) -> Self {
        AppError::PolicyRejection {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Convenience type alias for service results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let err = AppError::validation("quantity", "must be positive");
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(!err.is_infrastructure());

        let err = AppError::InsufficientStock {
            requested: Decimal::from(20),
            available: Decimal::from(15),
        };
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");

        let err = AppError::StateTransition {
            from: MovementStatus::Completed,
            to: MovementStatus::Approved,
        };
        assert_eq!(err.code(), "STATE_TRANSITION_ERROR");
    }
}
