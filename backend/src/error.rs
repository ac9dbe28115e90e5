//! Error handling for the Inventaris platform
//!
//! Provides consistent error responses in English and Indonesian

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions: requires {0}")]
    InsufficientPermissions(&'static str),

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_id: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_id: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_id: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Undefined profit share for condition {0}")]
    UndefinedProfitShare(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Field-level validation error
    pub fn validation(field: &str, message: &str, message_id: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_id: message_id.to_string(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, message } => AppError::Validation {
                field: field.to_string(),
                message_id: format!("Data tidak valid: {}", message),
                message,
            },
            DomainError::InsufficientStock {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            err @ DomainError::InvalidStateTransition { .. } => {
                AppError::InvalidStateTransition(err.to_string())
            }
            DomainError::UndefinedProfitShare(condition) => {
                AppError::UndefinedProfitShare(condition.to_string())
            }
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_id: "Token sudah kedaluwarsa".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_id: "Token tidak valid".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions(permission) => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: format!("Permission denied: requires {}", permission),
                    message_id: format!("Akses ditolak: membutuhkan izin {}", permission),
                    field: None,
                },
            ),
            AppError::Unauthorized {
                message,
                message_id,
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_id: message_id.clone(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_id,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_id: message_id.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::InvalidInput(errors) => {
                let field = errors.field_errors().keys().next().map(|f| f.to_string());
                (
                    StatusCode::BAD_REQUEST,
                    ErrorDetail {
                        code: "VALIDATION_ERROR".to_string(),
                        message_en: errors.to_string(),
                        message_id: "Data yang dikirim tidak valid".to_string(),
                        field,
                    },
                )
            }
            AppError::Conflict {
                resource,
                message,
                message_id,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_id: message_id.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_id: format!("{} tidak ditemukan", resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock {
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: format!(
                        "Insufficient stock: available {}, requested {}",
                        available, requested
                    ),
                    message_id: format!(
                        "Stok tidak mencukupi. Tersedia: {}, diminta: {}",
                        available, requested
                    ),
                    field: Some("quantity".to_string()),
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: msg.clone(),
                    message_id: format!("Status tidak dapat diubah: {}", msg),
                    field: None,
                },
            ),
            AppError::UndefinedProfitShare(condition) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "UNDEFINED_PROFIT_SHARE".to_string(),
                    message_en: format!(
                        "No profit-sharing ratio is configured for condition {}",
                        condition
                    ),
                    message_id: format!(
                        "Rasio bagi hasil untuk kondisi {} belum ditentukan",
                        condition
                    ),
                    field: Some("condition".to_string()),
                },
            ),
            AppError::DatabaseError(err) => {
                // constraint and trigger messages are meaningful to the caller
                let message = match err {
                    sqlx::Error::Database(db_err) => db_err.message().to_string(),
                    _ => "A database error occurred".to_string(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetail {
                        code: "DATABASE_ERROR".to_string(),
                        message_en: message,
                        message_id: "Terjadi kesalahan pada basis data".to_string(),
                        field: None,
                    },
                )
            }
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_id: "Terjadi kesalahan internal pada server".to_string(),
                    field: None,
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ItemCondition, TransferStatus};

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::validation("quantity", "bad"), StatusCode::BAD_REQUEST),
            (
                DomainError::InsufficientStock {
                    available: 70,
                    requested: 1000,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DomainError::InvalidStateTransition {
                    from: TransferStatus::Active,
                    action: "reject",
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DomainError::UndefinedProfitShare(ItemCondition::NeedsRepair),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_not_found_and_conflict() {
        assert_eq!(
            AppError::NotFound("Transfer".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        let conflict = AppError::Conflict {
            resource: "item".to_string(),
            message: "in use".to_string(),
            message_id: "sedang dipakai".to_string(),
        };
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_keeps_field() {
        let err: AppError = DomainError::validation("reason", "A rejection reason is required").into();
        match err {
            AppError::Validation { field, message, .. } => {
                assert_eq!(field, "reason");
                assert_eq!(message, "A rejection reason is required");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_permission_error_is_forbidden() {
        let response = AppError::InsufficientPermissions("transfers:approve").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
