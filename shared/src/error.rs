//! Domain errors raised by the ledger, transfer and profit-sharing rules

use thiserror::Error;

use crate::models::{ItemCondition, TransferStatus};

/// Errors produced by the pure domain rules.
///
/// These never touch storage; the backend maps them onto HTTP responses and
/// the wasm module onto JavaScript exceptions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Validation error on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("Cannot {action} a transfer that is {from}")]
    InvalidStateTransition {
        from: TransferStatus,
        action: &'static str,
    },

    #[error("No profit-sharing ratio is defined for condition {0}")]
    UndefinedProfitShare(ItemCondition),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Result alias for domain rules
pub type DomainResult<T> = Result<T, DomainError>;
