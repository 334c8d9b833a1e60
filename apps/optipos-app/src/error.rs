//! # API Error Type
//!
//! Unified error type for command functions.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in OptiPOS                                │
//! │                                                                         │
//! │  Command Function ── Result<T, ApiError>                                │
//! │         │                                                               │
//! │         ├── ValidationError ──────────────┐                             │
//! │         ├── CoreError (already refunded…) ┤                             │
//! │         ├── DbError ──────────────────────┼──► ApiError ──► toast       │
//! │         └── SyncError ────────────────────┘    { code, message(en/ar) } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every message is bilingual so the frontend can show it in the active
//! language without its own lookup. Technical detail goes to the log, not
//! to the toast.

use serde::Serialize;
use tracing::error;

use optipos_core::{CoreError, LocalizedText, Translator, ValidationError};
use optipos_db::DbError;
use optipos_sync::SyncError;

/// Error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": { "key": "...", "translations": { "en": "...", "ar": "..." } },
///   "field": "phone"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Toast text in both languages
    pub message: LocalizedText,

    /// Offending form field, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    /// Input validation failed
    ValidationError,

    /// A business rule refused the action (already refunded, bad exchange step)
    BusinessLogic,

    /// Record already exists
    Duplicate,

    DatabaseError,

    /// Backend unreachable or rejected the request
    SyncError,

    /// A sync is already running
    SyncInProgress,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: LocalizedText) -> Self {
        ApiError {
            code,
            message,
            field: None,
        }
    }

    /// Message from the built-in translation table.
    pub fn keyed(code: ErrorCode, key: &str) -> Self {
        ApiError::new(code, Translator::both(key))
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        tracing::debug!(resource, id, "Lookup missed");
        ApiError::keyed(ErrorCode::NotFound, "error.not_found")
    }

    pub fn validation(field: impl Into<String>) -> Self {
        ApiError {
            field: Some(field.into()),
            ..ApiError::keyed(ErrorCode::ValidationError, "error.validation")
        }
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!("Internal error: {}", detail);
        ApiError::keyed(ErrorCode::Internal, "error.internal")
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let key = match err.field() {
            "refund amount" => "error.refund_amount",
            "reason" => "error.reason_required",
            _ => "error.validation",
        };
        ApiError {
            field: Some(err.field().to_string()),
            ..ApiError::keyed(ErrorCode::ValidationError, key)
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PatientNotFound(id) => ApiError::not_found("Patient", &id),
            CoreError::InvoiceNotFound(id) => ApiError::not_found("Invoice", &id),
            CoreError::WorkOrderNotFound(id) => ApiError::not_found("Work order", &id),
            CoreError::CatalogItemNotFound { kind, id } => ApiError::not_found(&kind, &id),
            CoreError::LocationNotFound(id) => ApiError::not_found("Location", &id),
            CoreError::AlreadyRefunded(_) => {
                ApiError::keyed(ErrorCode::BusinessLogic, "error.already_refunded")
            }
            CoreError::AlreadyExchanged(_) => {
                ApiError::keyed(ErrorCode::BusinessLogic, "error.already_exchanged")
            }
            CoreError::InvalidRefundAmount { .. } => ApiError {
                field: Some("amount".to_string()),
                ..ApiError::keyed(ErrorCode::ValidationError, "error.refund_amount")
            },
            CoreError::InvalidExchangeTransition { .. } => {
                ApiError::keyed(ErrorCode::BusinessLogic, "error.exchange_state")
            }
            CoreError::DuplicatePricingCombination { .. } => {
                ApiError::keyed(ErrorCode::Duplicate, "error.duplicate")
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                tracing::warn!(field, value, "Unique constraint rejected write");
                ApiError::keyed(ErrorCode::Duplicate, "error.duplicate")
            }
            other => {
                // Log the actual error but show a generic message
                error!("Database operation failed: {}", other);
                ApiError::keyed(ErrorCode::DatabaseError, "error.database")
            }
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::AlreadyRunning => {
                ApiError::keyed(ErrorCode::SyncInProgress, "error.sync_in_progress")
            }
            other => {
                tracing::warn!("Sync failed: {}", other);
                ApiError::keyed(ErrorCode::SyncError, "error.sync")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message.get(optipos_core::Locale::En))
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use optipos_core::{Locale, Money};

    #[test]
    fn test_refund_amount_error_is_bilingual() {
        let err: ApiError = CoreError::InvalidRefundAmount {
            amount: Money::from_major(50),
            total: Money::from_major(45),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.get(Locale::En).contains("Refund amount"));
        assert!(!err.message.get(Locale::Ar).is_empty());
    }

    #[test]
    fn test_validation_error_keeps_field() {
        let err: ApiError = ValidationError::Required {
            field: "phone".into(),
        }
        .into();
        assert_eq!(err.field.as_deref(), Some("phone"));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["field"], "phone");
    }

    #[test]
    fn test_db_errors_hide_details() {
        let err: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.get(Locale::En).contains("SELEC"));
    }

    #[test]
    fn test_concurrent_sync_maps_to_its_own_code() {
        let err: ApiError = SyncError::AlreadyRunning.into();
        assert_eq!(err.code, ErrorCode::SyncInProgress);
    }
}
