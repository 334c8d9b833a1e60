//! # Error Types
//!
//! Domain-specific error types for optipos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  optipos-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations, missing entities     │
//! │  └── ValidationError  - Form input failures                            │
//! │                                                                         │
//! │  optipos-db    └── DbError    - Local storage failures                 │
//! │  optipos-sync  └── SyncError  - Remote backend failures                │
//! │  optipos-app   └── ApiError   - Bilingual message shown as a toast     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → toast                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Work order not found: {0}")]
    WorkOrderNotFound(String),

    #[error("{kind} not found: {id}")]
    CatalogItemNotFound { kind: String, id: String },

    #[error("Store location not found: {0}")]
    LocationNotFound(String),

    /// The invoice already carries a refund record.
    ///
    /// ## User Workflow
    /// ```text
    /// Refund button ──► invoice.is_refunded? ──► yes ──► AlreadyRefunded
    ///                                        └─► no  ──► amount checks
    /// ```
    #[error("Invoice {0} has already been refunded")]
    AlreadyRefunded(String),

    #[error("Invoice {0} has already been exchanged")]
    AlreadyExchanged(String),

    /// Refund amount outside `0 < amount <= total`.
    #[error("Refund amount {amount} must be greater than zero and at most {total}")]
    InvalidRefundAmount { amount: Money, total: Money },

    /// The exchange workflow was asked to move between two states that are
    /// not adjacent.
    #[error("Exchange for invoice {invoice_id} cannot move from {from} to {to}")]
    InvalidExchangeTransition {
        invoice_id: String,
        from: String,
        to: String,
    },

    /// A pricing combination already exists for the same lens triple.
    #[error("A price already exists for lens {lens_type_id} / coating {coating_id} / thickness {thickness_id}")]
    DuplicatePricingCombination {
        lens_type_id: String,
        coating_id: String,
        thickness_id: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors raised by the form layer.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Name of the offending form field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidRefundAmount {
            amount: Money::from_major(50),
            total: Money::from_major(45),
        };
        assert_eq!(
            err.to_string(),
            "Refund amount 50.000 must be greater than zero and at most 45.000"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "reason".to_string(),
        };
        assert_eq!(err.to_string(), "reason is required");
        assert_eq!(err.field(), "reason");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
