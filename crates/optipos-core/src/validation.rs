//! # Validation Module
//!
//! Form-level checks run by the command layer before it touches the
//! domain store.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Frontend form       empty fields, input masks                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: App command         THIS MODULE                              │
//! │           │                   (names, phones, amounts, reasons)         │
//! │           ▼                                                             │
//! │  Layer 3: Domain store        business rules (already refunded, …)     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite              NOT NULL / UNIQUE constraints            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The invoice assembler itself does not validate; a caller that skips
//! this module can store a negative total.

use crate::error::ValidationError;
use crate::invoice::InvoiceItem;
use crate::money::Money;

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for free-text fields (notes, reasons).
pub const MAX_TEXT_LEN: usize = 500;

/// Largest single amount a form may carry: one billion in major units.
pub const MAX_AMOUNT: Money = Money::from_major(1_000_000_000);

// =============================================================================
// String Validators
// =============================================================================

/// Validates a patient or customer name.
///
/// ```rust
/// use optipos_core::validation::validate_name;
///
/// assert!(validate_name("Fatima Al-Sabah").is_ok());
/// assert!(validate_name("   ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, 120)
}

/// Validates a phone number.
///
/// ## Rules
/// - Required
/// - Digits, spaces, `+`, `-` and parentheses only
/// - 7 to 15 digits
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, +, - and parentheses".to_string(),
        });
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must have between 7 and 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a refund or exchange reason.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    required_text("reason", reason, MAX_TEXT_LEN)
}

pub fn validate_note(note: &str) -> ValidationResult<()> {
    required_text("note", note, MAX_TEXT_LEN)
}

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Money Validators
// =============================================================================

/// Catalog prices may be zero (free services), never negative.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    validate_amount("payment amount", amount)
}

/// Refund amount must satisfy `0 < amount <= total`.
///
/// ## User Workflow
/// ```text
/// Refund dialog: amount 50.000 on a 45.000 invoice
///       │
///       ▼
/// validate_refund_amount(50.000, 45.000) ──► OutOfRange ──► toast
/// ```
pub fn validate_refund_amount(amount: Money, total: Money) -> ValidationResult<()> {
    if !amount.is_positive() || amount > total {
        return Err(ValidationError::OutOfRange {
            field: "refund amount".to_string(),
            min: 1,
            max: total.minor(),
        });
    }
    Ok(())
}

/// Discount and deposit: an amount between zero and [`MAX_AMOUNT`].
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT.minor(),
        });
    }
    Ok(())
}

/// Checks every line total of an invoice and returns their sum.
///
/// A contact-lens line whose quantity times unit price overflows is
/// reported as an out-of-range price.
pub fn validate_line_totals(items: &[InvoiceItem]) -> ValidationResult<Money> {
    let out_of_range = || ValidationError::OutOfRange {
        field: "price".to_string(),
        min: 0,
        max: MAX_AMOUNT.minor(),
    };

    let mut subtotal = Money::zero();
    for item in items {
        let line = item.checked_line_total().ok_or_else(out_of_range)?;
        validate_amount("price", line)?;
        subtotal = subtotal.checked_add(line).ok_or_else(out_of_range)?;
    }
    Ok(subtotal)
}

pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > 99 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 99,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
