//! # Refunds & Exchanges
//!
//! Records a money-back refund or a product exchange against an existing
//! invoice.
//!
//! ## Refund
//! ```text
//! process_refund(invoice, amount, reason)
//!   ├── invoice.is_refunded / is_exchanged?  ──► AlreadyRefunded / AlreadyExchanged
//!   ├── reason blank?                        ──► Validation(Required "reason")
//!   ├── amount <= 0 or amount > total?       ──► InvalidRefundAmount
//!   └── ok ──► RefundExchange { kind: Refund } linked, is_refunded = true
//! ```
//!
//! ## Exchange State Machine
//! ```text
//!   ┌───────────┐  begin_replacement   ┌──────────────────────┐  complete   ┌───────────┐
//!   │ Initiated │ ───────────────────► │ AwaitingReplacement  │ ──────────► │ Completed │
//!   └───────────┘                      └──────────────────────┘             └───────────┘
//!        ▲
//!        └── process_exchange(invoice, None, reason)
//!            returns NavigationCommand → CreateInvoice { exchange_for }
//! ```
//! A replacement id supplied up front walks all three states in one call.
//! Every other move is an `InvalidExchangeTransition`.
//!
//! All checks run before any field is written, so a rejected request
//! leaves the invoice untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::invoice::Invoice;
use crate::money::Money;
use crate::navigation::{NavigationCommand, Route};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RefundExchangeKind {
    Refund,
    Exchange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeState {
    Initiated,
    AwaitingReplacement,
    Completed,
}

impl ExchangeState {
    pub fn can_transition_to(&self, next: ExchangeState) -> bool {
        matches!(
            (self, next),
            (ExchangeState::Initiated, ExchangeState::AwaitingReplacement)
                | (ExchangeState::AwaitingReplacement, ExchangeState::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeState::Initiated => "initiated",
            ExchangeState::AwaitingReplacement => "awaiting_replacement",
            ExchangeState::Completed => "completed",
        }
    }
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeTransition {
    pub state: ExchangeState,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
}

/// Where an exchange stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeProgress {
    pub state: ExchangeState,
    pub replacement_invoice_id: Option<String>,
    pub transitions: Vec<ExchangeTransition>,
}

/// A refund or exchange against an invoice. Never itself refundable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RefundExchange {
    pub id: String,
    pub refund_number: String,
    pub kind: RefundExchangeKind,
    pub original_invoice_id: String,
    /// Refunded amount, or the credit carried into the replacement sale.
    pub amount: Money,
    pub reason: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub exchange: Option<ExchangeProgress>,
}

impl RefundExchange {
    pub fn exchange_state(&self) -> Option<ExchangeState> {
        self.exchange.as_ref().map(|e| e.state)
    }
}

/// Result of starting an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeOutcome {
    pub record: RefundExchange,
    /// Where the cashier goes next; `None` once the exchange is complete.
    pub next: Option<NavigationCommand>,
}

// =============================================================================
// Refund
// =============================================================================

/// Refunds part or all of an invoice.
pub fn process_refund(
    invoice: &mut Invoice,
    amount: Money,
    reason: &str,
    refund_number: String,
    now: DateTime<Utc>,
) -> CoreResult<RefundExchange> {
    ensure_open(invoice)?;
    let reason = require_reason(reason)?;

    if !amount.is_positive() || amount > invoice.total {
        return Err(CoreError::InvalidRefundAmount {
            amount,
            total: invoice.total,
        });
    }

    let record = RefundExchange {
        id: Uuid::new_v4().to_string(),
        refund_number,
        kind: RefundExchangeKind::Refund,
        original_invoice_id: invoice.id.clone(),
        amount,
        reason,
        date: now,
        exchange: None,
    };

    invoice.is_refunded = true;
    invoice.refund_exchange = Some(record.clone());

    info!(
        invoice = %invoice.invoice_number,
        refund = %record.refund_number,
        amount = %amount,
        "Invoice refunded"
    );
    Ok(record)
}

// =============================================================================
// Exchange
// =============================================================================

/// Starts an exchange.
///
/// Without a replacement the exchange stays `Initiated` and the outcome
/// carries the command that opens invoice creation for the replacement.
pub fn process_exchange(
    invoice: &mut Invoice,
    replacement_invoice_id: Option<String>,
    reason: &str,
    refund_number: String,
    now: DateTime<Utc>,
) -> CoreResult<ExchangeOutcome> {
    ensure_open(invoice)?;
    let reason = require_reason(reason)?;

    let mut record = RefundExchange {
        id: Uuid::new_v4().to_string(),
        refund_number,
        kind: RefundExchangeKind::Exchange,
        original_invoice_id: invoice.id.clone(),
        amount: invoice.total,
        reason,
        date: now,
        exchange: Some(ExchangeProgress {
            state: ExchangeState::Initiated,
            replacement_invoice_id: None,
            transitions: vec![ExchangeTransition {
                state: ExchangeState::Initiated,
                at: now,
            }],
        }),
    };

    let next = match replacement_invoice_id {
        Some(replacement) => {
            advance(&mut record, ExchangeState::AwaitingReplacement, None, now)?;
            advance(&mut record, ExchangeState::Completed, Some(replacement), now)?;
            None
        }
        None => Some(NavigationCommand::Navigate(Route::CreateInvoice {
            patient_id: invoice.patient_id.clone(),
            exchange_for: Some(invoice.id.clone()),
        })),
    };

    invoice.is_exchanged = true;
    invoice.refund_exchange = Some(record.clone());

    info!(
        invoice = %invoice.invoice_number,
        state = %record.exchange_state().map(|s| s.as_str()).unwrap_or_default(),
        "Exchange started"
    );
    Ok(ExchangeOutcome { record, next })
}

/// Moves an initiated exchange to `AwaitingReplacement` once the
/// replacement sale is being built.
pub fn begin_replacement(invoice: &mut Invoice, now: DateTime<Utc>) -> CoreResult<RefundExchange> {
    transition(invoice, ExchangeState::AwaitingReplacement, None, now)
}

/// Attaches the replacement invoice and completes the exchange.
pub fn complete_exchange(
    invoice: &mut Invoice,
    replacement_invoice_id: String,
    now: DateTime<Utc>,
) -> CoreResult<RefundExchange> {
    transition(
        invoice,
        ExchangeState::Completed,
        Some(replacement_invoice_id),
        now,
    )
}

fn transition(
    invoice: &mut Invoice,
    next: ExchangeState,
    replacement_invoice_id: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<RefundExchange> {
    let mut record = match &invoice.refund_exchange {
        Some(record) if record.kind == RefundExchangeKind::Exchange => record.clone(),
        _ => {
            return Err(CoreError::InvalidExchangeTransition {
                invoice_id: invoice.id.clone(),
                from: "none".to_string(),
                to: next.to_string(),
            })
        }
    };

    advance(&mut record, next, replacement_invoice_id, now)?;
    invoice.refund_exchange = Some(record.clone());

    debug!(invoice = %invoice.invoice_number, state = %next, "Exchange advanced");
    Ok(record)
}

fn advance(
    record: &mut RefundExchange,
    next: ExchangeState,
    replacement_invoice_id: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let invalid = |from: String| CoreError::InvalidExchangeTransition {
        invoice_id: record.original_invoice_id.clone(),
        from,
        to: next.to_string(),
    };

    let progress = match record.exchange.as_ref() {
        Some(progress) if progress.state.can_transition_to(next) => progress.clone(),
        Some(progress) => return Err(invalid(progress.state.to_string())),
        None => return Err(invalid("none".to_string())),
    };

    let mut progress = progress;
    progress.state = next;
    if replacement_invoice_id.is_some() {
        progress.replacement_invoice_id = replacement_invoice_id;
    }
    progress.transitions.push(ExchangeTransition { state: next, at: now });
    record.exchange = Some(progress);
    Ok(())
}

// =============================================================================
// Shared Checks
// =============================================================================

fn ensure_open(invoice: &Invoice) -> CoreResult<()> {
    if invoice.is_refunded {
        return Err(CoreError::AlreadyRefunded(invoice.id.clone()));
    }
    if invoice.is_exchanged {
        return Err(CoreError::AlreadyExchanged(invoice.id.clone()));
    }
    Ok(())
}

fn require_reason(reason: &str) -> CoreResult<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        }
        .into());
    }
    Ok(reason.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::tests::draft;

    fn invoice() -> Invoice {
        Invoice::create(draft(45, 20), "INV-20261019-0001".into(), Utc::now())
    }

    #[test]
    fn test_partial_refund_links_record() {
        let mut inv = invoice();
        let record = process_refund(
            &mut inv,
            Money::from_major(10),
            "Scratched lens",
            "RF-1".into(),
            Utc::now(),
        )
        .unwrap();

        assert!(inv.is_refunded);
        assert_eq!(inv.refund_exchange.as_ref(), Some(&record));
        assert!(record.amount <= inv.total);
        assert_eq!(record.original_invoice_id, inv.id);
    }

    #[test]
    fn test_full_refund_allowed() {
        let mut inv = invoice();
        let total = inv.total;
        assert!(process_refund(&mut inv, total, "Changed mind", "RF-1".into(), Utc::now()).is_ok());
    }

    #[test]
    fn test_refund_amount_bounds() {
        for minor in [0, -1_000, 45_001] {
            let mut inv = invoice();
            let err = process_refund(
                &mut inv,
                Money::from_minor(minor),
                "reason",
                "RF-1".into(),
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(err, CoreError::InvalidRefundAmount { .. }));
            assert!(!inv.is_refunded);
            assert!(inv.refund_exchange.is_none());
        }
    }

    #[test]
    fn test_refund_requires_reason() {
        let mut inv = invoice();
        let err = process_refund(&mut inv, Money::from_major(5), "   ", "RF-1".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));
        assert!(!inv.is_refunded);
    }

    #[test]
    fn test_refund_twice_rejected() {
        let mut inv = invoice();
        process_refund(&mut inv, Money::from_major(5), "first", "RF-1".into(), Utc::now()).unwrap();
        let err = process_refund(&mut inv, Money::from_major(5), "again", "RF-2".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRefunded(_)));
    }

    #[test]
    fn test_exchange_two_phase_workflow() {
        let mut inv = invoice();
        let outcome =
            process_exchange(&mut inv, None, "Wrong size", "RF-1".into(), Utc::now()).unwrap();

        assert!(inv.is_exchanged);
        assert_eq!(outcome.record.exchange_state(), Some(ExchangeState::Initiated));
        assert_eq!(
            outcome.next,
            Some(NavigationCommand::Navigate(Route::CreateInvoice {
                patient_id: None,
                exchange_for: Some(inv.id.clone()),
            }))
        );

        // Completing straight from Initiated skips a state.
        let err = complete_exchange(&mut inv, "new-id".into(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidExchangeTransition { .. }));

        begin_replacement(&mut inv, Utc::now()).unwrap();
        let record = complete_exchange(&mut inv, "new-id".into(), Utc::now()).unwrap();

        let progress = record.exchange.unwrap();
        assert_eq!(progress.state, ExchangeState::Completed);
        assert_eq!(progress.replacement_invoice_id.as_deref(), Some("new-id"));
        assert_eq!(progress.transitions.len(), 3);

        let err = begin_replacement(&mut inv, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidExchangeTransition { .. }));
    }

    #[test]
    fn test_exchange_with_replacement_completes_immediately() {
        let mut inv = invoice();
        let outcome = process_exchange(
            &mut inv,
            Some("replacement".into()),
            "Upgrade",
            "RF-1".into(),
            Utc::now(),
        )
        .unwrap();

        assert!(outcome.next.is_none());
        assert_eq!(outcome.record.exchange_state(), Some(ExchangeState::Completed));
    }

    #[test]
    fn test_refund_after_exchange_rejected() {
        let mut inv = invoice();
        process_exchange(&mut inv, None, "Wrong size", "RF-1".into(), Utc::now()).unwrap();
        let err = process_refund(&mut inv, Money::from_major(5), "x", "RF-2".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExchanged(_)));
    }

    #[test]
    fn test_transition_on_refund_rejected() {
        let mut inv = invoice();
        process_refund(&mut inv, Money::from_major(5), "x", "RF-1".into(), Utc::now()).unwrap();
        assert!(begin_replacement(&mut inv, Utc::now()).is_err());
    }
}
