//! # Refund & Exchange Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  process_refund(amount, reason)                                         │
//! │     0 < amount ≤ total, reason required ──► invoice.is_refunded         │
//! │                                                                         │
//! │  process_exchange(reason, replacement?)                                 │
//! │     with replacement ──► Completed                                      │
//! │     without          ──► Initiated ──► navigate to CreateInvoice        │
//! │                              │           (exchange_for = original)      │
//! │                              ▼                                          │
//! │                     AwaitingReplacement ──► Completed                   │
//! │                     (begin_replacement)     (complete_exchange or the   │
//! │                                              replacement invoice save)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An invoice takes at most one refund or exchange.

use serde::Serialize;
use tracing::{debug, info};

use optipos_core::navigation::Route;
use optipos_core::validation::{validate_reason, validate_refund_amount};
use optipos_core::{Change, Command, Invoice, Money, RefundExchange};

use crate::error::{ApiError, ApiResult};
use crate::state::{SessionState, StoreState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundExchangeResponse {
    pub invoice: Invoice,
    pub record: RefundExchange,
    /// Route the UI moved to, when the operation navigates.
    pub route: Option<Route>,
}

fn expect_record(change: Change) -> ApiResult<(Invoice, RefundExchange)> {
    match change {
        Change::RefundExchange {
            invoice, record, ..
        } => Ok((invoice, record)),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

pub async fn process_refund(
    store: &StoreState,
    invoice_id: String,
    amount: Money,
    reason: String,
) -> ApiResult<RefundExchangeResponse> {
    debug!(invoice_id = %invoice_id, amount = %amount, "process_refund command");
    validate_reason(&reason)?;

    let total = store
        .snapshot()
        .invoice(&invoice_id)
        .map(|i| i.total)
        .ok_or_else(|| ApiError::not_found("Invoice", &invoice_id))?;
    validate_refund_amount(amount, total)?;

    let change = store
        .execute(Command::ProcessRefund {
            invoice_id,
            amount,
            reason,
        })
        .await?;
    let (invoice, record) = expect_record(change)?;
    info!(refund = %record.refund_number, "Refund recorded");

    Ok(RefundExchangeResponse {
        invoice,
        record,
        route: None,
    })
}

/// Starts an exchange. Without a replacement the session moves to invoice
/// creation for the same patient.
pub async fn process_exchange(
    store: &StoreState,
    session: &SessionState,
    invoice_id: String,
    replacement_invoice_id: Option<String>,
    reason: String,
) -> ApiResult<RefundExchangeResponse> {
    debug!(invoice_id = %invoice_id, "process_exchange command");
    validate_reason(&reason)?;

    let change = store
        .execute(Command::ProcessExchange {
            invoice_id,
            replacement_invoice_id,
            reason,
        })
        .await?;

    let (invoice, record, next) = match change {
        Change::RefundExchange {
            invoice,
            record,
            next,
        } => (invoice, record, next),
        other => return Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    };
    let route = next.map(|command| session.navigate(command));

    info!(
        exchange = %record.refund_number,
        state = ?record.exchange_state(),
        "Exchange recorded"
    );
    Ok(RefundExchangeResponse {
        invoice,
        record,
        route,
    })
}

pub async fn begin_replacement(
    store: &StoreState,
    invoice_id: String,
) -> ApiResult<RefundExchangeResponse> {
    debug!(invoice_id = %invoice_id, "begin_replacement command");
    let (invoice, record) =
        expect_record(store.execute(Command::BeginReplacement { invoice_id }).await?)?;
    Ok(RefundExchangeResponse {
        invoice,
        record,
        route: None,
    })
}

pub async fn complete_exchange(
    store: &StoreState,
    invoice_id: String,
    replacement_invoice_id: String,
) -> ApiResult<RefundExchangeResponse> {
    debug!(
        invoice_id = %invoice_id,
        replacement = %replacement_invoice_id,
        "complete_exchange command"
    );
    let (invoice, record) = expect_record(
        store
            .execute(Command::CompleteExchange {
                invoice_id,
                replacement_invoice_id,
            })
            .await?,
    )?;
    Ok(RefundExchangeResponse {
        invoice,
        record,
        route: None,
    })
}

/// Newest first.
pub fn list_refunds(store: &StoreState) -> Vec<RefundExchange> {
    let mut refunds = store.snapshot().refunds.clone();
    refunds.reverse();
    refunds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::invoice::create_invoice;
    use crate::commands::tests::{frame_sale, store};
    use crate::error::ErrorCode;
    use optipos_core::navigation::Section;
    use optipos_core::ExchangeState;

    async fn sale(store: &StoreState) -> Invoice {
        create_invoice(store, &SessionState::default(), frame_sale(45, 0), false)
            .await
            .unwrap()
            .invoice
    }

    #[tokio::test]
    async fn test_refund_over_total_rejected() {
        let store = store().await;
        let invoice = sale(&store).await;

        let err = process_refund(&store, invoice.id.clone(), Money::from_major(50), "Broken".into())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("refund amount"));
        assert!(!store.snapshot().invoice(&invoice.id).unwrap().is_refunded);
    }

    #[tokio::test]
    async fn test_refund_requires_reason() {
        let store = store().await;
        let invoice = sale(&store).await;

        let err = process_refund(&store, invoice.id, Money::from_major(10), "  ".into())
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("reason"));
    }

    #[tokio::test]
    async fn test_second_refund_rejected() {
        let store = store().await;
        let invoice = sale(&store).await;

        let refunded = process_refund(
            &store,
            invoice.id.clone(),
            Money::from_major(45),
            "Lens defect".into(),
        )
        .await
        .unwrap();
        assert!(refunded.invoice.is_refunded);
        assert_eq!(list_refunds(&store).len(), 1);

        let err = process_refund(&store, invoice.id, Money::from_major(5), "Again".into())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_exchange_without_replacement_navigates_to_new_invoice() {
        let store = store().await;
        let session = SessionState::default();
        let invoice = sale(&store).await;

        let response = process_exchange(
            &store,
            &session,
            invoice.id.clone(),
            None,
            "Wrong size".into(),
        )
        .await
        .unwrap();
        assert!(response.invoice.is_exchanged);
        assert_eq!(response.record.exchange_state(), Some(ExchangeState::Initiated));
        assert_eq!(session.route().section(), Section::CreateInvoice);
        assert!(matches!(
            response.route,
            Some(Route::CreateInvoice { exchange_for: Some(ref id), .. }) if *id == invoice.id
        ));

        begin_replacement(&store, invoice.id.clone()).await.unwrap();

        let mut replacement_draft = frame_sale(50, 0);
        replacement_draft.replaces_invoice_id = Some(invoice.id.clone());
        let created = create_invoice(&store, &session, replacement_draft, false)
            .await
            .unwrap();

        let original = store.snapshot().invoice(&invoice.id).cloned().unwrap();
        let record = original.refund_exchange.unwrap();
        assert_eq!(record.exchange_state(), Some(ExchangeState::Completed));
        assert_eq!(
            record.exchange.and_then(|e| e.replacement_invoice_id),
            Some(created.invoice.id)
        );
    }

    #[tokio::test]
    async fn test_complete_before_begin_rejected() {
        let store = store().await;
        let session = SessionState::default();
        let invoice = sale(&store).await;
        let other = sale(&store).await;

        process_exchange(&store, &session, invoice.id.clone(), None, "Color".into())
            .await
            .unwrap();
        let err = complete_exchange(&store, invoice.id, other.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }
}
