//! # Receipt & Report Commands
//!
//! Receipts use the selected store location for their header; without one
//! the configured store name is printed instead.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use optipos_core::receipt::Receipt;
use optipos_core::reports::{self, DailySalesSummary, MonthlySalesSummary};
use optipos_core::ValidationError;

use crate::error::{ApiError, ApiResult};
use crate::state::{ConfigState, SessionState, StoreState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintableReceipt {
    /// Structured lines for the HTML print view.
    pub receipt: Receipt,
    /// Fixed-width text for the thermal printer.
    pub text: String,
}

fn printable(mut receipt: Receipt, config: &ConfigState) -> PrintableReceipt {
    if receipt.store.is_none() {
        receipt.store = Some(config.store_name.clone());
    }
    let text = receipt.render_text(config.receipt_width);
    PrintableReceipt { receipt, text }
}

pub fn invoice_receipt(
    store: &StoreState,
    session: &SessionState,
    config: &ConfigState,
    invoice_id: &str,
) -> ApiResult<PrintableReceipt> {
    debug!(invoice_id, "invoice_receipt command");
    let snapshot = store.snapshot();
    let invoice = snapshot
        .invoice(invoice_id)
        .ok_or_else(|| ApiError::not_found("Invoice", invoice_id))?;

    // The invoice's own location wins over the current selection.
    let location = invoice
        .location_id
        .as_deref()
        .and_then(|id| snapshot.locations.get(id))
        .or_else(|| session.location(&snapshot.locations));

    Ok(printable(Receipt::for_invoice(invoice, location), config))
}

pub fn work_order_ticket(
    store: &StoreState,
    session: &SessionState,
    config: &ConfigState,
    work_order_id: &str,
) -> ApiResult<PrintableReceipt> {
    debug!(work_order_id, "work_order_ticket command");
    let snapshot = store.snapshot();
    let order = snapshot
        .work_order(work_order_id)
        .ok_or_else(|| ApiError::not_found("Work order", work_order_id))?;

    let location = order
        .location_id
        .as_deref()
        .and_then(|id| snapshot.locations.get(id))
        .or_else(|| session.location(&snapshot.locations));

    Ok(printable(Receipt::for_work_order(order, location), config))
}

// =============================================================================
// Reports
// =============================================================================

pub fn daily_report(store: &StoreState, date: NaiveDate) -> DailySalesSummary {
    let snapshot = store.snapshot();
    reports::daily_summary(date, &snapshot.invoices, &snapshot.refunds)
}

pub fn monthly_report(store: &StoreState, year: i32, month: u32) -> ApiResult<MonthlySalesSummary> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        }
        .into());
    }
    let snapshot = store.snapshot();
    Ok(reports::monthly_summary(
        year,
        month,
        &snapshot.invoices,
        &snapshot.refunds,
    ))
}

/// Every day with sales, payments or refunds, oldest first.
pub fn sales_history(store: &StoreState) -> Vec<DailySalesSummary> {
    let snapshot = store.snapshot();
    reports::daily_summaries(&snapshot.invoices, &snapshot.refunds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::invoice::{add_payment, create_invoice};
    use crate::commands::settings::upsert_location;
    use crate::commands::tests::{frame_sale, location, store};
    use chrono::{Datelike, Utc};
    use optipos_core::{Locale, Money, NewPayment};

    #[tokio::test]
    async fn test_receipt_falls_back_to_store_name() {
        let store = store().await;
        let session = SessionState::default();
        let config = ConfigState::default();
        let invoice = create_invoice(&store, &session, frame_sale(45, 20), false)
            .await
            .unwrap()
            .invoice;

        let printable = invoice_receipt(&store, &session, &config, &invoice.id).unwrap();
        assert_eq!(printable.receipt.store, Some(config.store_name.clone()));
        assert!(printable.text.contains(&invoice.invoice_number));
        assert!(printable.text.contains("25.000"));
        assert!(printable.text.lines().all(|l| l.chars().count() <= 48));
    }

    #[tokio::test]
    async fn test_receipt_uses_invoice_location() {
        let store = store().await;
        let session = SessionState::default();
        upsert_location(&store, location("hawalli", true)).await.unwrap();
        upsert_location(&store, location("salmiya", false)).await.unwrap();

        let mut draft = frame_sale(45, 0);
        draft.location_id = Some("salmiya".into());
        let invoice = create_invoice(&store, &session, draft, false)
            .await
            .unwrap()
            .invoice;

        let printable =
            invoice_receipt(&store, &session, &ConfigState::default(), &invoice.id).unwrap();
        let header = printable.receipt.store.unwrap();
        assert_eq!(header.get(Locale::En), "salmiya");
    }

    #[tokio::test]
    async fn test_ticket_for_work_order() {
        let store = store().await;
        let session = SessionState::default();
        let created = create_invoice(&store, &session, frame_sale(45, 0), true)
            .await
            .unwrap();
        let order = created.work_order.unwrap();

        let ticket =
            work_order_ticket(&store, &session, &ConfigState::default(), &order.id).unwrap();
        assert!(ticket.text.contains(&order.work_order_number));
    }

    #[tokio::test]
    async fn test_reports_count_todays_sales() {
        let store = store().await;
        let session = SessionState::default();
        let invoice = create_invoice(&store, &session, frame_sale(45, 20), false)
            .await
            .unwrap()
            .invoice;
        add_payment(&store, invoice.id, NewPayment::cash(Money::from_major(25)))
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let daily = daily_report(&store, today);
        assert_eq!(daily.totals.invoice_count, 1);
        assert_eq!(daily.totals.collected, Money::from_major(45));

        let monthly = monthly_report(&store, today.year(), today.month()).unwrap();
        assert_eq!(monthly.totals.net, Money::from_major(45));
        assert_eq!(sales_history(&store).len(), 1);

        assert!(monthly_report(&store, 2026, 13).is_err());
    }
}
