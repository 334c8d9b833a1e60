//! # Invoice and Work-Order Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout form                                                          │
//! │    │ select lens type / coating / thickness                             │
//! │    ├──► price_lens()  ──► stored combination or additive sum, or none  │
//! │    ├──► lens_item()   ──► InvoiceItem::Lens with names + resolved price │
//! │    │                                                                    │
//! │    └──► create_invoice(draft, with_work_order)                          │
//! │            │  validate name / phone / amounts                           │
//! │            │  default location = session selection                      │
//! │            ▼                                                            │
//! │         Invoice (+ WorkOrder) persisted ──► add_payment / update_invoice│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info};

use optipos_core::invoice::InvoiceUpdate;
use optipos_core::validation::{
    validate_amount, validate_line_totals, validate_name, validate_payment_amount,
    validate_phone, validate_quantity,
};
use optipos_core::{
    Change, Command, Invoice, InvoiceDraft, InvoiceItem, LocalizedText, Money, NewPayment,
    ValidationError, WorkOrder, WorkOrderStatus,
};

use crate::error::{ApiError, ApiResult};
use crate::state::{SessionState, StoreState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponse {
    pub invoice: Invoice,
    pub work_order: Option<WorkOrder>,
}

fn expect_invoice(change: Change) -> ApiResult<Invoice> {
    match change {
        Change::Invoice(invoice) => Ok(invoice),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

fn expect_work_order(change: Change) -> ApiResult<WorkOrder> {
    match change {
        Change::WorkOrder(order) => Ok(order),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

// =============================================================================
// Lens Pricing
// =============================================================================

/// Price for the selected lens triple; `None` until all three are chosen.
/// Unknown ids count as not chosen.
pub fn price_lens(
    store: &StoreState,
    lens_type_id: Option<&str>,
    coating_id: Option<&str>,
    thickness_id: Option<&str>,
) -> Option<Money> {
    let snapshot = store.snapshot();
    let catalog = &snapshot.catalog;
    catalog.pricing.resolve(
        lens_type_id.and_then(|id| catalog.lens_type(id)),
        coating_id.and_then(|id| catalog.lens_coating(id)),
        thickness_id.and_then(|id| catalog.lens_thickness(id)),
    )
}

/// Builds the lens line for an invoice, snapshotting names and price.
pub fn lens_item(
    store: &StoreState,
    lens_type_id: &str,
    coating_id: &str,
    coating_color: Option<LocalizedText>,
    thickness_id: &str,
) -> ApiResult<InvoiceItem> {
    let snapshot = store.snapshot();
    let catalog = &snapshot.catalog;

    let lens_type = catalog
        .lens_type(lens_type_id)
        .ok_or_else(|| ApiError::not_found("Lens type", lens_type_id))?;
    let coating = catalog
        .lens_coating(coating_id)
        .ok_or_else(|| ApiError::not_found("Lens coating", coating_id))?;
    let thickness = catalog
        .lens_thickness(thickness_id)
        .ok_or_else(|| ApiError::not_found("Lens thickness", thickness_id))?;

    let price = catalog
        .pricing
        .resolve(Some(lens_type), Some(coating), Some(thickness))
        .unwrap_or_default();

    Ok(InvoiceItem::Lens {
        lens_type_id: lens_type.id.clone(),
        lens_type: lens_type.name.clone(),
        coating_id: coating.id.clone(),
        coating: coating.name.clone(),
        coating_color,
        thickness_id: thickness.id.clone(),
        thickness: thickness.name.clone(),
        price,
    })
}

// =============================================================================
// Invoices
// =============================================================================

fn validate_draft(draft: &InvoiceDraft) -> Result<(), ValidationError> {
    validate_name(&draft.patient_name)?;
    if !draft.patient_phone.trim().is_empty() {
        validate_phone(&draft.patient_phone)?;
    }
    if draft.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    for item in &draft.items {
        if let InvoiceItem::ContactLens { quantity, .. } = item {
            validate_quantity(*quantity)?;
        }
    }
    validate_line_totals(&draft.items)?;
    validate_amount("discount", draft.discount)?;
    validate_amount("deposit", draft.deposit)?;
    Ok(())
}

pub async fn create_invoice(
    store: &StoreState,
    session: &SessionState,
    mut draft: InvoiceDraft,
    with_work_order: bool,
) -> ApiResult<CreateInvoiceResponse> {
    debug!(items = draft.items.len(), with_work_order, "create_invoice command");
    validate_draft(&draft)?;

    if draft.location_id.is_none() {
        let snapshot = store.snapshot();
        draft.location_id = session.location(&snapshot.locations).map(|l| l.id.clone());
    }

    match store
        .execute(Command::CreateInvoice {
            draft,
            with_work_order,
        })
        .await?
    {
        Change::InvoiceCreated {
            invoice,
            work_order,
            ..
        } => {
            info!(
                invoice = %invoice.invoice_number,
                total = %invoice.total,
                remaining = %invoice.remaining,
                "Invoice created"
            );
            Ok(CreateInvoiceResponse {
                invoice,
                work_order,
            })
        }
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

pub async fn add_payment(
    store: &StoreState,
    invoice_id: String,
    payment: NewPayment,
) -> ApiResult<Invoice> {
    debug!(invoice_id = %invoice_id, amount = %payment.amount, "add_payment command");
    validate_payment_amount(payment.amount)?;

    let invoice = expect_invoice(
        store
            .execute(Command::AddPayment {
                invoice_id,
                payment,
            })
            .await?,
    )?;
    info!(
        invoice = %invoice.invoice_number,
        remaining = %invoice.remaining,
        is_paid = invoice.is_paid,
        "Payment added"
    );
    Ok(invoice)
}

pub async fn update_invoice(
    store: &StoreState,
    invoice_id: String,
    update: InvoiceUpdate,
) -> ApiResult<Invoice> {
    debug!(invoice_id = %invoice_id, "update_invoice command");
    if let Some(name) = &update.patient_name {
        validate_name(name)?;
    }
    if let Some(items) = &update.items {
        validate_line_totals(items)?;
    }
    if let Some(discount) = update.discount {
        validate_amount("discount", discount)?;
    }
    expect_invoice(
        store
            .execute(Command::UpdateInvoice { invoice_id, update })
            .await?,
    )
}

pub fn get_invoice(store: &StoreState, invoice_id: &str) -> ApiResult<Invoice> {
    store
        .snapshot()
        .invoice(invoice_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Invoice", invoice_id))
}

pub fn find_invoice_by_number(store: &StoreState, number: &str) -> Option<Invoice> {
    store.snapshot().invoice_by_number(number.trim()).cloned()
}

/// Newest first.
pub fn list_invoices(store: &StoreState) -> Vec<Invoice> {
    let mut invoices = store.snapshot().invoices.clone();
    invoices.reverse();
    invoices
}

// =============================================================================
// Work Orders
// =============================================================================

pub async fn create_work_order(store: &StoreState, invoice_id: String) -> ApiResult<WorkOrder> {
    debug!(invoice_id = %invoice_id, "create_work_order command");
    let order = expect_work_order(store.execute(Command::CreateWorkOrder { invoice_id }).await?)?;
    info!(work_order = %order.work_order_number, "Work order created");
    Ok(order)
}

/// Any status may follow any other.
pub async fn set_work_order_status(
    store: &StoreState,
    work_order_id: String,
    status: WorkOrderStatus,
) -> ApiResult<WorkOrder> {
    debug!(work_order_id = %work_order_id, %status, "set_work_order_status command");
    expect_work_order(
        store
            .execute(Command::SetWorkOrderStatus {
                work_order_id,
                status,
            })
            .await?,
    )
}

pub fn get_work_order(store: &StoreState, work_order_id: &str) -> ApiResult<WorkOrder> {
    store
        .snapshot()
        .work_order(work_order_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Work order", work_order_id))
}

pub fn list_work_orders(store: &StoreState, status: Option<WorkOrderStatus>) -> Vec<WorkOrder> {
    store
        .snapshot()
        .work_orders
        .iter()
        .filter(|w| status.map_or(true, |s| w.status == s))
        .cloned()
        .collect()
}
