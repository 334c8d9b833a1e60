//! # Invoices
//!
//! Assembles a sale into an [`Invoice`] and keeps its balance in step with
//! the payments made against it.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InvoiceDraft ──create()──► Invoice ──add_payment()──► Invoice          │
//! │   items, discount,            │                          │              │
//! │   deposit                     │ update()                 │ refund /     │
//! │                               ▼                          ▼ exchange     │
//! │                       edit_history += entry      refund_exchange = …    │
//! │                                                                         │
//! │  Balances (always recomputed, never stored independently):             │
//! │    subtotal  = Σ line totals                                           │
//! │    total     = subtotal - discount                                     │
//! │    remaining = total - Σ payments                                      │
//! │    is_paid   = remaining <= 0                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The deposit taken at checkout is recorded as the first payment, so
//! `remaining == total - deposit` at creation and
//! `remaining == total - Σ payments` afterwards are the same rule.
//!
//! No field validation happens here: a negative total is accepted and
//! shows up as already paid. The command layer validates form input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::locale::{LocalizedText, Locale};
use crate::money::Money;
use crate::patient::RxData;
use crate::refund::RefundExchange;

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    /// Local debit network; carries an approval number.
    Knet,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn label(&self) -> LocalizedText {
        match self {
            PaymentMethod::Cash => LocalizedText::bilingual("Cash", "نقداً"),
            PaymentMethod::Knet => LocalizedText::bilingual("KNET", "كي نت"),
            PaymentMethod::Card => LocalizedText::bilingual("Card", "بطاقة"),
            PaymentMethod::BankTransfer => LocalizedText::bilingual("Bank transfer", "تحويل بنكي"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub approval_number: Option<String>,
}

/// Payment form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount: Money,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub approval_number: Option<String>,
}

impl NewPayment {
    pub fn cash(amount: Money) -> Self {
        NewPayment {
            amount,
            method: PaymentMethod::Cash,
            approval_number: None,
        }
    }

    fn into_payment(self, now: DateTime<Utc>) -> Payment {
        Payment {
            id: Uuid::new_v4().to_string(),
            amount: self.amount,
            method: self.method,
            date: now,
            approval_number: self.approval_number.filter(|n| !n.trim().is_empty()),
        }
    }
}

/// One entry of an invoice's edit history; drives the "Edited" badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EditEntry {
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub notes: String,
}

// =============================================================================
// Invoice Items
// =============================================================================

/// A line on the invoice. Names and prices are snapshots taken at sale
/// time; later catalog edits do not change old invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvoiceItem {
    #[serde(rename_all = "camelCase")]
    Frame {
        frame_id: Option<String>,
        brand: String,
        model: String,
        color: LocalizedText,
        size: String,
        price: Money,
    },
    /// A pair of spectacle lenses priced by the pricing table.
    #[serde(rename_all = "camelCase")]
    Lens {
        lens_type_id: String,
        lens_type: LocalizedText,
        coating_id: String,
        coating: LocalizedText,
        coating_color: Option<LocalizedText>,
        thickness_id: String,
        thickness: LocalizedText,
        price: Money,
    },
    #[serde(rename_all = "camelCase")]
    ContactLens {
        contact_lens_id: Option<String>,
        description: String,
        quantity: i64,
        unit_price: Money,
    },
    #[serde(rename_all = "camelCase")]
    Service {
        service_id: Option<String>,
        name: LocalizedText,
        price: Money,
    },
    Other {
        description: LocalizedText,
        price: Money,
    },
}

impl InvoiceItem {
    pub fn line_total(&self) -> Money {
        match self {
            InvoiceItem::Frame { price, .. }
            | InvoiceItem::Lens { price, .. }
            | InvoiceItem::Service { price, .. }
            | InvoiceItem::Other { price, .. } => *price,
            InvoiceItem::ContactLens {
                quantity,
                unit_price,
                ..
            } => unit_price.multiply_quantity(*quantity),
        }
    }

    /// Line total, or `None` when quantity times unit price overflows.
    pub fn checked_line_total(&self) -> Option<Money> {
        match self {
            InvoiceItem::ContactLens {
                quantity,
                unit_price,
                ..
            } => unit_price.checked_multiply_quantity(*quantity),
            other => Some(other.line_total()),
        }
    }

    /// Translation key of the line's label.
    pub fn label_key(&self) -> &'static str {
        match self {
            InvoiceItem::Frame { .. } => "receipt.frame",
            InvoiceItem::Lens { .. } => "receipt.lens",
            InvoiceItem::ContactLens { .. } => "receipt.contact_lens",
            InvoiceItem::Service { .. } => "receipt.service",
            InvoiceItem::Other { .. } => "receipt.other",
        }
    }

    pub fn describe(&self, locale: Locale) -> String {
        match self {
            InvoiceItem::Frame {
                brand,
                model,
                color,
                size,
                ..
            } => format!("{} {} {} {}", brand, model, color.get(locale), size),
            InvoiceItem::Lens {
                lens_type,
                coating,
                coating_color,
                thickness,
                ..
            } => {
                let mut text = format!(
                    "{} / {} / {}",
                    lens_type.get(locale),
                    coating.get(locale),
                    thickness.get(locale)
                );
                if let Some(color) = coating_color {
                    text.push_str(&format!(" ({})", color.get(locale)));
                }
                text
            }
            InvoiceItem::ContactLens {
                description,
                quantity,
                ..
            } => format!("{} x{}", description, quantity),
            InvoiceItem::Service { name, .. } => name.get(locale).to_string(),
            InvoiceItem::Other { description, .. } => description.get(locale).to_string(),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub deposit: Money,
    #[serde(default)]
    pub deposit_method: PaymentMethod,
    #[serde(default)]
    pub deposit_approval_number: Option<String>,
    #[serde(default)]
    pub rx: Option<RxData>,
    #[serde(default)]
    pub location_id: Option<String>,
    /// Set when this sale is the replacement in an exchange.
    #[serde(default)]
    pub replaces_invoice_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    pub items: Vec<InvoiceItem>,
    pub rx: Option<RxData>,
    pub location_id: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub deposit: Money,
    pub remaining: Money,
    pub is_paid: bool,
    pub payments: Vec<Payment>,
    pub edit_history: Vec<EditEntry>,
    pub is_refunded: bool,
    pub is_exchanged: bool,
    pub refund_exchange: Option<RefundExchange>,
    pub replaces_invoice_id: Option<String>,
    pub work_order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Fields an edit may change. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUpdate {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub items: Option<Vec<InvoiceItem>>,
    pub discount: Option<Money>,
    pub rx: Option<RxData>,
    pub location_id: Option<String>,
    /// Free-text reason shown in the edit history.
    pub notes: Option<String>,
}

impl Invoice {
    /// Builds the invoice from the checkout form.
    pub fn create(draft: InvoiceDraft, invoice_number: String, now: DateTime<Utc>) -> Self {
        let mut invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            patient_id: draft.patient_id,
            patient_name: draft.patient_name,
            patient_phone: draft.patient_phone,
            items: draft.items,
            rx: draft.rx,
            location_id: draft.location_id,
            subtotal: Money::zero(),
            discount: draft.discount,
            total: Money::zero(),
            deposit: draft.deposit,
            remaining: Money::zero(),
            is_paid: false,
            payments: Vec::new(),
            edit_history: Vec::new(),
            is_refunded: false,
            is_exchanged: false,
            refund_exchange: None,
            replaces_invoice_id: draft.replaces_invoice_id,
            work_order_id: None,
            created_at: now,
        };

        if !draft.deposit.is_zero() {
            invoice.payments.push(
                NewPayment {
                    amount: draft.deposit,
                    method: draft.deposit_method,
                    approval_number: draft.deposit_approval_number,
                }
                .into_payment(now),
            );
        }

        invoice.recalculate();
        invoice
    }

    /// Appends a payment and recomputes the balance.
    pub fn add_payment(&mut self, payment: NewPayment, now: DateTime<Utc>) -> &Payment {
        self.payments.push(payment.into_payment(now));
        self.recalculate();
        &self.payments[self.payments.len() - 1]
    }

    /// Merges `update` into the invoice.
    ///
    /// Returns `true` when a customer-visible field changed; only then is an
    /// edit-history entry appended.
    pub fn apply_update(&mut self, update: InvoiceUpdate, now: DateTime<Utc>) -> bool {
        let mut changed = Vec::new();

        if let Some(name) = update.patient_name.filter(|n| *n != self.patient_name) {
            self.patient_name = name;
            changed.push("customer");
        }
        if let Some(phone) = update.patient_phone.filter(|p| *p != self.patient_phone) {
            self.patient_phone = phone;
            changed.push("phone");
        }
        if let Some(items) = update.items.filter(|i| *i != self.items) {
            self.items = items;
            changed.push("items");
        }
        if let Some(discount) = update.discount.filter(|d| *d != self.discount) {
            self.discount = discount;
            changed.push("discount");
        }
        if let Some(rx) = update.rx.filter(|rx| Some(rx) != self.rx.as_ref()) {
            self.rx = Some(rx);
            changed.push("prescription");
        }
        if let Some(location_id) = update
            .location_id
            .filter(|l| Some(l) != self.location_id.as_ref())
        {
            self.location_id = Some(location_id);
        }

        self.recalculate();

        if changed.is_empty() {
            return false;
        }

        let notes = update
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Updated {}", changed.join(", ")));
        self.edit_history.push(EditEntry {
            timestamp: now,
            notes,
        });
        true
    }

    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn is_edited(&self) -> bool {
        !self.edit_history.is_empty()
    }

    /// Lens line, if the sale includes spectacle lenses.
    pub fn lens_item(&self) -> Option<&InvoiceItem> {
        self.items
            .iter()
            .find(|item| matches!(item, InvoiceItem::Lens { .. }))
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().map(InvoiceItem::line_total).sum();
        self.total = self.subtotal - self.discount;
        self.remaining = self.total - self.total_paid();
        self.is_paid = self.remaining <= Money::zero();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn frame_item(major: i64) -> InvoiceItem {
        InvoiceItem::Frame {
            frame_id: Some("f-1".into()),
            brand: "Ray-Ban".into(),
            model: "RB5154".into(),
            color: LocalizedText::bilingual("Brown", "بني"),
            size: "51-21-145".into(),
            price: Money::from_major(major),
        }
    }

    pub(crate) fn draft(total_major: i64, deposit_major: i64) -> InvoiceDraft {
        InvoiceDraft {
            patient_name: "Fatima".into(),
            patient_phone: "55551234".into(),
            items: vec![frame_item(total_major)],
            deposit: Money::from_major(deposit_major),
            ..Default::default()
        }
    }

    #[test]
    fn test_deposit_then_final_payment() {
        let now = Utc::now();
        let mut invoice = Invoice::create(draft(45, 20), "INV-20261019-0001".into(), now);

        assert_eq!(invoice.total, Money::from_major(45));
        assert_eq!(invoice.remaining, Money::from_major(25));
        assert_eq!(invoice.remaining.to_string(), "25.000");
        assert!(!invoice.is_paid);

        invoice.add_payment(NewPayment::cash(Money::from_major(25)), now);

        assert_eq!(invoice.remaining, Money::zero());
        assert_eq!(invoice.remaining.to_string(), "0.000");
        assert!(invoice.is_paid);
    }

    #[test]
    fn test_remaining_tracks_every_payment() {
        let now = Utc::now();
        let mut invoice = Invoice::create(draft(100, 0), "INV-1".into(), now);
        assert!(invoice.payments.is_empty());
        assert_eq!(invoice.remaining, invoice.total);

        for minor in [10_250, 30_000, 5_750, 60_000] {
            invoice.add_payment(NewPayment::cash(Money::from_minor(minor)), now);
            let paid: Money = invoice.payments.iter().map(|p| p.amount).sum();
            assert_eq!(invoice.remaining, invoice.total - paid);
            assert_eq!(invoice.is_paid, invoice.remaining <= Money::zero());
        }

        assert_eq!(invoice.payments.len(), 4);
        assert_eq!(invoice.remaining, Money::from_minor(-6_000));
        assert!(invoice.is_paid);
    }

    #[test]
    fn test_totals_with_mixed_lines_and_discount() {
        let now = Utc::now();
        let draft = InvoiceDraft {
            items: vec![
                frame_item(30),
                InvoiceItem::ContactLens {
                    contact_lens_id: None,
                    description: "Acuvue Oasys".into(),
                    quantity: 2,
                    unit_price: Money::from_minor(8_500),
                },
                InvoiceItem::Service {
                    service_id: None,
                    name: LocalizedText::bilingual("Eye exam", "فحص النظر"),
                    price: Money::from_major(5),
                },
            ],
            discount: Money::from_major(2),
            ..Default::default()
        };
        let invoice = Invoice::create(draft, "INV-1".into(), now);

        assert_eq!(invoice.subtotal, Money::from_major(52));
        assert_eq!(invoice.total, Money::from_major(50));
        assert!(!invoice.is_paid);
    }

    #[test]
    fn test_negative_total_is_accepted() {
        let now = Utc::now();
        let mut d = draft(10, 0);
        d.discount = Money::from_major(15);
        let invoice = Invoice::create(d, "INV-1".into(), now);

        assert_eq!(invoice.total, Money::from_major(-5));
        assert!(invoice.is_paid);
    }

    #[test]
    fn test_edit_appends_history_only_on_change() {
        let now = Utc::now();
        let mut invoice = Invoice::create(draft(45, 20), "INV-1".into(), now);

        let unchanged = invoice.apply_update(
            InvoiceUpdate {
                patient_name: Some("Fatima".into()),
                ..Default::default()
            },
            now,
        );
        assert!(!unchanged);
        assert!(!invoice.is_edited());

        let changed = invoice.apply_update(
            InvoiceUpdate {
                discount: Some(Money::from_major(5)),
                notes: Some("Loyalty discount".into()),
                ..Default::default()
            },
            now,
        );
        assert!(changed);
        assert_eq!(invoice.edit_history.len(), 1);
        assert_eq!(invoice.edit_history[0].notes, "Loyalty discount");
        assert_eq!(invoice.total, Money::from_major(40));
        assert_eq!(invoice.remaining, Money::from_major(20));
        assert_eq!(invoice.payments.len(), 1);
    }

    #[test]
    fn test_edit_without_notes_lists_changed_fields() {
        let now = Utc::now();
        let mut invoice = Invoice::create(draft(45, 0), "INV-1".into(), now);
        invoice.apply_update(
            InvoiceUpdate {
                patient_phone: Some("99990000".into()),
                items: Some(vec![frame_item(50)]),
                ..Default::default()
            },
            now,
        );
        assert_eq!(invoice.edit_history[0].notes, "Updated phone, items");
    }

    #[test]
    fn test_describe_lines() {
        assert_eq!(
            frame_item(45).describe(Locale::Ar),
            "Ray-Ban RB5154 بني 51-21-145"
        );
        assert_eq!(frame_item(45).label_key(), "receipt.frame");
    }
}
