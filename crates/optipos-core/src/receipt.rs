//! # Receipts & Work-Order Tickets
//!
//! Builds the printable content of an invoice receipt or a lab ticket as
//! structured, bilingual lines, and renders it as fixed-width text for an
//! 80mm thermal printer.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │               Invoice | فاتورة                 │
//! │        *** Edited | معدلة ***                  │  ← edit_history non-empty
//! │ Invoice No. | رقم الفاتورة    INV-20261019-0001 │
//! │ Frame | الإطار                            30.000 │
//! │   Ray-Ban RB5154 Brown 51-21-145               │
//! │ Total | المجموع                       45.000 KWD │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! HTML layout and the print dialog live in the frontend; this module only
//! decides what is printed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::invoice::Invoice;
use crate::locale::{LocalizedText, Locale, Translator};
use crate::location::StoreLocation;
use crate::money::Money;
use crate::refund::RefundExchangeKind;
use crate::work_order::WorkOrder;

/// Characters per line on an 80mm roll.
pub const RECEIPT_WIDTH: usize = 48;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptLine {
    pub label: LocalizedText,
    /// Secondary text printed under the label (item descriptions).
    pub detail: Option<LocalizedText>,
    pub value: String,
}

impl ReceiptLine {
    fn keyed(key: &str, value: impl Into<String>) -> Self {
        ReceiptLine {
            label: Translator::both(key),
            detail: None,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    pub title: LocalizedText,
    pub store: Option<LocalizedText>,
    pub store_phone: Option<String>,
    /// Edited / refunded / exchanged markers, in that order.
    pub badges: Vec<LocalizedText>,
    pub header: Vec<ReceiptLine>,
    pub items: Vec<ReceiptLine>,
    pub totals: Vec<ReceiptLine>,
    pub footer: Option<LocalizedText>,
}

fn amount(money: Money) -> String {
    format!("{} {}", money, Translator::new(Locale::En).t("receipt.currency"))
}

fn bilingual_detail(describe: impl Fn(Locale) -> String) -> LocalizedText {
    let en = describe(Locale::En);
    LocalizedText::new(en.clone())
        .with(Locale::En, en)
        .with(Locale::Ar, describe(Locale::Ar))
}

impl Receipt {
    pub fn for_invoice(invoice: &Invoice, location: Option<&StoreLocation>) -> Self {
        let mut badges = Vec::new();
        if invoice.is_edited() {
            badges.push(Translator::both("receipt.edited"));
        }
        match invoice.refund_exchange.as_ref().map(|r| r.kind) {
            Some(RefundExchangeKind::Refund) => badges.push(Translator::both("receipt.refunded")),
            Some(RefundExchangeKind::Exchange) => {
                badges.push(Translator::both("receipt.exchanged"))
            }
            None => {}
        }

        let mut header = vec![
            ReceiptLine::keyed("receipt.invoice_no", invoice.invoice_number.clone()),
            ReceiptLine::keyed("receipt.date", invoice.created_at.format(DATE_FORMAT).to_string()),
            ReceiptLine::keyed("receipt.patient", invoice.patient_name.clone()),
        ];
        if !invoice.patient_phone.is_empty() {
            header.push(ReceiptLine::keyed("receipt.phone", invoice.patient_phone.clone()));
        }

        let items = invoice
            .items
            .iter()
            .map(|item| ReceiptLine {
                label: Translator::both(item.label_key()),
                detail: Some(bilingual_detail(|locale| item.describe(locale))),
                value: item.line_total().to_string(),
            })
            .collect();

        let mut totals = vec![ReceiptLine::keyed("receipt.subtotal", amount(invoice.subtotal))];
        if !invoice.discount.is_zero() {
            totals.push(ReceiptLine::keyed("receipt.discount", amount(invoice.discount)));
        }
        totals.push(ReceiptLine::keyed("receipt.total", amount(invoice.total)));
        for payment in &invoice.payments {
            totals.push(ReceiptLine {
                label: Translator::both("receipt.payment"),
                detail: Some(payment.method.label()),
                value: amount(payment.amount),
            });
        }
        totals.push(ReceiptLine::keyed("receipt.paid", amount(invoice.total_paid())));
        totals.push(ReceiptLine::keyed(
            "receipt.remaining",
            amount(invoice.remaining.non_negative()),
        ));
        if let Some(record) = &invoice.refund_exchange {
            if record.kind == RefundExchangeKind::Refund {
                totals.push(ReceiptLine {
                    label: Translator::both("receipt.refunded"),
                    detail: Some(
                        LocalizedText::new(record.reason.clone())
                            .with(Locale::En, record.reason.clone()),
                    ),
                    value: amount(record.amount),
                });
            }
        }

        Receipt {
            title: Translator::both("receipt.title"),
            store: location.map(|l| l.name.clone()),
            store_phone: location.map(|l| l.phone.clone()),
            badges,
            header,
            items,
            totals,
            footer: Some(Translator::both("receipt.thank_you")),
        }
    }

    /// Lab ticket: prescription and lens details, no prices.
    pub fn for_work_order(order: &WorkOrder, location: Option<&StoreLocation>) -> Self {
        let header = vec![
            ReceiptLine::keyed("work_order.no", order.work_order_number.clone()),
            ReceiptLine::keyed("receipt.date", order.created_at.format(DATE_FORMAT).to_string()),
            ReceiptLine::keyed("receipt.patient", order.patient_name.clone()),
            ReceiptLine::keyed("receipt.phone", order.patient_phone.clone()),
            ReceiptLine {
                label: Translator::both("work_order.status"),
                detail: None,
                value: Translator::new(Locale::En).t(order.status.label_key()).to_string(),
            },
        ];

        let mut items = Vec::new();
        if let Some(frame) = &order.frame {
            items.push(ReceiptLine::keyed("receipt.frame", frame.clone()));
        }
        if let Some(lens) = &order.lens {
            items.push(ReceiptLine::keyed("receipt.lens", lens.lens_type.get(Locale::En)));
            items.push(ReceiptLine::keyed("receipt.coating", lens.coating.get(Locale::En)));
            if let Some(color) = &lens.coating_color {
                items.push(ReceiptLine {
                    label: Translator::both("receipt.coating"),
                    detail: Some(color.clone()),
                    value: String::new(),
                });
            }
            items.push(ReceiptLine::keyed("receipt.thickness", lens.thickness.get(Locale::En)));
        }
        if let Some(rx) = &order.rx {
            items.push(ReceiptLine::keyed("work_order.right_eye", rx.right.summary()));
            items.push(ReceiptLine::keyed("work_order.left_eye", rx.left.summary()));
            items.push(ReceiptLine::keyed("work_order.pd", rx.pd_summary()));
        }

        Receipt {
            title: Translator::both("work_order.title"),
            store: location.map(|l| l.name.clone()),
            store_phone: location.map(|l| l.phone.clone()),
            badges: Vec::new(),
            header,
            items,
            totals: Vec::new(),
            footer: None,
        }
    }

    /// Fixed-width text, one printer line per `\n`.
    pub fn render_text(&self, width: usize) -> String {
        let mut out = Vec::new();
        let rule = "=".repeat(width);

        out.push(center(&both(&self.title), width));
        if let Some(store) = &self.store {
            out.push(center(&both(store), width));
        }
        if let Some(phone) = &self.store_phone {
            out.push(center(phone, width));
        }
        for badge in &self.badges {
            out.push(center(&format!("*** {} ***", both(badge)), width));
        }
        out.push(rule.clone());

        for line in &self.header {
            push_line(&mut out, line, width);
        }
        if !self.items.is_empty() {
            out.push("-".repeat(width));
            for line in &self.items {
                push_line(&mut out, line, width);
            }
        }
        if !self.totals.is_empty() {
            out.push("-".repeat(width));
            for line in &self.totals {
                push_line(&mut out, line, width);
            }
        }
        out.push(rule);
        if let Some(footer) = &self.footer {
            out.push(center(footer.get(Locale::En), width));
            out.push(center(footer.get(Locale::Ar), width));
        }

        out.join("\n")
    }
}

// =============================================================================
// Text Layout
// =============================================================================

fn both(text: &LocalizedText) -> String {
    let en = text.get(Locale::En);
    let ar = text.get(Locale::Ar);
    if en == ar {
        en.to_string()
    } else {
        format!("{} | {}", en, ar)
    }
}

fn len(text: &str) -> usize {
    text.chars().count()
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = (width - len(&text)) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

fn push_line(out: &mut Vec<String>, line: &ReceiptLine, width: usize) {
    let label = both(&line.label);
    let value = truncate(&line.value, width);

    if len(&label) + len(&value) < width {
        let gap = width - len(&label) - len(&value);
        out.push(format!("{}{}{}", label, " ".repeat(gap), value));
    } else {
        out.push(truncate(&label, width));
        if !value.is_empty() {
            out.push(format!("{}{}", " ".repeat(width - len(&value)), value));
        }
    }

    if let Some(detail) = &line.detail {
        for text in [detail.get(Locale::En), detail.get(Locale::Ar)] {
            let row = truncate(&format!("  {}", text), width);
            if out.last() != Some(&row) {
                out.push(row);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::tests::draft;
    use crate::invoice::InvoiceUpdate;
    use crate::refund::process_refund;
    use crate::work_order::WorkOrder;
    use chrono::Utc;

    fn invoice() -> Invoice {
        Invoice::create(draft(45, 20), "INV-20261019-0001".into(), Utc::now())
    }

    #[test]
    fn test_receipt_lines_fit_the_roll() {
        let receipt = Receipt::for_invoice(&invoice(), None);
        let text = receipt.render_text(RECEIPT_WIDTH);

        assert!(text.lines().all(|l| l.chars().count() <= RECEIPT_WIDTH));
        assert!(text.contains("INV-20261019-0001"));
        assert!(text.contains("45.000 KWD"));
        assert!(text.contains("25.000 KWD"));
        assert!(text.contains("Invoice | فاتورة"));
    }

    #[test]
    fn test_edited_badge_only_after_edit() {
        let mut inv = invoice();
        assert!(Receipt::for_invoice(&inv, None).badges.is_empty());

        inv.apply_update(
            InvoiceUpdate {
                patient_phone: Some("99990000".into()),
                ..Default::default()
            },
            Utc::now(),
        );
        let receipt = Receipt::for_invoice(&inv, None);
        assert_eq!(receipt.badges, vec![Translator::both("receipt.edited")]);
        assert!(receipt.render_text(RECEIPT_WIDTH).contains("*** Edited | معدلة ***"));
    }

    #[test]
    fn test_refunded_banner_and_line() {
        let mut inv = invoice();
        process_refund(&mut inv, Money::from_major(10), "Scratch", "RF-1".into(), Utc::now())
            .unwrap();
        let receipt = Receipt::for_invoice(&inv, None);

        assert!(receipt.badges.contains(&Translator::both("receipt.refunded")));
        assert!(receipt.totals.iter().any(|l| l.value == "10.000 KWD"));
    }

    #[test]
    fn test_work_order_ticket_has_no_prices() {
        let inv = invoice();
        let order = WorkOrder::from_invoice(&inv, "WO-20261019-0001".into(), Utc::now());
        let ticket = Receipt::for_work_order(&order, None);
        let text = ticket.render_text(RECEIPT_WIDTH);

        assert!(ticket.totals.is_empty());
        assert!(text.contains("WO-20261019-0001"));
        assert!(text.contains("Pending"));
        assert!(!text.contains("KWD"));
    }
}
