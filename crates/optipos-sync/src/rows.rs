//! # Backend Rows
//!
//! Maps domain records to the rows of the hosted backend's tables. Bilingual
//! values go out in the backend's packed `"English | Arabic"` form and money
//! as a three-decimal string.

use serde_json::{json, Value};

use optipos_core::catalog::{Catalog, Frame};
use optipos_core::refund::RefundExchangeKind;
use optipos_core::reports::{DailySalesSummary, MonthlySalesSummary, SalesTotals};
use optipos_core::{Invoice, Money, Patient, RefundExchange};

/// A row ready to send, with the id used in logs and failure details.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub value: Value,
}

impl Row {
    fn new(id: impl Into<String>, value: Value) -> Self {
        Row {
            id: id.into(),
            value,
        }
    }
}

fn amount(money: Money) -> Value {
    Value::String(money.to_string())
}

fn optional_amount(money: Option<Money>) -> Value {
    money.map(amount).unwrap_or(Value::Null)
}

// =============================================================================
// Catalog
// =============================================================================

pub fn frame_row(f: &Frame) -> Row {
    Row::new(
        &f.id,
        json!({
            "id": f.id,
            "brand": f.brand,
            "model": f.model,
            "color": f.color.to_legacy(),
            "size": f.size,
            "price": amount(f.price),
            "stock": f.stock,
        }),
    )
}

pub fn lens_type_rows(catalog: &Catalog) -> Vec<Row> {
    catalog
        .lens_types
        .iter()
        .map(|l| {
            Row::new(
                &l.id,
                json!({
                    "id": l.id,
                    "name": l.name.to_legacy(),
                    "category": l.category,
                    "price": optional_amount(l.price),
                }),
            )
        })
        .collect()
}

pub fn lens_coating_rows(catalog: &Catalog) -> Vec<Row> {
    catalog
        .lens_coatings
        .iter()
        .map(|c| {
            let colors: Vec<String> = c.colors.iter().map(|color| color.to_legacy()).collect();
            Row::new(
                &c.id,
                json!({
                    "id": c.id,
                    "name": c.name.to_legacy(),
                    "price": optional_amount(c.price),
                    "is_photochromic": c.is_photochromic,
                    "available_colors": colors,
                }),
            )
        })
        .collect()
}

pub fn lens_thickness_rows(catalog: &Catalog) -> Vec<Row> {
    catalog
        .lens_thicknesses
        .iter()
        .map(|t| {
            Row::new(
                &t.id,
                json!({
                    "id": t.id,
                    "name": t.name.to_legacy(),
                    "price": optional_amount(t.price),
                }),
            )
        })
        .collect()
}

pub fn pricing_rows(catalog: &Catalog) -> Vec<Row> {
    catalog
        .pricing
        .iter()
        .map(|c| {
            Row::new(
                &c.id,
                json!({
                    "id": c.id,
                    "lens_type_id": c.lens_type_id,
                    "coating_id": c.coating_id,
                    "thickness_id": c.thickness_id,
                    "price": amount(c.price),
                }),
            )
        })
        .collect()
}

pub fn contact_lens_rows(catalog: &Catalog) -> Vec<Row> {
    catalog
        .contact_lenses
        .iter()
        .map(|c| {
            Row::new(
                &c.id,
                json!({
                    "id": c.id,
                    "brand": c.brand,
                    "type": c.kind,
                    "power": c.power,
                    "price": amount(c.price),
                    "stock": c.stock,
                }),
            )
        })
        .collect()
}

pub fn service_rows(catalog: &Catalog) -> Vec<Row> {
    catalog
        .services
        .iter()
        .map(|s| {
            Row::new(
                &s.id,
                json!({
                    "id": s.id,
                    "name": s.name.to_legacy(),
                    "price": amount(s.price),
                }),
            )
        })
        .collect()
}

// =============================================================================
// Patients
// =============================================================================

pub fn patient_rows(patients: &[Patient]) -> Vec<Row> {
    patients
        .iter()
        .map(|p| {
            Row::new(
                &p.id,
                json!({
                    "id": p.id,
                    "name": p.name,
                    "phone": p.phone,
                    "date_of_birth": p.date_of_birth.map(|d| d.to_string()),
                    "notes": p.notes,
                    "created_at": p.created_at.to_rfc3339(),
                }),
            )
        })
        .collect()
}

pub fn patient_note_rows(patients: &[Patient]) -> Vec<Row> {
    patients
        .iter()
        .flat_map(|p| {
            p.patient_notes.iter().map(move |n| {
                Row::new(
                    &n.id,
                    json!({
                        "id": n.id,
                        "patient_id": p.id,
                        "note_text": n.text,
                        "created_at": n.created_at.to_rfc3339(),
                    }),
                )
            })
        })
        .collect()
}

/// One row per history entry. History is append-only, so the position is a
/// stable part of the id.
pub fn glasses_prescription_rows(patients: &[Patient]) -> Vec<Row> {
    patients
        .iter()
        .flat_map(|p| {
            p.rx_history.iter().enumerate().map(move |(index, entry)| {
                let id = format!("{}-rx-{}", p.id, index + 1);
                Row::new(
                    id.clone(),
                    json!({
                        "id": id,
                        "patient_id": p.id,
                        "right_eye": entry.rx.right,
                        "left_eye": entry.rx.left,
                        "pd_right": entry.rx.pd_right,
                        "pd_left": entry.rx.pd_left,
                        "created_at": entry.created_at.to_rfc3339(),
                    }),
                )
            })
        })
        .collect()
}

pub fn contact_lens_prescription_rows(patients: &[Patient]) -> Vec<Row> {
    patients
        .iter()
        .flat_map(|p| {
            p.contact_lens_rx_history.iter().map(move |rx| {
                Row::new(
                    &rx.id,
                    json!({
                        "id": rx.id,
                        "patient_id": p.id,
                        "right_eye": rx.right,
                        "left_eye": rx.left,
                        "created_at": rx.created_at.to_rfc3339(),
                    }),
                )
            })
        })
        .collect()
}

// =============================================================================
// Sales
// =============================================================================

pub fn invoice_rows(invoices: &[Invoice], store_id: &str) -> Vec<Row> {
    invoices
        .iter()
        .map(|i| {
            Row::new(
                &i.id,
                json!({
                    "id": i.id,
                    "invoice_number": i.invoice_number,
                    "store_id": store_id,
                    "location_id": i.location_id,
                    "patient_id": i.patient_id,
                    "patient_name": i.patient_name,
                    "patient_phone": i.patient_phone,
                    "subtotal": amount(i.subtotal),
                    "discount": amount(i.discount),
                    "total": amount(i.total),
                    "deposit": amount(i.deposit),
                    "remaining": amount(i.remaining),
                    "is_paid": i.is_paid,
                    "is_refunded": i.is_refunded,
                    "is_exchanged": i.is_exchanged,
                    "items": i.items,
                    "payments": i.payments,
                    "created_at": i.created_at.to_rfc3339(),
                }),
            )
        })
        .collect()
}

pub fn refund_rows(refunds: &[RefundExchange], store_id: &str) -> Vec<Row> {
    refunds
        .iter()
        .map(|r| {
            let kind = match r.kind {
                RefundExchangeKind::Refund => "refund",
                RefundExchangeKind::Exchange => "exchange",
            };
            Row::new(
                &r.id,
                json!({
                    "id": r.id,
                    "refund_number": r.refund_number,
                    "store_id": store_id,
                    "invoice_id": r.original_invoice_id,
                    "type": kind,
                    "amount": amount(r.amount),
                    "reason": r.reason,
                    "exchange_state": r.exchange_state().map(|s| s.as_str()),
                    "replacement_invoice_id": r
                        .exchange
                        .as_ref()
                        .and_then(|e| e.replacement_invoice_id.clone()),
                    "date": r.date.to_rfc3339(),
                }),
            )
        })
        .collect()
}

fn totals_fields(row: &mut Value, totals: &SalesTotals) {
    if let Value::Object(map) = row {
        map.insert("invoice_count".into(), json!(totals.invoice_count));
        map.insert("gross_sales".into(), amount(totals.gross));
        map.insert("discounts".into(), amount(totals.discounts));
        map.insert("refunds".into(), amount(totals.refunds));
        map.insert("net_sales".into(), amount(totals.net));
        map.insert("collected".into(), amount(totals.collected));
    }
}

pub fn daily_summary_rows(summaries: &[DailySalesSummary], store_id: &str) -> Vec<Row> {
    summaries
        .iter()
        .map(|s| {
            let id = format!("{}-{}", store_id, s.date);
            let mut value = json!({
                "id": id,
                "store_id": store_id,
                "date": s.date.to_string(),
            });
            totals_fields(&mut value, &s.totals);
            Row::new(id, value)
        })
        .collect()
}

pub fn monthly_summary_rows(summaries: &[MonthlySalesSummary], store_id: &str) -> Vec<Row> {
    summaries
        .iter()
        .map(|s| {
            let id = format!("{}-{:04}-{:02}", store_id, s.year, s.month);
            let mut value = json!({
                "id": id,
                "store_id": store_id,
                "year": s.year,
                "month": s.month,
            });
            totals_fields(&mut value, &s.totals);
            Row::new(id, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use optipos_core::patient::{EyeRx, NewPatient, RxData};
    use optipos_core::LocalizedText;

    #[test]
    fn test_frame_row_packs_bilingual_color() {
        let row = frame_row(&Frame {
            id: "f1".into(),
            brand: "Ray-Ban".into(),
            model: "RB3025".into(),
            color: LocalizedText::bilingual("Gold", "ذهبي"),
            size: "58-14-135".into(),
            price: Money::from_major(45),
            stock: 2,
        });
        assert_eq!(row.id, "f1");
        assert_eq!(row.value["color"], "Gold | ذهبي");
        assert_eq!(row.value["price"], "45.000");
    }

    #[test]
    fn test_prescription_history_rows() {
        let mut patient = Patient::register(
            NewPatient {
                name: "Fatima".into(),
                phone: "55551234".into(),
                ..Default::default()
            },
            Utc::now(),
        );
        let rx = RxData {
            right: EyeRx {
                sphere: Some(-1.25),
                ..Default::default()
            },
            ..Default::default()
        };
        patient.update_prescription(rx.clone(), Utc::now());
        patient.update_prescription(rx, Utc::now());

        let rows = glasses_prescription_rows(&[patient.clone()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, format!("{}-rx-2", patient.id));
        assert_eq!(rows[0].value["patient_id"], patient.id.as_str());
    }
}
