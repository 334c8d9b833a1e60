//! # Work Orders
//!
//! Lab ticket derived from an invoice: which lenses to cut, for which
//! prescription, at which store.
//!
//! Status is free-form: any status may be set from any other. Each change
//! is recorded with its time so the ticket shows when the job moved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::invoice::{Invoice, InvoiceItem};
use crate::locale::LocalizedText;
use crate::money::Money;
use crate::patient::RxData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum WorkOrderStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "pending",
            WorkOrderStatus::InProgress => "in-progress",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "status.pending",
            WorkOrderStatus::InProgress => "status.in_progress",
            WorkOrderStatus::Completed => "status.completed",
            WorkOrderStatus::Cancelled => "status.cancelled",
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: WorkOrderStatus,
    pub to: WorkOrderStatus,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
}

/// Lens selection copied from the invoice's lens line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LensSpec {
    pub lens_type: LocalizedText,
    pub coating: LocalizedText,
    pub coating_color: Option<LocalizedText>,
    pub thickness: LocalizedText,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: String,
    pub work_order_number: String,
    pub invoice_id: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    /// Frame line as printed, e.g. `Ray-Ban RB5154 Brown 51-21-145`.
    pub frame: Option<String>,
    pub lens: Option<LensSpec>,
    pub rx: Option<RxData>,
    pub location_id: Option<String>,
    pub status: WorkOrderStatus,
    pub status_history: Vec<StatusChange>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn from_invoice(invoice: &Invoice, work_order_number: String, now: DateTime<Utc>) -> Self {
        let lens = invoice.items.iter().find_map(|item| match item {
            InvoiceItem::Lens {
                lens_type,
                coating,
                coating_color,
                thickness,
                price,
                ..
            } => Some(LensSpec {
                lens_type: lens_type.clone(),
                coating: coating.clone(),
                coating_color: coating_color.clone(),
                thickness: thickness.clone(),
                price: *price,
            }),
            _ => None,
        });

        let frame = invoice
            .items
            .iter()
            .find(|item| matches!(item, InvoiceItem::Frame { .. }))
            .map(|item| item.describe(crate::locale::Locale::En));

        WorkOrder {
            id: Uuid::new_v4().to_string(),
            work_order_number,
            invoice_id: invoice.id.clone(),
            patient_id: invoice.patient_id.clone(),
            patient_name: invoice.patient_name.clone(),
            patient_phone: invoice.patient_phone.clone(),
            frame,
            lens,
            rx: invoice.rx.clone(),
            location_id: invoice.location_id.clone(),
            status: WorkOrderStatus::Pending,
            status_history: Vec::new(),
            created_at: now,
        }
    }

    /// Sets the status. Returns `false` when it was already `status`.
    pub fn set_status(&mut self, status: WorkOrderStatus, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status_history.push(StatusChange {
            from: self.status,
            to: status,
            at: now,
        });
        self.status = status;
        true
    }
}
