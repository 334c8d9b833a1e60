//! # Domain Store
//!
//! The single source of truth for patients, catalog, invoices, work orders,
//! refunds and locations, as an immutable [`Snapshot`].
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Snapshot v7 ──apply(Command, now)──► Ok((Snapshot v8, Change))        │
//! │        │                           └─► Err(CoreError)  (v7 untouched)   │
//! │        │                                                                │
//! │   Readers keep the Arc<Snapshot> they hold; the app swaps in v8 and    │
//! │   persists whatever `Change` names.                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation goes through [`Snapshot::apply`]. A failed command never
//! leaves a half-applied state because the work happens on a copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, CatalogItem, CatalogKind};
use crate::error::{CoreError, CoreResult};
use crate::invoice::{Invoice, InvoiceDraft, InvoiceUpdate, NewPayment};
use crate::location::{LocationRegistry, StoreLocation};
use crate::money::Money;
use crate::navigation::NavigationCommand;
use crate::numbering::{next_number, INVOICE_PREFIX, REFUND_PREFIX, WORK_ORDER_PREFIX};
use crate::patient::{ContactLensEyeRx, NewPatient, Patient, RxData};
use crate::pricing::LensPricingCombination;
use crate::refund::{self, ExchangeState, RefundExchange};
use crate::work_order::{WorkOrder, WorkOrderStatus};

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RegisterPatient(NewPatient),
    UpdatePrescription {
        patient_id: String,
        rx: RxData,
    },
    AddContactLensRx {
        patient_id: String,
        right: ContactLensEyeRx,
        left: ContactLensEyeRx,
    },
    AddPatientNote {
        patient_id: String,
        text: String,
    },
    UpsertCatalogItem(CatalogItem),
    DeleteCatalogItem {
        kind: CatalogKind,
        id: String,
    },
    /// Adds a price for a new triple; a second price for the same triple is
    /// rejected.
    InsertPricing(LensPricingCombination),
    UpsertPricing(LensPricingCombination),
    DeletePricing {
        id: String,
    },
    CreateInvoice {
        draft: InvoiceDraft,
        with_work_order: bool,
    },
    AddPayment {
        invoice_id: String,
        payment: NewPayment,
    },
    UpdateInvoice {
        invoice_id: String,
        update: InvoiceUpdate,
    },
    CreateWorkOrder {
        invoice_id: String,
    },
    SetWorkOrderStatus {
        work_order_id: String,
        status: WorkOrderStatus,
    },
    ProcessRefund {
        invoice_id: String,
        amount: Money,
        reason: String,
    },
    ProcessExchange {
        invoice_id: String,
        replacement_invoice_id: Option<String>,
        reason: String,
    },
    BeginReplacement {
        invoice_id: String,
    },
    CompleteExchange {
        invoice_id: String,
        replacement_invoice_id: String,
    },
    UpsertLocation(StoreLocation),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::RegisterPatient(_) => "register_patient",
            Command::UpdatePrescription { .. } => "update_prescription",
            Command::AddContactLensRx { .. } => "add_contact_lens_rx",
            Command::AddPatientNote { .. } => "add_patient_note",
            Command::UpsertCatalogItem(_) => "upsert_catalog_item",
            Command::DeleteCatalogItem { .. } => "delete_catalog_item",
            Command::InsertPricing(_) => "insert_pricing",
            Command::UpsertPricing(_) => "upsert_pricing",
            Command::DeletePricing { .. } => "delete_pricing",
            Command::CreateInvoice { .. } => "create_invoice",
            Command::AddPayment { .. } => "add_payment",
            Command::UpdateInvoice { .. } => "update_invoice",
            Command::CreateWorkOrder { .. } => "create_work_order",
            Command::SetWorkOrderStatus { .. } => "set_work_order_status",
            Command::ProcessRefund { .. } => "process_refund",
            Command::ProcessExchange { .. } => "process_exchange",
            Command::BeginReplacement { .. } => "begin_replacement",
            Command::CompleteExchange { .. } => "complete_exchange",
            Command::UpsertLocation(_) => "upsert_location",
        }
    }
}

/// What a command changed, for persistence and for the caller's reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Patient(Patient),
    CatalogItem(CatalogItem),
    CatalogItemDeleted {
        kind: CatalogKind,
        id: String,
        /// Pricing rows dropped along with a lens component.
        pricing_removed: Vec<String>,
    },
    Pricing(LensPricingCombination),
    PricingDeleted {
        id: String,
    },
    InvoiceCreated {
        invoice: Invoice,
        work_order: Option<WorkOrder>,
        /// The exchanged invoice, when this sale completed an exchange.
        original: Option<Invoice>,
    },
    Invoice(Invoice),
    WorkOrder(WorkOrder),
    RefundExchange {
        invoice: Invoice,
        record: RefundExchange,
        next: Option<NavigationCommand>,
    },
    Location(StoreLocation),
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Incremented by every applied command.
    pub version: u64,
    pub patients: Vec<Patient>,
    pub catalog: Catalog,
    pub invoices: Vec<Invoice>,
    pub work_orders: Vec<WorkOrder>,
    pub refunds: Vec<RefundExchange>,
    pub locations: LocationRegistry,
}

impl Snapshot {
    pub fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn invoice(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id == id)
    }

    pub fn invoice_by_number(&self, number: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.invoice_number == number)
    }

    pub fn work_order(&self, id: &str) -> Option<&WorkOrder> {
        self.work_orders.iter().find(|w| w.id == id)
    }

    pub fn invoices_for_patient(&self, patient_id: &str) -> Vec<&Invoice> {
        self.invoices
            .iter()
            .filter(|i| i.patient_id.as_deref() == Some(patient_id))
            .collect()
    }

    /// Applies a command to a copy of this snapshot.
    pub fn apply(&self, command: Command, now: DateTime<Utc>) -> CoreResult<(Snapshot, Change)> {
        let name = command.name();
        let mut next = self.clone();
        let change = next.mutate(command, now)?;
        next.version = self.version + 1;
        debug!(command = name, version = next.version, "Command applied");
        Ok((next, change))
    }

    fn mutate(&mut self, command: Command, now: DateTime<Utc>) -> CoreResult<Change> {
        match command {
            Command::RegisterPatient(input) => {
                let patient = Patient::register(input, now);
                self.patients.push(patient.clone());
                Ok(Change::Patient(patient))
            }
            Command::UpdatePrescription { patient_id, rx } => {
                let patient = self.patient_mut(&patient_id)?;
                patient.update_prescription(rx, now);
                Ok(Change::Patient(patient.clone()))
            }
            Command::AddContactLensRx {
                patient_id,
                right,
                left,
            } => {
                let patient = self.patient_mut(&patient_id)?;
                patient.add_contact_lens_rx(right, left, now);
                Ok(Change::Patient(patient.clone()))
            }
            Command::AddPatientNote { patient_id, text } => {
                let patient = self.patient_mut(&patient_id)?;
                patient.add_note(text, now);
                Ok(Change::Patient(patient.clone()))
            }

            Command::UpsertCatalogItem(item) => {
                self.catalog.upsert(item.clone());
                Ok(Change::CatalogItem(item))
            }
            Command::DeleteCatalogItem { kind, id } => {
                let pricing_removed = self.catalog.pricing.referencing(kind, &id);
                if !self.catalog.remove(kind, &id) {
                    return Err(CoreError::CatalogItemNotFound {
                        kind: kind.to_string(),
                        id,
                    });
                }
                Ok(Change::CatalogItemDeleted {
                    kind,
                    id,
                    pricing_removed,
                })
            }
            Command::InsertPricing(combination) => {
                self.catalog.pricing.insert(combination.clone())?;
                Ok(Change::Pricing(combination))
            }
            Command::UpsertPricing(combination) => {
                Ok(Change::Pricing(self.catalog.pricing.upsert(combination)))
            }
            Command::DeletePricing { id } => match self.catalog.pricing.remove(&id) {
                Some(_) => Ok(Change::PricingDeleted { id }),
                None => Err(CoreError::CatalogItemNotFound {
                    kind: "lens_pricing_combination".to_string(),
                    id,
                }),
            },

            Command::CreateInvoice {
                draft,
                with_work_order,
            } => self.create_invoice(draft, with_work_order, now),
            Command::AddPayment {
                invoice_id,
                payment,
            } => {
                let invoice = self.invoice_mut(&invoice_id)?;
                invoice.add_payment(payment, now);
                Ok(Change::Invoice(invoice.clone()))
            }
            Command::UpdateInvoice { invoice_id, update } => {
                let invoice = self.invoice_mut(&invoice_id)?;
                invoice.apply_update(update, now);
                Ok(Change::Invoice(invoice.clone()))
            }
            Command::CreateWorkOrder { invoice_id } => {
                let invoice = self
                    .invoice(&invoice_id)
                    .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.clone()))?
                    .clone();
                let order = self.issue_work_order(&invoice, now);
                Ok(Change::WorkOrder(order))
            }
            Command::SetWorkOrderStatus {
                work_order_id,
                status,
            } => {
                let order = self
                    .work_orders
                    .iter_mut()
                    .find(|w| w.id == work_order_id)
                    .ok_or(CoreError::WorkOrderNotFound(work_order_id))?;
                order.set_status(status, now);
                Ok(Change::WorkOrder(order.clone()))
            }

            Command::ProcessRefund {
                invoice_id,
                amount,
                reason,
            } => {
                let number = self.next_refund_number(now);
                let invoice = self.invoice_mut(&invoice_id)?;
                let record = refund::process_refund(invoice, amount, &reason, number, now)?;
                let invoice = invoice.clone();
                self.refunds.push(record.clone());
                Ok(Change::RefundExchange {
                    invoice,
                    record,
                    next: None,
                })
            }
            Command::ProcessExchange {
                invoice_id,
                replacement_invoice_id,
                reason,
            } => {
                if let Some(replacement) = &replacement_invoice_id {
                    if self.invoice(replacement).is_none() {
                        return Err(CoreError::InvoiceNotFound(replacement.clone()));
                    }
                }
                let number = self.next_refund_number(now);
                let invoice = self.invoice_mut(&invoice_id)?;
                let outcome = refund::process_exchange(
                    invoice,
                    replacement_invoice_id,
                    &reason,
                    number,
                    now,
                )?;
                let invoice = invoice.clone();
                self.refunds.push(outcome.record.clone());
                Ok(Change::RefundExchange {
                    invoice,
                    record: outcome.record,
                    next: outcome.next,
                })
            }
            Command::BeginReplacement { invoice_id } => {
                let invoice = self.invoice_mut(&invoice_id)?;
                let record = refund::begin_replacement(invoice, now)?;
                let invoice = invoice.clone();
                self.replace_refund_record(&record);
                Ok(Change::RefundExchange {
                    invoice,
                    record,
                    next: None,
                })
            }
            Command::CompleteExchange {
                invoice_id,
                replacement_invoice_id,
            } => {
                if self.invoice(&replacement_invoice_id).is_none() {
                    return Err(CoreError::InvoiceNotFound(replacement_invoice_id));
                }
                let invoice = self.invoice_mut(&invoice_id)?;
                let record = refund::complete_exchange(invoice, replacement_invoice_id, now)?;
                let invoice = invoice.clone();
                self.replace_refund_record(&record);
                Ok(Change::RefundExchange {
                    invoice,
                    record,
                    next: None,
                })
            }

            Command::UpsertLocation(location) => {
                let id = location.id.clone();
                self.locations.upsert(location);
                let stored = self
                    .locations
                    .get(&id)
                    .cloned()
                    .ok_or(CoreError::LocationNotFound(id))?;
                Ok(Change::Location(stored))
            }
        }
    }

    fn create_invoice(
        &mut self,
        draft: InvoiceDraft,
        with_work_order: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<Change> {
        let number = next_number(
            INVOICE_PREFIX,
            now,
            self.invoices.iter().map(|i| i.invoice_number.as_str()),
        );
        let mut invoice = Invoice::create(draft, number, now);

        let original = match invoice.replaces_invoice_id.clone() {
            Some(original_id) => {
                let replacement_id = invoice.id.clone();
                let original = self.invoice_mut(&original_id)?;
                if original.refund_exchange.as_ref().and_then(|r| r.exchange_state())
                    == Some(ExchangeState::Initiated)
                {
                    refund::begin_replacement(original, now)?;
                }
                let record = refund::complete_exchange(original, replacement_id, now)?;
                let original = original.clone();
                self.replace_refund_record(&record);
                Some(original)
            }
            None => None,
        };

        let work_order = if with_work_order {
            let order = self.issue_work_order(&invoice, now);
            invoice.work_order_id = Some(order.id.clone());
            Some(order)
        } else {
            None
        };

        self.invoices.push(invoice.clone());
        Ok(Change::InvoiceCreated {
            invoice,
            work_order,
            original,
        })
    }

    fn issue_work_order(&mut self, invoice: &Invoice, now: DateTime<Utc>) -> WorkOrder {
        let number = next_number(
            WORK_ORDER_PREFIX,
            now,
            self.work_orders.iter().map(|w| w.work_order_number.as_str()),
        );
        let order = WorkOrder::from_invoice(invoice, number, now);
        if let Some(stored) = self.invoices.iter_mut().find(|i| i.id == invoice.id) {
            stored.work_order_id = Some(order.id.clone());
        }
        self.work_orders.push(order.clone());
        order
    }

    fn next_refund_number(&self, now: DateTime<Utc>) -> String {
        next_number(
            REFUND_PREFIX,
            now,
            self.refunds.iter().map(|r| r.refund_number.as_str()),
        )
    }

    fn replace_refund_record(&mut self, record: &RefundExchange) {
        if let Some(existing) = self.refunds.iter_mut().find(|r| r.id == record.id) {
            *existing = record.clone();
        }
    }

    fn patient_mut(&mut self, id: &str) -> CoreResult<&mut Patient> {
        self.patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::PatientNotFound(id.to_string()))
    }

    fn invoice_mut(&mut self, id: &str) -> CoreResult<&mut Invoice> {
        self.invoices
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::tests::draft;

    fn with_invoice() -> (Snapshot, Invoice) {
        let (snapshot, change) = Snapshot::default()
            .apply(
                Command::CreateInvoice {
                    draft: draft(45, 20),
                    with_work_order: true,
                },
                Utc::now(),
            )
            .unwrap();
        match change {
            Change::InvoiceCreated { invoice, .. } => (snapshot, invoice),
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn test_apply_returns_new_snapshot() {
        let empty = Snapshot::default();
        let (next, change) = empty
            .apply(
                Command::RegisterPatient(NewPatient {
                    name: "Omar".into(),
                    phone: "99990000".into(),
                    ..Default::default()
                }),
                Utc::now(),
            )
            .unwrap();

        assert!(empty.patients.is_empty());
        assert_eq!(empty.version, 0);
        assert_eq!(next.patients.len(), 1);
        assert_eq!(next.version, 1);
        assert!(matches!(change, Change::Patient(_)));
    }

    #[test]
    fn test_failed_command_leaves_snapshot_untouched() {
        let (snapshot, invoice) = with_invoice();
        let err = snapshot
            .apply(
                Command::ProcessRefund {
                    invoice_id: invoice.id.clone(),
                    amount: Money::from_major(99),
                    reason: "too much".into(),
                },
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidRefundAmount { .. }));
        assert!(!snapshot.invoice(&invoice.id).unwrap().is_refunded);
        assert!(snapshot.refunds.is_empty());
    }

    #[test]
    fn test_create_invoice_issues_numbered_work_order() {
        let (snapshot, invoice) = with_invoice();
        assert!(invoice.invoice_number.starts_with("INV-"));
        assert!(invoice.invoice_number.ends_with("-0001"));

        let order = &snapshot.work_orders[0];
        assert!(order.work_order_number.starts_with("WO-"));
        assert_eq!(invoice.work_order_id.as_deref(), Some(order.id.as_str()));
    }

    #[test]
    fn test_payment_through_store() {
        let (snapshot, invoice) = with_invoice();
        let (snapshot, _) = snapshot
            .apply(
                Command::AddPayment {
                    invoice_id: invoice.id.clone(),
                    payment: NewPayment::cash(Money::from_major(25)),
                },
                Utc::now(),
            )
            .unwrap();
        assert!(snapshot.invoice(&invoice.id).unwrap().is_paid);
    }

    #[test]
    fn test_exchange_completed_by_replacement_invoice() {
        let (snapshot, original) = with_invoice();
        let (snapshot, change) = snapshot
            .apply(
                Command::ProcessExchange {
                    invoice_id: original.id.clone(),
                    replacement_invoice_id: None,
                    reason: "Wrong color".into(),
                },
                Utc::now(),
            )
            .unwrap();
        assert!(matches!(
            change,
            Change::RefundExchange { next: Some(_), .. }
        ));

        let mut replacement = draft(50, 0);
        replacement.replaces_invoice_id = Some(original.id.clone());
        let (snapshot, change) = snapshot
            .apply(
                Command::CreateInvoice {
                    draft: replacement,
                    with_work_order: false,
                },
                Utc::now(),
            )
            .unwrap();

        let new_id = match change {
            Change::InvoiceCreated {
                invoice,
                original: Some(updated),
                ..
            } => {
                assert_eq!(
                    updated.refund_exchange.and_then(|r| r.exchange_state()),
                    Some(ExchangeState::Completed)
                );
                invoice.id
            }
            other => panic!("unexpected change {:?}", other),
        };

        let record = &snapshot.refunds[0];
        assert_eq!(record.exchange_state(), Some(ExchangeState::Completed));
        assert_eq!(
            record.exchange.as_ref().and_then(|e| e.replacement_invoice_id.as_deref()),
            Some(new_id.as_str())
        );
    }

    #[test]
    fn test_missing_entities_are_reported() {
        let snapshot = Snapshot::default();
        let err = snapshot
            .apply(
                Command::AddPatientNote {
                    patient_id: "nope".into(),
                    text: "hi".into(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::PatientNotFound(_)));

        let err = snapshot
            .apply(
                Command::DeleteCatalogItem {
                    kind: CatalogKind::Frame,
                    id: "nope".into(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::CatalogItemNotFound { .. }));
    }

    #[test]
    fn test_duplicate_pricing_rejected_by_store() {
        let combo = LensPricingCombination::new("a", "b", "c", Money::from_major(18));
        let (snapshot, _) = Snapshot::default()
            .apply(Command::InsertPricing(combo.clone()), Utc::now())
            .unwrap();
        let mut dup = combo;
        dup.id = "other".into();
        assert!(matches!(
            snapshot.apply(Command::InsertPricing(dup), Utc::now()),
            Err(CoreError::DuplicatePricingCombination { .. })
        ));
    }
}
