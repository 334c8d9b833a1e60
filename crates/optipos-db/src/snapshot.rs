//! # Snapshot Persistence
//!
//! Loads the whole store at startup and writes back whatever a command
//! changed.
//!
//! ```text
//! startup:   Database::load_snapshot() ──► Snapshot v0
//! command:   snapshot.apply(cmd) ──► (Snapshot v+1, Change)
//!                                        │
//!                                        ▼
//!            Database::persist_change(&change, &next)   (one transaction)
//! ```
//!
//! Rows are written parent first: an invoice before its work order and
//! refund record, so foreign keys hold inside the transaction.

use tracing::{debug, info};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{catalog, invoice, location, patient, refund, work_order};
use optipos_core::{Change, Snapshot};

impl Database {
    /// Reads every table into a fresh snapshot.
    pub async fn load_snapshot(&self) -> DbResult<Snapshot> {
        let snapshot = Snapshot {
            version: 0,
            patients: self.patients().load().await?,
            catalog: self.catalog().load().await?,
            invoices: self.invoices().list().await?,
            work_orders: self.work_orders().list().await?,
            refunds: self.refunds().list().await?,
            locations: self.locations().load().await?,
        };

        info!(
            patients = snapshot.patients.len(),
            invoices = snapshot.invoices.len(),
            work_orders = snapshot.work_orders.len(),
            refunds = snapshot.refunds.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Persists one change. `snapshot` is the state the change produced;
    /// changes that touch collections (patients, locations) write the whole
    /// collection from it.
    pub async fn persist_change(&self, change: &Change, snapshot: &Snapshot) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;

        match change {
            Change::Patient(_) => {
                patient::save_all(&mut *tx, &snapshot.patients).await?;
            }

            Change::CatalogItem(item) => {
                catalog::upsert_item(&mut *tx, item).await?;
            }
            Change::CatalogItemDeleted {
                kind,
                id,
                pricing_removed,
            } => {
                catalog::delete_item(&mut *tx, *kind, id).await?;
                for pricing_id in pricing_removed {
                    catalog::delete_pricing(&mut *tx, pricing_id).await?;
                }
            }
            Change::Pricing(combination) => {
                catalog::upsert_pricing(&mut *tx, combination).await?;
            }
            Change::PricingDeleted { id } => {
                catalog::delete_pricing(&mut *tx, id).await?;
            }

            Change::InvoiceCreated {
                invoice: created,
                work_order,
                original,
            } => {
                invoice::save(&mut *tx, created).await?;
                if let Some(order) = work_order {
                    work_order::save(&mut *tx, order).await?;
                }
                if let Some(original) = original {
                    invoice::save(&mut *tx, original).await?;
                    if let Some(record) = &original.refund_exchange {
                        refund::save(&mut *tx, record).await?;
                    }
                }
            }
            Change::Invoice(updated) => {
                invoice::save(&mut *tx, updated).await?;
            }
            Change::WorkOrder(order) => {
                // A newly issued order also links back from its invoice.
                if let Some(parent) = snapshot.invoice(&order.invoice_id) {
                    invoice::save(&mut *tx, parent).await?;
                }
                work_order::save(&mut *tx, order).await?;
            }
            Change::RefundExchange {
                invoice: updated,
                record,
                ..
            } => {
                invoice::save(&mut *tx, updated).await?;
                refund::save(&mut *tx, record).await?;
            }

            Change::Location(_) => {
                for stored in snapshot.locations.all() {
                    location::save(&mut *tx, stored).await?;
                }
            }
        }

        tx.commit().await?;
        debug!(version = snapshot.version, "Change persisted");
        Ok(())
    }
}
