//! # Commands Module
//!
//! Every operation the frontend can invoke.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs         ◄─── You are here (exports)
//! ├── patient.rs     ◄─── Registration, prescriptions, notes, search
//! ├── invoice.rs     ◄─── Lens pricing, invoices, payments, work orders
//! ├── refund.rs      ◄─── Refunds and the exchange flow
//! ├── inventory.rs   ◄─── Catalog items and the lens pricing table
//! ├── receipt.rs     ◄─── Printable receipts, lab tickets, sales reports
//! ├── settings.rs    ◄─── Language and store location
//! ├── navigation.rs  ◄─── Section routing with back history
//! └── sync.rs        ◄─── Cloud push, frame import, status
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Frontend form                                                          │
//! │         │ (JSON payload)                                                │
//! │         ▼                                                               │
//! │  commands::invoice::create_invoice(&store, &session, draft, true)       │
//! │         │  1. validate input       ──► ApiError { field } on failure    │
//! │         │  2. StoreState::execute  ──► Snapshot::apply + persist        │
//! │         │  3. publish new snapshot ──► every later read sees it         │
//! │         ▼                                                               │
//! │  Result<Dto, ApiError>  (JSON, bilingual error message)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Injection
//! Each command takes only the state it needs:
//! ```rust,ignore
//! // Only the store
//! fn search_patients(store: &StoreState, query: &str)
//!
//! // Store and session (default location, navigation)
//! async fn create_invoice(store: &StoreState, session: &SessionState, ...)
//!
//! // Sync commands
//! fn get_sync_status(sync: &SyncState<B>)
//! ```

pub mod inventory;
pub mod invoice;
pub mod navigation;
pub mod patient;
pub mod receipt;
pub mod refund;
pub mod settings;
pub mod sync;

#[cfg(test)]
pub(crate) mod tests {
    use optipos_core::catalog::{LensCoating, LensThickness, LensType};
    use optipos_core::location::StoreLocation;
    use optipos_core::{CatalogItem, InvoiceDraft, InvoiceItem, LocalizedText, Money};
    use optipos_db::{Database, DbConfig};

    use crate::commands::inventory::upsert_catalog_item;
    use crate::state::StoreState;

    pub(crate) async fn store() -> StoreState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        StoreState::load(db).await.unwrap()
    }

    /// A single-frame sale with an optional cash deposit.
    pub(crate) fn frame_sale(price: i64, deposit: i64) -> InvoiceDraft {
        InvoiceDraft {
            patient_name: "Fatima Al-Sabah".into(),
            patient_phone: "55551234".into(),
            items: vec![InvoiceItem::Frame {
                frame_id: None,
                brand: "Ray-Ban".into(),
                model: "RB5154".into(),
                color: LocalizedText::bilingual("Brown", "بني"),
                size: "51-21-145".into(),
                price: Money::from_major(price),
            }],
            deposit: Money::from_major(deposit),
            ..Default::default()
        }
    }

    /// Single vision 10, anti-reflective 8, 1.6 index 5.
    pub(crate) async fn seed_lenses(store: &StoreState) {
        let items = [
            CatalogItem::LensType(LensType {
                id: "sv".into(),
                name: LocalizedText::bilingual("Single vision", "أحادية البؤرة"),
                category: None,
                price: Some(Money::from_major(10)),
            }),
            CatalogItem::LensCoating(LensCoating {
                id: "ar".into(),
                name: LocalizedText::bilingual("Anti-reflective", "مضاد للانعكاس"),
                price: Some(Money::from_major(8)),
                is_photochromic: false,
                colors: vec![],
            }),
            CatalogItem::LensThickness(LensThickness {
                id: "t16".into(),
                name: LocalizedText::bilingual("1.6", "1.6"),
                price: Some(Money::from_major(5)),
            }),
        ];
        for item in items {
            upsert_catalog_item(store, item).await.unwrap();
        }
    }

    pub(crate) fn location(id: &str, is_default: bool) -> StoreLocation {
        StoreLocation {
            id: id.into(),
            name: LocalizedText::bilingual(id, format!("فرع {}", id)),
            address: LocalizedText::bilingual("Kuwait", "الكويت"),
            phone: "22223333".into(),
            is_default,
        }
    }
}
