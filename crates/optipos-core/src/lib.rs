//! # optipos-core: Pure Business Logic for OptiPOS
//!
//! Everything an optical store does with its data, as pure functions with
//! zero I/O: lens pricing, invoice and payment math, refunds and exchanges,
//! work orders, receipts, and sales summaries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        OptiPOS Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (web)                               │   │
//! │  │   Patients ──► Create Invoice ──► Receipt ──► Refund/Exchange   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    optipos-app (AppState)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ optipos-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   pricing   invoice   refund   work_order   receipt   store     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────┐   ┌───────────────▼────────────────┐  │
//! │  │  optipos-db (SQLite)        │   │  optipos-sync (hosted backend) │  │
//! │  └─────────────────────────────┘   └────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Three-decimal integer money
//! - [`locale`] - English/Arabic lookup and [`LocalizedText`]
//! - [`catalog`] - Frames, lens components, contact lenses, services
//! - [`pricing`] - Lens price resolution
//! - [`patient`] - Patients and prescription history
//! - [`invoice`] - Invoice assembly and payments
//! - [`work_order`] - Lab tickets derived from invoices
//! - [`refund`] - Refunds and the exchange state machine
//! - [`location`] - Store locations
//! - [`navigation`] - Typed routes for the dashboard shell
//! - [`receipt`] - Bilingual receipt model and 80mm text rendering
//! - [`reports`] - Daily and monthly sales summaries
//! - [`store`] - Immutable snapshot store driven by commands
//! - [`validation`] - Form-level input checks
//!
//! Time is always passed in (`now: DateTime<Utc>`), so every function here
//! is deterministic apart from the UUIDs it mints.
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use optipos_core::invoice::{Invoice, InvoiceDraft, InvoiceItem, NewPayment};
//! use optipos_core::locale::LocalizedText;
//! use optipos_core::money::Money;
//!
//! let draft = InvoiceDraft {
//!     patient_name: "Fatima".into(),
//!     items: vec![InvoiceItem::Other {
//!         description: LocalizedText::bilingual("Frame", "إطار"),
//!         price: Money::from_major(45),
//!     }],
//!     deposit: Money::from_major(20),
//!     ..Default::default()
//! };
//!
//! let mut invoice = Invoice::create(draft, "INV-20261019-0001".into(), Utc::now());
//! assert_eq!(invoice.remaining.to_string(), "25.000");
//!
//! invoice.add_payment(NewPayment::cash(Money::from_major(25)), Utc::now());
//! assert!(invoice.is_paid);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod invoice;
pub mod locale;
pub mod location;
pub mod money;
pub mod navigation;
pub mod numbering;
pub mod patient;
pub mod pricing;
pub mod receipt;
pub mod refund;
pub mod reports;
pub mod store;
pub mod validation;
pub mod work_order;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{Catalog, CatalogItem, CatalogKind};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{Invoice, InvoiceDraft, InvoiceItem, NewPayment, Payment, PaymentMethod};
pub use locale::{Locale, LocalizedText, Translator};
pub use money::Money;
pub use patient::Patient;
pub use pricing::{LensPricingCombination, PricingTable};
pub use refund::{ExchangeState, RefundExchange};
pub use store::{Change, Command, Snapshot};
pub use work_order::{WorkOrder, WorkOrderStatus};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Settings key holding the UI language.
pub const LANGUAGE_KEY: &str = "language";

/// Settings key of the persisted patient collection.
pub const PATIENT_STORE_KEY: &str = "patient-store";
