//! # optipos-db: Local Storage for OptiPOS
//!
//! Durable client-side storage on SQLite. Everything the store holds
//! (patients, catalog, invoices, work orders, refunds, locations, settings)
//! survives a restart here.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          optipos-db                                     │
//! │                                                                         │
//! │  ┌──────────────┐     ┌──────────────────────────────────────────────┐ │
//! │  │  Database    │────►│  Repositories                                │ │
//! │  │  (pool.rs)   │     │  settings  patient  catalog  invoice         │ │
//! │  └──────┬───────┘     │  work_order  refund  location                │ │
//! │         │             └──────────────────────────────────────────────┘ │
//! │         ▼                                                               │
//! │  ┌──────────────┐     ┌──────────────────────────────────────────────┐ │
//! │  │  migrations  │     │  snapshot.rs                                 │ │
//! │  │  (embedded)  │     │  load_snapshot / persist_change              │ │
//! │  └──────────────┘     └──────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use optipos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()).await?;
//! let snapshot = db.load_snapshot().await?;
//!
//! let (next, change) = snapshot.apply(command, Utc::now())?;
//! db.persist_change(&change, &next).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
mod snapshot;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DB_PATH_ENV};
pub use repository::catalog::CatalogRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::location::LocationRepository;
pub use repository::patient::PatientRepository;
pub use repository::refund::RefundRepository;
pub use repository::settings::SettingsRepository;
pub use repository::work_order::WorkOrderRepository;
