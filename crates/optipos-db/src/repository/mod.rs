//! # Repository Module
//!
//! One repository per stored entity.
//!
//! ## Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Command handler                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::persist_change(&change)  ──► one transaction                │
//! │       │                                                                 │
//! │       ├── invoice::save(&mut *tx, …)                                   │
//! │       ├── work_order::save(&mut *tx, …)                                │
//! │       └── refund::save(&mut *tx, …)                                    │
//! │                                                                         │
//! │  Each module exposes a pool-backed repository for reads and            │
//! │  executor-generic writes, so the same write runs on the pool or        │
//! │  inside a transaction.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod invoice;
pub mod location;
pub mod patient;
pub mod refund;
pub mod settings;
pub mod work_order;
