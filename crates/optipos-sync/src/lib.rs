//! # optipos-sync: Cloud Sync for OptiPOS
//!
//! Pushes the local store to a hosted relational backend so head office sees
//! catalog, patients, sales and daily/monthly summaries. The store keeps
//! working when the backend is down; a sync only ever reads local data.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           optipos-sync                                  │
//! │                                                                         │
//! │  Snapshot ──► rows.rs ──► SyncEngine ──► RemoteBackend                  │
//! │  (core)       (JSON rows)  │               ├─ RestBackend (HTTP)        │
//! │                            │               └─ InMemoryBackend (tests)   │
//! │                            │                                            │
//! │                            ├─ batches of `batch_size`, per-row fallback │
//! │                            ├─ exponential backoff on transient errors   │
//! │                            ├─ frames de-duplicated (frames.rs)          │
//! │                            └─ ProgressReporter after every step         │
//! │                                                                         │
//! │  SyncConfig (config.rs): sync.toml + OPTIPOS_* environment overrides    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use optipos_sync::{NoProgress, RestBackend, SyncConfig, SyncEngine};
//!
//! let config = SyncConfig::load_or_default(None);
//! let backend = RestBackend::new(&config.backend)?;
//! let engine = SyncEngine::new(backend, config);
//!
//! let summary = engine.sync_all(&snapshot, &NoProgress).await?;
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod frames;
pub mod progress;
pub mod rows;

pub use backend::{InMemoryBackend, RemoteBackend, RestBackend};
pub use config::{BackendConfig, StoreConfig, SyncConfig, SyncMode, SyncSettings};
pub use engine::{SyncEngine, SyncTable};
pub use error::{SyncError, SyncResult};
pub use progress::{NoProgress, ProgressReporter, SyncProgress, SyncSummary, TableReport};
