//! # State Module
//!
//! Explicit application state, passed to every command. Each command takes
//! only the pieces it needs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │ StoreState   │  │ SessionState │  │ SyncState<B> │  │ ConfigState │  │
//! │  │              │  │              │  │              │  │             │  │
//! │  │ Arc<Snapshot>│  │ translator   │  │ SyncEngine   │  │ store name  │  │
//! │  │ + Database   │  │ navigator    │  │ status DTO   │  │ receipt     │  │
//! │  │              │  │ location sel.│  │              │  │ width       │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • StoreState: RwLock<Arc<Snapshot>> for readers, Mutex for writers    │
//! │  • SessionState: std locks, never held across an await                 │
//! │  • SyncState: engine has its own single-flight guard                   │
//! │  • ConfigState: read-only after startup                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod session;
mod store;
mod sync;

pub use config::{ConfigState, RECEIPT_WIDTH_ENV, STORE_NAME_ENV};
pub use session::SessionState;
pub use store::StoreState;
pub use sync::{SyncState, SyncStatusDto};
