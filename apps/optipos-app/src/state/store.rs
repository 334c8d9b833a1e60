//! # Store State
//!
//! The single source of truth for domain data: an immutable [`Snapshot`]
//! behind an `Arc`, replaced wholesale by every command.
//!
//! ## Command Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  execute(command)                                                       │
//! │     │                                                                   │
//! │     ├─ writer.lock()            one command at a time                   │
//! │     ├─ current.apply(command)   pure, returns (next, change)            │
//! │     ├─ db.persist_change()      one SQLite transaction                  │
//! │     └─ swap snapshot            readers see old or new, never half      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed apply or a failed write leaves the published snapshot as it
//! was.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use optipos_core::{Change, Command, Snapshot};
use optipos_db::{Database, DbResult};

use crate::error::ApiResult;

pub struct StoreState {
    db: Database,
    snapshot: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl StoreState {
    /// Loads everything persisted so far.
    pub async fn load(db: Database) -> DbResult<Self> {
        let snapshot = db.load_snapshot().await?;
        info!(
            patients = snapshot.patients.len(),
            invoices = snapshot.invoices.len(),
            frames = snapshot.catalog.frames.len(),
            "Store loaded"
        );
        Ok(StoreState {
            db,
            snapshot: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The current snapshot. Cheap; later commands do not change it.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies, persists, then publishes a command.
    pub async fn execute(&self, command: Command) -> ApiResult<Change> {
        let _writer = self.writer.lock().await;
        let name = command.name();

        let current = self.snapshot();
        let (next, change) = current.apply(command, Utc::now())?;
        self.db.persist_change(&change, &next).await?;

        let version = next.version;
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(next);

        debug!(command = name, version, "Snapshot published");
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optipos_core::patient::NewPatient;
    use optipos_db::DbConfig;

    async fn store() -> StoreState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        StoreState::load(db).await.unwrap()
    }

    #[tokio::test]
    async fn test_execute_publishes_new_snapshot() {
        let store = store().await;
        let before = store.snapshot();

        store
            .execute(Command::RegisterPatient(NewPatient {
                name: "Fatima".into(),
                phone: "55551234".into(),
                ..Default::default()
            }))
            .await
            .unwrap();

        let after = store.snapshot();
        assert!(before.patients.is_empty());
        assert_eq!(after.patients.len(), 1);
        assert_eq!(after.version, before.version + 1);
    }

    #[tokio::test]
    async fn test_failed_command_leaves_snapshot_untouched() {
        let store = store().await;
        let err = store
            .execute(Command::AddPatientNote {
                patient_id: "missing".into(),
                text: "Prefers morning visits".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
        assert_eq!(store.snapshot().version, 0);
    }

    #[tokio::test]
    async fn test_reload_sees_persisted_commands() {
        let store = store().await;
        store
            .execute(Command::RegisterPatient(NewPatient {
                name: "Ahmad".into(),
                phone: "99887766".into(),
                ..Default::default()
            }))
            .await
            .unwrap();

        let reloaded = StoreState::load(store.db().clone()).await.unwrap();
        assert_eq!(reloaded.snapshot().patients[0].name, "Ahmad");
    }
}
