//! # Patient Repository
//!
//! Patients persist as one JSON document under the `patient-store` key,
//! the same shape the web client keeps in its local storage.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::settings;
use optipos_core::{Patient, PATIENT_STORE_KEY};

#[derive(Debug, Clone)]
pub struct PatientRepository {
    pool: SqlitePool,
}

impl PatientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PatientRepository { pool }
    }

    /// All patients, in registration order. Empty when nothing is stored.
    pub async fn load(&self) -> DbResult<Vec<Patient>> {
        match settings::get(&self.pool, PATIENT_STORE_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn find(&self, id: &str) -> DbResult<Option<Patient>> {
        Ok(self.load().await?.into_iter().find(|p| p.id == id))
    }

    pub async fn save_all(&self, patients: &[Patient]) -> DbResult<()> {
        save_all(&self.pool, patients).await
    }
}

pub(crate) async fn save_all<'e, E>(executor: E, patients: &[Patient]) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(count = patients.len(), "Saving patient store");
    let json = serde_json::to_string(patients)?;
    settings::put(executor, PATIENT_STORE_KEY, &json).await
}
