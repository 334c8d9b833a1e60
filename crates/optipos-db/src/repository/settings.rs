//! # Settings Repository
//!
//! Named values that survive restarts:
//!
//! | Key                | Value                          |
//! |--------------------|--------------------------------|
//! | `language`         | `en` / `ar`                    |
//! | `selectedLocation` | store location id              |
//! | `patient-store`    | JSON array of patients         |

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::error::DbResult;
use optipos_core::location::SELECTED_LOCATION_KEY;
use optipos_core::{Locale, LANGUAGE_KEY};

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        get(&self.pool, key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        put(&self.pool, key, value).await
    }

    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stored UI language; an unreadable value is ignored.
    pub async fn language(&self) -> DbResult<Option<Locale>> {
        Ok(self.get(LANGUAGE_KEY).await?.and_then(|raw| {
            raw.parse::<Locale>()
                .map_err(|e| warn!(value = %raw, error = %e, "Ignoring stored language"))
                .ok()
        }))
    }

    pub async fn set_language(&self, locale: Locale) -> DbResult<()> {
        self.set(LANGUAGE_KEY, locale.code()).await
    }

    pub async fn selected_location(&self) -> DbResult<Option<String>> {
        self.get(SELECTED_LOCATION_KEY).await
    }

    pub async fn set_selected_location(&self, location_id: &str) -> DbResult<()> {
        self.set(SELECTED_LOCATION_KEY, location_id).await
    }
}

pub(crate) async fn get<'e, E>(executor: E, key: &str) -> DbResult<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(executor)
        .await?;
    Ok(value)
}

pub(crate) async fn put<'e, E>(executor: E, key: &str, value: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(key, "Saving setting");

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}
