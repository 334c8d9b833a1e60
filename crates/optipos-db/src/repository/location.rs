//! # Store Location Repository

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use optipos_core::location::{LocationRegistry, StoreLocation};

#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// All locations as a registry; the single-default rule is re-applied
    /// on load.
    pub async fn load(&self) -> DbResult<LocationRegistry> {
        let documents = sqlx::query_scalar::<_, String>(
            "SELECT document FROM store_locations ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let locations = documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
            .collect::<DbResult<Vec<StoreLocation>>>()?;
        Ok(LocationRegistry::new(locations))
    }

    pub async fn save(&self, location: &StoreLocation) -> DbResult<()> {
        save(&self.pool, location).await
    }
}

pub(crate) async fn save<'e, E>(executor: E, location: &StoreLocation) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %location.id, is_default = location.is_default, "Saving store location");

    sqlx::query(
        r#"
        INSERT INTO store_locations (id, is_default, document)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (id) DO UPDATE SET
            is_default = excluded.is_default,
            document = excluded.document
        "#,
    )
    .bind(&location.id)
    .bind(location.is_default)
    .bind(serde_json::to_string(location)?)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use optipos_core::location::StoreLocation;
    use optipos_core::LocalizedText;

    fn location(id: &str, is_default: bool) -> StoreLocation {
        StoreLocation {
            id: id.into(),
            name: LocalizedText::bilingual("Salmiya", "السالمية"),
            address: LocalizedText::bilingual("Salem Al Mubarak St", "شارع سالم المبارك"),
            phone: "22223333".into(),
            is_default,
        }
    }

    #[tokio::test]
    async fn test_load_keeps_single_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.locations();

        repo.save(&location("a", true)).await.unwrap();
        repo.save(&location("b", true)).await.unwrap();

        let registry = repo.load().await.unwrap();
        assert_eq!(registry.all().len(), 2);
        assert_eq!(registry.default_location().map(|l| l.id.as_str()), Some("a"));
        assert_eq!(
            registry.resolve_selected(Some("gone")).map(|l| l.id.as_str()),
            Some("a")
        );
    }
}
