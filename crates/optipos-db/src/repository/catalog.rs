//! # Catalog Repository
//!
//! Catalog items live in `catalog_items` (one JSON document per row,
//! keyed by kind and id). Lens pricing combinations have their own table with a
//! UNIQUE constraint on the (type, coating, thickness) triple.

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use optipos_core::catalog::{Catalog, CatalogItem, CatalogKind};
use optipos_core::pricing::{LensPricingCombination, PricingTable};
use optipos_core::Money;

#[derive(Debug, Clone, sqlx::FromRow)]
struct PricingRow {
    id: String,
    lens_type_id: String,
    coating_id: String,
    thickness_id: String,
    price_minor: i64,
}

impl From<PricingRow> for LensPricingCombination {
    fn from(row: PricingRow) -> Self {
        LensPricingCombination {
            id: row.id,
            lens_type_id: row.lens_type_id,
            coating_id: row.coating_id,
            thickness_id: row.thickness_id,
            price: Money::from_minor(row.price_minor),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Loads the whole catalog with its pricing table.
    ///
    /// A row whose document no longer parses is skipped with a warning
    /// rather than failing the whole load.
    pub async fn load(&self) -> DbResult<Catalog> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT id, document FROM catalog_items ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut catalog = Catalog::default();
        for (id, document) in rows {
            match serde_json::from_str::<CatalogItem>(&document) {
                Ok(item) => {
                    catalog.upsert(item);
                }
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable catalog item"),
            }
        }

        catalog.pricing = PricingTable::from_records(self.pricing().await?);
        debug!(
            frames = catalog.frames.len(),
            pricing = catalog.pricing.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub async fn list(&self, kind: CatalogKind) -> DbResult<Vec<CatalogItem>> {
        let documents = sqlx::query_scalar::<_, String>(
            "SELECT document FROM catalog_items WHERE kind = ?1 ORDER BY rowid",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
            .collect()
    }

    pub async fn pricing(&self) -> DbResult<Vec<LensPricingCombination>> {
        let rows = sqlx::query_as::<_, PricingRow>(
            r#"
            SELECT id, lens_type_id, coating_id, thickness_id, price_minor
            FROM lens_pricing_combinations
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn upsert_item(&self, item: &CatalogItem) -> DbResult<()> {
        upsert_item(&self.pool, item).await
    }

    pub async fn delete_item(&self, kind: CatalogKind, id: &str) -> DbResult<()> {
        delete_item(&self.pool, kind, id).await
    }

    pub async fn upsert_pricing(&self, combination: &LensPricingCombination) -> DbResult<()> {
        upsert_pricing(&self.pool, combination).await
    }

    pub async fn delete_pricing(&self, id: &str) -> DbResult<()> {
        delete_pricing(&self.pool, id).await
    }
}

pub(crate) async fn upsert_item<'e, E>(executor: E, item: &CatalogItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(kind = %item.kind(), id = %item.id(), "Saving catalog item");

    sqlx::query(
        r#"
        INSERT INTO catalog_items (id, kind, document, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (kind, id) DO UPDATE SET
            document = excluded.document,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(item.id())
    .bind(item.kind().as_str())
    .bind(serde_json::to_string(item)?)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn delete_item<'e, E>(executor: E, kind: CatalogKind, id: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM catalog_items WHERE id = ?1 AND kind = ?2")
        .bind(id)
        .bind(kind.as_str())
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(kind.to_string(), id));
    }
    Ok(())
}

pub(crate) async fn upsert_pricing<'e, E>(
    executor: E,
    combination: &LensPricingCombination,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %combination.id, price = %combination.price, "Saving lens price");

    sqlx::query(
        r#"
        INSERT INTO lens_pricing_combinations (
            id, lens_type_id, coating_id, thickness_id, price_minor, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (id) DO UPDATE SET
            lens_type_id = excluded.lens_type_id,
            coating_id = excluded.coating_id,
            thickness_id = excluded.thickness_id,
            price_minor = excluded.price_minor,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&combination.id)
    .bind(&combination.lens_type_id)
    .bind(&combination.coating_id)
    .bind(&combination.thickness_id)
    .bind(combination.price.minor())
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn delete_pricing<'e, E>(executor: E, id: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM lens_pricing_combinations WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use optipos_core::catalog::{CatalogItem, CatalogKind, Frame, LensCoating, LensType};
    use optipos_core::pricing::LensPricingCombination;
    use optipos_core::{LocalizedText, Money};

    fn frame(id: &str) -> CatalogItem {
        CatalogItem::Frame(Frame {
            id: id.into(),
            brand: "Oakley".into(),
            model: "Holbrook".into(),
            color: LocalizedText::bilingual("Black", "أسود"),
            size: "55-18-137".into(),
            price: Money::from_major(38),
            stock: 3,
        })
    }

    #[tokio::test]
    async fn test_catalog_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.upsert_item(&frame("f1")).await.unwrap();
        repo.upsert_item(&CatalogItem::LensType(LensType {
            id: "lt".into(),
            name: LocalizedText::bilingual("Progressive", "متعددة البؤر"),
            category: None,
            price: Some(Money::from_major(40)),
        }))
        .await
        .unwrap();
        repo.upsert_pricing(&LensPricingCombination::new("lt", "c", "t", Money::from_major(55)))
            .await
            .unwrap();

        let catalog = repo.load().await.unwrap();
        assert_eq!(catalog.frames.len(), 1);
        assert_eq!(catalog.lens_types.len(), 1);
        assert_eq!(
            catalog.pricing.find("lt", "c", "t").map(|c| c.price),
            Some(Money::from_major(55))
        );
        assert_eq!(repo.list(CatalogKind::Frame).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_price_for_same_triple_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.upsert_pricing(&LensPricingCombination::new("a", "b", "c", Money::from_major(18)))
            .await
            .unwrap();
        let err = repo
            .upsert_pricing(&LensPricingCombination::new("a", "b", "c", Money::from_major(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_item_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.upsert_item(&frame("f1")).await.unwrap();
        repo.delete_item(CatalogKind::Frame, "f1").await.unwrap();
        let err = repo.delete_item(CatalogKind::Frame, "f1").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_same_id_under_two_kinds_keeps_both_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.upsert_item(&CatalogItem::LensType(LensType {
            id: "1".into(),
            name: LocalizedText::bilingual("Bifocal", "ثنائية البؤرة"),
            category: None,
            price: Some(Money::from_major(25)),
        }))
        .await
        .unwrap();
        repo.upsert_item(&CatalogItem::LensCoating(LensCoating {
            id: "1".into(),
            name: LocalizedText::bilingual("Hard coat", "طبقة صلبة"),
            price: Some(Money::from_major(4)),
            is_photochromic: false,
            colors: vec![],
        }))
        .await
        .unwrap();

        let catalog = repo.load().await.unwrap();
        assert_eq!(catalog.lens_types.len(), 1);
        assert_eq!(catalog.lens_coatings.len(), 1);

        repo.delete_item(CatalogKind::LensType, "1").await.unwrap();
        assert_eq!(repo.list(CatalogKind::LensCoating).await.unwrap().len(), 1);
    }
}
