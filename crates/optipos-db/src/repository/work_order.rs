//! # Work Order Repository

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use optipos_core::{WorkOrder, WorkOrderStatus};

#[derive(Debug, Clone)]
pub struct WorkOrderRepository {
    pool: SqlitePool,
}

impl WorkOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WorkOrderRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<WorkOrder>> {
        let documents = sqlx::query_scalar::<_, String>(
            "SELECT document FROM work_orders ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        parse_all(&documents)
    }

    /// Orders currently in the given status, e.g. the lab's pending queue.
    pub async fn list_by_status(&self, status: WorkOrderStatus) -> DbResult<Vec<WorkOrder>> {
        let documents = sqlx::query_scalar::<_, String>(
            "SELECT document FROM work_orders WHERE status = ?1 ORDER BY created_at, rowid",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        parse_all(&documents)
    }

    pub async fn get(&self, id: &str) -> DbResult<WorkOrder> {
        let document =
            sqlx::query_scalar::<_, String>("SELECT document FROM work_orders WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("WorkOrder", id))?;
        Ok(serde_json::from_str(&document)?)
    }

    pub async fn save(&self, order: &WorkOrder) -> DbResult<()> {
        save(&self.pool, order).await
    }
}

fn parse_all(documents: &[String]) -> DbResult<Vec<WorkOrder>> {
    documents
        .iter()
        .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
        .collect()
}

pub(crate) async fn save<'e, E>(executor: E, order: &WorkOrder) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        work_order_number = %order.work_order_number,
        status = %order.status,
        "Saving work order"
    );

    sqlx::query(
        r#"
        INSERT INTO work_orders (id, work_order_number, invoice_id, status, created_at, document)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (id) DO UPDATE SET
            status = excluded.status,
            document = excluded.document
        "#,
    )
    .bind(&order.id)
    .bind(&order.work_order_number)
    .bind(&order.invoice_id)
    .bind(order.status.as_str())
    .bind(order.created_at)
    .bind(serde_json::to_string(order)?)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use optipos_core::invoice::{InvoiceDraft, InvoiceItem};
    use optipos_core::{Invoice, LocalizedText, Money, WorkOrder, WorkOrderStatus};

    fn invoice() -> Invoice {
        Invoice::create(
            InvoiceDraft {
                patient_name: "Fatima".into(),
                items: vec![InvoiceItem::Other {
                    description: LocalizedText::bilingual("Frame", "إطار"),
                    price: Money::from_major(45),
                }],
                ..Default::default()
            },
            "INV-20261019-0001".into(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_status_change_is_persisted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inv = invoice();
        db.invoices().save(&inv).await.unwrap();

        let repo = db.work_orders();
        let mut order = WorkOrder::from_invoice(&inv, "WO-20261019-0001".into(), Utc::now());
        repo.save(&order).await.unwrap();
        assert_eq!(repo.list_by_status(WorkOrderStatus::Pending).await.unwrap().len(), 1);

        order.set_status(WorkOrderStatus::InProgress, Utc::now());
        repo.save(&order).await.unwrap();

        let loaded = repo.get(&order.id).await.unwrap();
        assert_eq!(loaded.status, WorkOrderStatus::InProgress);
        assert_eq!(loaded.status_history.len(), 1);
        assert!(repo.list_by_status(WorkOrderStatus::Pending).await.unwrap().is_empty());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_work_order_requires_its_invoice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = WorkOrder::from_invoice(&invoice(), "WO-20261019-0001".into(), Utc::now());

        let err = db.work_orders().save(&order).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
