//! # Refund / Exchange Repository
//!
//! One row per refund or exchange record. The record is also embedded in
//! the original invoice's document; this table is the ledger reports and
//! sync read from.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use optipos_core::refund::RefundExchangeKind;
use optipos_core::RefundExchange;

fn kind_str(kind: RefundExchangeKind) -> &'static str {
    match kind {
        RefundExchangeKind::Refund => "refund",
        RefundExchangeKind::Exchange => "exchange",
    }
}

#[derive(Debug, Clone)]
pub struct RefundRepository {
    pool: SqlitePool,
}

impl RefundRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RefundRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<RefundExchange>> {
        let documents = sqlx::query_scalar::<_, String>(
            "SELECT document FROM refund_records ORDER BY date, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
            .collect()
    }

    pub async fn for_invoice(&self, invoice_id: &str) -> DbResult<Option<RefundExchange>> {
        let document = sqlx::query_scalar::<_, String>(
            "SELECT document FROM refund_records WHERE original_invoice_id = ?1",
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(DbError::from))
            .transpose()
    }

    pub async fn save(&self, record: &RefundExchange) -> DbResult<()> {
        save(&self.pool, record).await
    }
}

pub(crate) async fn save<'e, E>(executor: E, record: &RefundExchange) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        refund_number = %record.refund_number,
        kind = kind_str(record.kind),
        amount = %record.amount,
        "Saving refund record"
    );

    sqlx::query(
        r#"
        INSERT INTO refund_records (
            id, refund_number, original_invoice_id, kind, amount_minor, date, document
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (id) DO UPDATE SET
            amount_minor = excluded.amount_minor,
            document = excluded.document
        "#,
    )
    .bind(&record.id)
    .bind(&record.refund_number)
    .bind(&record.original_invoice_id)
    .bind(kind_str(record.kind))
    .bind(record.amount.minor())
    .bind(record.date)
    .bind(serde_json::to_string(record)?)
    .execute(executor)
    .await?;

    Ok(())
}
