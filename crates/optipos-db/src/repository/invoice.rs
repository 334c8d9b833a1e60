//! # Invoice Repository
//!
//! ```text
//! invoices
//! ├── invoice_number   UNIQUE, INV-YYYYMMDD-NNNN
//! ├── patient_id       lookup for the patient profile
//! ├── total / remaining / flags   for list screens and reports
//! └── document         full invoice: items, payments, edit history, refund
//! ```

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use optipos_core::Invoice;

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// All invoices, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Invoice>> {
        let documents = sqlx::query_scalar::<_, String>(
            "SELECT document FROM invoices ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        parse_all(&documents)
    }

    pub async fn list_for_patient(&self, patient_id: &str) -> DbResult<Vec<Invoice>> {
        let documents = sqlx::query_scalar::<_, String>(
            "SELECT document FROM invoices WHERE patient_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;
        parse_all(&documents)
    }

    pub async fn get(&self, id: &str) -> DbResult<Invoice> {
        let document =
            sqlx::query_scalar::<_, String>("SELECT document FROM invoices WHERE id = ?1")
                .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;
        Ok(serde_json::from_str(&document)?)
    }

    pub async fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let document = sqlx::query_scalar::<_, String>(
            "SELECT document FROM invoices WHERE invoice_number = ?1",
        )
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await?;
        document
            .map(|doc| serde_json::from_str(&doc).map_err(DbError::from))
            .transpose()
    }

    pub async fn save(&self, invoice: &Invoice) -> DbResult<()> {
        save(&self.pool, invoice).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn parse_all(documents: &[String]) -> DbResult<Vec<Invoice>> {
    documents
        .iter()
        .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
        .collect()
}

pub(crate) async fn save<'e, E>(executor: E, invoice: &Invoice) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        invoice_number = %invoice.invoice_number,
        total = %invoice.total,
        remaining = %invoice.remaining,
        "Saving invoice"
    );

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, patient_id, total_minor, remaining_minor,
            is_paid, is_refunded, is_exchanged, created_at, document
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT (id) DO UPDATE SET
            patient_id = excluded.patient_id,
            total_minor = excluded.total_minor,
            remaining_minor = excluded.remaining_minor,
            is_paid = excluded.is_paid,
            is_refunded = excluded.is_refunded,
            is_exchanged = excluded.is_exchanged,
            document = excluded.document
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.invoice_number)
    .bind(&invoice.patient_id)
    .bind(invoice.total.minor())
    .bind(invoice.remaining.minor())
    .bind(invoice.is_paid)
    .bind(invoice.is_refunded)
    .bind(invoice.is_exchanged)
    .bind(invoice.created_at)
    .bind(serde_json::to_string(invoice)?)
    .execute(executor)
    .await?;

    Ok(())
}
