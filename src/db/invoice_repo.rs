// src/db/invoice_repo.rs

use sqlx::PgPool;

use crate::common::error::AppError;
use crate::models::billing::{Invoice, InvoiceStatus};

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Busca pela referência externa do processador (chega no webhook).
    pub async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, tenant_id, external_ref, status, created_at, updated_at
            FROM invoices
            WHERE external_ref = $1
            "#,
        )
        .bind(external_ref)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Aplica a transição SOMENTE se o estado atual ainda for o esperado
    /// (webhooks chegam fora de ordem e em duplicata).
    pub async fn transition_status(
        &self,
        external_ref: &str,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $3, updated_at = now()
            WHERE external_ref = $1 AND status = $2
            "#,
        )
        .bind(external_ref)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
