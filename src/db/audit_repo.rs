// src/db/audit_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::db_utils::acquire_rls_connection;
use crate::common::error::AppError;
use crate::models::audit::{AuditLogEntry, NewAuditEntry};

// Porta de escrita da trilha. O serviço de auditoria só conhece este trait,
// então os testes simulam uma indisponibilidade de storage com um sink que
// falha sempre.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> anyhow::Result<()>;

    /// Grava um lote em UMA transação (tudo ou nada).
    async fn append_batch(&self, entries: Vec<NewAuditEntry>) -> anyhow::Result<()>;
}

// A implementação real, apontada para a pool ELEVADA (credencial de serviço).
// A credencial da aplicação não tem grant de INSERT em audit_log, então o
// usuário que agiu jamais forja ou apaga a própria trilha.
#[derive(Clone)]
pub struct PgAuditSink {
    elevated_pool: PgPool,
}

impl PgAuditSink {
    pub fn new(elevated_pool: PgPool) -> Self {
        Self { elevated_pool }
    }
}

const INSERT_ENTRY: &str = r#"
    INSERT INTO audit_log
        (tenant_id, user_id, action, entity_type, entity_id,
         metadata, sensitivity, ip_address, user_agent)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
"#;

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, entry: NewAuditEntry) -> anyhow::Result<()> {
        sqlx::query(INSERT_ENTRY)
            .bind(entry.tenant_id)
            .bind(entry.user_id)
            .bind(&entry.action)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(&entry.metadata)
            .bind(entry.sensitivity.as_str())
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .execute(&self.elevated_pool)
            .await?;

        Ok(())
    }

    async fn append_batch(&self, entries: Vec<NewAuditEntry>) -> anyhow::Result<()> {
        let mut tx = self.elevated_pool.begin().await?;

        for entry in &entries {
            sqlx::query(INSERT_ENTRY)
                .bind(entry.tenant_id)
                .bind(entry.user_id)
                .bind(&entry.action)
                .bind(&entry.entity_type)
                .bind(entry.entity_id)
                .bind(&entry.metadata)
                .bind(entry.sensitivity.as_str())
                .bind(&entry.ip_address)
                .bind(&entry.user_agent)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// ---
// Leitura da trilha (caminho do admin com view_audit_logs)
// ---
// A leitura usa a credencial da APLICAÇÃO, escopada por RLS: só as
// escritas passam pela pool elevada.
#[derive(Clone)]
pub struct AuditQueryRepository {
    pool: PgPool,
}

impl AuditQueryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        entity_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let mut conn = acquire_rls_connection(&self.pool, tenant_id, user_id).await?;

        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, tenant_id, user_id, action, entity_type, entity_id,
                   metadata, sensitivity, ip_address, user_agent, created_at
            FROM audit_log
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR entity_type = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(entity_type)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }
}
