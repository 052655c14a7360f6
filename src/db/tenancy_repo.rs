// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::tenancy::{Invitation, Membership, MembershipSummary, PublicTenant, Tenant};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Carrega um tenant pelo ID do claim, somente se ainda estiver ativo.
    /// Tenant desativado depois da emissão do token = falha dura na resolução.
    pub async fn find_active_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, slug, name, settings, is_active, created_at, updated_at
            FROM tenants
            WHERE id = $1 AND is_active = true
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Resolução pública por slug (caminho SEM autenticação, baixa confiança).
    /// Devolve apenas dados de vitrine, nunca settings nem IDs internos.
    pub async fn find_public_by_slug(&self, slug: &str) -> Result<Option<PublicTenant>, AppError> {
        let tenant = sqlx::query_as::<_, PublicTenant>(
            r#"
            SELECT slug, name
            FROM tenants
            WHERE slug = $1 AND is_active = true
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// O vínculo usável entre usuário e escola: ativo E não soft-deletado.
    /// Vínculo com deleted_at preenchido NUNCA volta desta consulta.
    pub async fn find_usable_membership(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, user_id, tenant_id, role_id, status, preferences,
                   created_at, updated_at, deleted_at
            FROM memberships
            WHERE user_id = $1
              AND tenant_id = $2
              AND status = 'active'
              AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    /// Lista os vínculos usáveis do usuário para a tela de seleção de escola.
    pub async fn list_membership_summaries(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipSummary>, AppError> {
        let memberships = sqlx::query_as::<_, MembershipSummary>(
            r#"
            SELECT t.id AS tenant_id, t.name AS tenant_name, t.slug AS tenant_slug,
                   r.name AS role_name
            FROM memberships m
            JOIN tenants t ON t.id = m.tenant_id
            JOIN roles r ON r.id = m.role_id
            WHERE m.user_id = $1
              AND m.status = 'active'
              AND m.deleted_at IS NULL
              AND t.is_active = true
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    pub async fn find_invitation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, tenant_id, email, role_id, token, created_at, accepted_at
            FROM invitations
            WHERE token = $1 AND accepted_at IS NULL
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    /// Marca o convite como aceito. Devolve false se alguém já o consumiu
    /// entre a leitura e a escrita (corrida de duplo clique).
    pub async fn mark_invitation_accepted<'e, E>(
        &self,
        executor: E,
        invitation_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET accepted_at = now()
            WHERE id = $1 AND accepted_at IS NULL
            "#,
        )
        .bind(invitation_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Cria o vínculo do usuário com a escola (tabela-ponte).
    pub async fn create_membership<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Membership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (user_id, tenant_id, role_id)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, tenant_id, role_id, status, preferences,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(role_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Usuário já vinculado a esta escola.".into(),
                    );
                }
            }
            e.into()
        })?;

        Ok(membership)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
