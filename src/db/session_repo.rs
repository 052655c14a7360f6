// src/db/session_repo.rs

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::Session};

// Sessões emitidas no login. Revogar aqui é o que faz o servidor honrar
// um logout (manual, por inatividade ou disparado por outra sessão):
// o token morto falha a resolução na próxima requisição.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id)
            VALUES ($1, $2)
            RETURNING id, user_id, created_at, revoked_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Sessão viva = existe e não foi revogada.
    pub async fn is_alive(&self, session_id: Uuid) -> Result<bool, AppError> {
        let alive = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE id = $1 AND revoked_at IS NULL
            )
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(alive)
    }

    pub async fn revoke(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET revoked_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(session_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
