use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Adquire uma conexão da pool e define as variáveis RLS (a "chave").
/// As policies do banco filtram por current_setting('app.tenant_id'),
/// então mesmo um WHERE esquecido no código não vaza dados de outra escola.
pub(crate) async fn acquire_rls_connection(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {
    // 1. Adquire conexão
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut conn = pool.acquire().await?;

    // 2. Define Tenant ID
    sqlx::query("SELECT set_config('app.tenant_id', $1, false)")
        .bind(tenant_id.to_string())
        .execute(&mut *conn)
        .await?;

    // 3. Define User ID
    sqlx::query("SELECT set_config('app.user_id', $1, false)")
        .bind(user_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}
