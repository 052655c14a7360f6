// src/db/rate_limit_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

// O que uma batida na janela devolve: quantas requisições existem na janela
// (já contando esta) e a mais antiga ainda dentro dela (para calcular o reset).
#[derive(Debug, Clone, Copy)]
pub struct WindowSample {
    pub hits: i64,
    pub oldest_hit: Option<DateTime<Utc>>,
}

// Porta do contador compartilhado. A correção da janela deslizante sob
// concorrência é responsabilidade do store, não do processo: aqui só
// registramos a batida e lemos a contagem.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn hit(
        &self,
        bucket_key: &str,
        window_start: DateTime<Utc>,
    ) -> anyhow::Result<WindowSample>;
}

// Implementação sobre o Postgres compartilhado: purga as batidas que já
// saíram da janela, insere a atual e conta o que sobrou, tudo em um único
// statement.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn hit(
        &self,
        bucket_key: &str,
        window_start: DateTime<Utc>,
    ) -> anyhow::Result<WindowSample> {
        // CTEs com modificação enxergam o snapshot do início do statement,
        // então o SELECT não vê o INSERT desta mesma batida: o +1 é ela.
        let row = sqlx::query_as::<_, (i64, Option<DateTime<Utc>>)>(
            r#"
            WITH purged AS (
                DELETE FROM rate_limit_hits
                WHERE bucket_key = $1 AND hit_at < $2
            ), inserted AS (
                INSERT INTO rate_limit_hits (bucket_key) VALUES ($1)
            )
            SELECT count(*) + 1, min(hit_at)
            FROM rate_limit_hits
            WHERE bucket_key = $1 AND hit_at >= $2
            "#,
        )
        .bind(bucket_key)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(WindowSample { hits: row.0, oldest_hit: row.1 })
    }
}
