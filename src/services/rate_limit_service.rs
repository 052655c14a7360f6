// src/services/rate_limit_service.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::db::CounterStore;

// ---
// Os tiers estáticos, do mais apertado ao mais folgado, por risco:
// escrita pública > ação autenticada em URL pública > leitura pública.
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
    PublicWrite,
    PublicRead,
    AuthAction,
}

impl RateLimitTier {
    pub fn key_prefix(&self) -> &'static str {
        match self {
            RateLimitTier::PublicWrite => "public_write",
            RateLimitTier::PublicRead => "public_read",
            RateLimitTier::AuthAction => "auth_action",
        }
    }

    pub fn limit(&self) -> i64 {
        match self {
            RateLimitTier::PublicWrite => 5,
            RateLimitTier::PublicRead => 20,
            RateLimitTier::AuthAction => 10,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            RateLimitTier::PublicWrite => Duration::minutes(15),
            RateLimitTier::PublicRead => Duration::minutes(5),
            RateLimitTier::AuthAction => Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

// ---
// O serviço: janela deslizante sobre o contador compartilhado.
// ---
// Sem store configurado (flag calculada na inicialização) ou com o store
// fora do ar, o limiter falha ABERTO: deixa passar e loga. Derrubar a
// plataforma inteira por causa de uma dependência secundária seria o
// pior dos dois mundos.
#[derive(Clone)]
pub struct RateLimitService {
    store: Option<Arc<dyn CounterStore>>,
}

impl RateLimitService {
    pub fn new(store: Option<Arc<dyn CounterStore>>) -> Self {
        if store.is_none() {
            tracing::warn!("⚠️ Rate limiter sem store configurado: TODAS as checagens vão permitir.");
        }
        Self { store }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Checa (e consome) uma batida na janela do par (tier, identificador).
    pub async fn check(&self, tier: RateLimitTier, identifier: &str) -> RateLimitDecision {
        let now = Utc::now();
        let window = tier.window();

        let Some(store) = &self.store else {
            tracing::warn!(
                "⚠️ Rate limiter indisponível: permitindo {}:{} sem contar.",
                tier.key_prefix(),
                identifier
            );
            return allow_all(now, window);
        };

        let bucket_key = format!("{}:{}", tier.key_prefix(), identifier);
        let window_start = now - window;

        let sample = match store.hit(&bucket_key, window_start).await {
            Ok(sample) => sample,
            Err(e) => {
                // Store fora do ar: falha aberta, loga para o alerta operacional
                tracing::warn!("⚠️ Contador do rate limiter inacessível ({:#}). Permitindo.", e);
                return allow_all(now, window);
            }
        };

        // O reset é quando a batida mais antiga da janela sai dela
        let reset_at = sample
            .oldest_hit
            .map(|oldest| oldest + window)
            .unwrap_or(now + window);

        let limit = tier.limit();
        if sample.hits <= limit {
            RateLimitDecision {
                allowed: true,
                remaining: limit - sample.hits,
                reset_at,
            }
        } else {
            RateLimitDecision { allowed: false, remaining: 0, reset_at }
        }
    }
}

fn allow_all(now: DateTime<Utc>, window: Duration) -> RateLimitDecision {
    RateLimitDecision {
        allowed: true,
        remaining: i64::MAX,
        reset_at: now + window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::WindowSample;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Store em memória com a mesma semântica do Postgres: purga fora da
    // janela, insere a batida, conta o que ficou.
    #[derive(Default)]
    struct MemoryStore {
        hits: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
    }

    impl MemoryStore {
        // Simula o tempo passando: envelhece todas as batidas gravadas
        fn age_hits_by(&self, delta: Duration) {
            let mut hits = self.hits.lock().expect("lock");
            for timestamps in hits.values_mut() {
                for t in timestamps.iter_mut() {
                    *t = *t - delta;
                }
            }
        }
    }

    #[async_trait]
    impl CounterStore for MemoryStore {
        async fn hit(
            &self,
            bucket_key: &str,
            window_start: DateTime<Utc>,
        ) -> anyhow::Result<WindowSample> {
            let mut hits = self.hits.lock().expect("lock");
            let bucket = hits.entry(bucket_key.to_string()).or_default();
            bucket.retain(|t| *t >= window_start);
            bucket.push(Utc::now());
            Ok(WindowSample {
                hits: bucket.len() as i64,
                oldest_hit: bucket.first().copied(),
            })
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn hit(
            &self,
            _bucket_key: &str,
            _window_start: DateTime<Utc>,
        ) -> anyhow::Result<WindowSample> {
            anyhow::bail!("conexão recusada")
        }
    }

    #[tokio::test]
    async fn allows_up_to_the_limit_then_denies() {
        let service = RateLimitService::new(Some(Arc::new(MemoryStore::default())));

        for i in 0..5 {
            let decision = service.check(RateLimitTier::PublicWrite, "203.0.113.9").await;
            assert!(decision.allowed, "batida {} deveria passar", i + 1);
            assert_eq!(decision.remaining, 5 - (i + 1));
        }

        // A sexta na mesma janela é negada
        let decision = service.check(RateLimitTier::PublicWrite, "203.0.113.9").await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset_at > Utc::now());
    }

    #[tokio::test]
    async fn window_elapse_resets_the_bucket() {
        let store = Arc::new(MemoryStore::default());
        let service = RateLimitService::new(Some(Arc::clone(&store) as Arc<dyn CounterStore>));

        for _ in 0..5 {
            service.check(RateLimitTier::PublicWrite, "203.0.113.9").await;
        }
        assert!(!service.check(RateLimitTier::PublicWrite, "203.0.113.9").await.allowed);

        // Janela de 15 minutos passa; tudo envelhece para fora dela
        store.age_hits_by(Duration::minutes(16));

        let decision = service.check(RateLimitTier::PublicWrite, "203.0.113.9").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn buckets_are_keyed_by_tier_and_identifier() {
        let service = RateLimitService::new(Some(Arc::new(MemoryStore::default())));

        for _ in 0..5 {
            service.check(RateLimitTier::PublicWrite, "203.0.113.9").await;
        }
        assert!(!service.check(RateLimitTier::PublicWrite, "203.0.113.9").await.allowed);

        // Outro endereço segue passando
        assert!(service.check(RateLimitTier::PublicWrite, "198.51.100.7").await.allowed);
        // O mesmo endereço em outro tier também
        assert!(service.check(RateLimitTier::PublicRead, "203.0.113.9").await.allowed);
    }

    #[tokio::test]
    async fn unconfigured_store_fails_open() {
        let service = RateLimitService::new(None);
        assert!(!service.is_available());

        for _ in 0..100 {
            assert!(service.check(RateLimitTier::PublicWrite, "203.0.113.9").await.allowed);
        }
    }

    #[tokio::test]
    async fn unreachable_store_fails_open() {
        let service = RateLimitService::new(Some(Arc::new(BrokenStore)));

        for _ in 0..10 {
            assert!(service.check(RateLimitTier::PublicWrite, "203.0.113.9").await.allowed);
        }
    }
}
