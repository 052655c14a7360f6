// src/config.rs

use std::sync::Arc;
use std::{env, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::common::crypto::FieldCipher;
use crate::db::{
    AuditQueryRepository, CounterStore, InvoiceRepository, PgAuditSink, PgCounterStore,
    RbacRepository, SessionRepository, StudentRepository, TenantRepository, UserRepository,
};
use crate::services::{
    audit_service::AuditService, auth::AuthService, rate_limit_service::RateLimitService,
    rbac_service::RbacService, student_service::StudentService, tenancy_service::TenancyService,
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub cipher: FieldCipher,

    // Repositórios que os handlers usam direto
    pub tenant_repo: TenantRepository,
    pub invoice_repo: InvoiceRepository,
    pub audit_query_repo: AuditQueryRepository,

    // Serviços
    pub auth_service: AuthService,
    pub tenancy_service: TenancyService,
    pub rbac_service: RbacService,
    pub audit_service: AuditService,
    pub rate_limit_service: RateLimitService,
    pub student_service: StudentService,
}

impl AppState {
    // A assinatura retorna um Result: configuração quebrada impede o boot.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados (credencial da APLICAÇÃO, sujeita a RLS)
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // Pool ELEVADA só para escrever auditoria. A credencial da aplicação
        // não tem INSERT em audit_log: quem age não escreve a própria trilha.
        let audit_pool = match env::var("AUDIT_DATABASE_URL") {
            Ok(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(2)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(&url)
                    .await?;
                tracing::info!("✅ Pool elevada de auditoria conectada.");
                pool
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ AUDIT_DATABASE_URL ausente: auditoria usando a credencial da aplicação (só aceitável em desenvolvimento)."
                );
                db_pool.clone()
            }
        };

        // Store do rate limiter: opcional DE PROPÓSITO. Sem ele, o limiter
        // falha aberto (flag de capacidade, não descoberta tardia).
        let counter_store: Option<Arc<dyn CounterStore>> =
            match env::var("RATE_LIMIT_DATABASE_URL") {
                Ok(url) => {
                    let pool = PgPoolOptions::new()
                        .max_connections(2)
                        .acquire_timeout(Duration::from_secs(3))
                        .connect(&url)
                        .await?;
                    tracing::info!("✅ Store do rate limiter conectado.");
                    Some(Arc::new(PgCounterStore::new(pool)))
                }
                Err(_) => None,
            };

        // Chave de cifra dos campos sensíveis (256 bits em hex).
        // Ausente/inválida = cifrador degradado, flag calculada AQUI.
        let field_key = env::var("FIELD_ENCRYPTION_KEY").ok();
        let cipher = FieldCipher::new(field_key.as_deref());
        if cipher.is_available() {
            tracing::info!("✅ Criptografia de campos sensíveis ativa.");
        }

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let session_repo = SessionRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let student_repo = StudentRepository::new(db_pool.clone());
        let invoice_repo = InvoiceRepository::new(db_pool.clone());
        let audit_query_repo = AuditQueryRepository::new(db_pool.clone());

        let audit_service = AuditService::new(Arc::new(PgAuditSink::new(audit_pool)));
        let rate_limit_service = RateLimitService::new(counter_store);
        let auth_service = AuthService::new(
            user_repo,
            session_repo,
            tenant_repo.clone(),
            jwt_secret.clone(),
            db_pool.clone(),
        );
        let tenancy_service = TenancyService::new(tenant_repo.clone(), rbac_repo.clone());
        let rbac_service = RbacService::new(rbac_repo, db_pool.clone());
        let student_service =
            StudentService::new(student_repo, cipher.clone(), audit_service.clone());

        // Retorna Ok com o estado montado
        Ok(Self {
            db_pool,
            jwt_secret,
            cipher,
            tenant_repo,
            invoice_repo,
            audit_query_repo,
            auth_service,
            tenancy_service,
            rbac_service,
            audit_service,
            rate_limit_service,
            student_service,
        })
    }
}
