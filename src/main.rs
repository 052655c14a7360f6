//src/main.rs

use std::net::SocketAddr;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;
mod session;

// Importações principais
use crate::config::AppState;
use crate::middleware::auth::auth_guard;
use crate::middleware::rate_limit::{public_read_guard, public_write_guard};
use crate::middleware::tenancy::tenant_guard;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de autenticação públicas: a janela mais apertada de throttling
    let auth_public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            public_write_guard,
        ));

    // Rotas de sessão (autenticadas, SEM exigir escola selecionada)
    let auth_session_routes = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/select-tenant", post(handlers::auth::select_tenant))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/memberships", get(handlers::auth::get_my_memberships))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Leituras públicas (slug de escola): limite mais folgado, mas presente
    let public_read_routes = Router::new()
        .route("/schools/{slug}", get(handlers::public::get_school_by_slug))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            public_read_guard,
        ));

    // Aceite de convite: autenticado, mas a URL chega por e-mail.
    // O throttling fino (por token) acontece dentro do handler.
    let invitation_routes = Router::new()
        .route("/invitations/accept", post(handlers::public::accept_invitation))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Rotas da escola ativa: auth_guard roda primeiro, tenant_guard resolve
    // o contexto completo UMA vez e deixa nos extensions
    let tenant_routes = Router::new()
        .route("/current", get(handlers::tenancy::get_current_tenant))
        .route("/roles", post(handlers::rbac::create_role))
        .route("/audit-logs", get(handlers::audit::list_audit_logs))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let student_routes = Router::new()
        .route("/{id}", get(handlers::students::get_student))
        .route("/{id}/health", patch(handlers::students::update_student_health))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Webhook do processador de pagamentos: entrada sem autenticação,
    // então consulta o rate limiter ANTES de qualquer coisa
    let webhook_routes = Router::new()
        .route("/payments", post(handlers::webhooks::payment_webhook))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            public_write_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .nest("/api/auth", auth_public_routes.merge(auth_session_routes))
        .nest("/api/users", user_routes)
        .nest("/api/public", public_read_routes.merge(invitation_routes))
        .nest("/api/tenants", tenant_routes)
        .nest("/api/students", student_routes)
        .nest("/api/webhooks", webhook_routes)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());

    // with_connect_info: o rate limiter e a proveniência da auditoria
    // precisam do endereço do cliente quando não há X-Forwarded-For
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Erro no servidor Axum");
}
