// src/middleware/rate_limit.rs

use axum::{
    extract::State,
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::provenance::client_address,
    services::rate_limit_service::RateLimitTier,
};

// Guardas de throttling para rotas alcançáveis SEM autenticação.
// A chave padrão é o endereço do cliente; handlers que têm um
// identificador melhor (ex.: o token do convite) chamam o serviço
// direto com ele.

async fn enforce(
    app_state: &AppState,
    tier: RateLimitTier,
    identifier: &str,
) -> Result<(), AppError> {
    let decision = app_state.rate_limit_service.check(tier, identifier).await;

    if decision.allowed {
        Ok(())
    } else {
        Err(AppError::RateLimited { reset_at: decision.reset_at })
    }
}

/// Escritas públicas (login, registro, webhooks): a janela mais apertada.
pub async fn public_write_guard(
    State(app_state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identifier = client_address(request.headers(), request.extensions())
        .unwrap_or_else(|| "desconhecido".to_string());
    enforce(&app_state, RateLimitTier::PublicWrite, &identifier).await?;
    Ok(next.run(request).await)
}

/// Leituras públicas (busca de escola por slug): mais folgada, mas ainda
/// limitada: enumeração de slugs também é ataque.
pub async fn public_read_guard(
    State(app_state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identifier = client_address(request.headers(), request.extensions())
        .unwrap_or_else(|| "desconhecido".to_string());
    enforce(&app_state, RateLimitTier::PublicRead, &identifier).await?;
    Ok(next.run(request).await)
}

