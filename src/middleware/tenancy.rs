// src/middleware/tenancy.rs

use std::collections::HashSet;

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{auth::User, rbac::{is_known_permission, Role}, tenancy::Tenant},
};

// ---
// O contexto de tenant resolvido para UMA requisição.
// ---
// Imutável depois de construído; vive só durante a requisição (fica nos
// extensions, que morrem com ela). NUNCA em cache de processo: contexto
// de uma requisição jamais pode vazar para outra.
//
// Invariante: `permissions` é sempre o conjunto transitivo COMPLETO do
// cargo dentro da escola: nunca parcialmente populado. Não existe
// contexto "de visitante": faltou um elo, a resolução falha inteira.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: Tenant,
    pub user: User,
    pub role: Role,
    permissions: HashSet<String>,
}

impl TenantContext {
    /// Monta o contexto a partir dos slugs carregados do banco.
    /// Slugs fora do vocabulário fechado são descartados em silêncio:
    /// o padrão seguro é a AUSÊNCIA de permissão, nunca um crash.
    pub fn new(tenant: Tenant, user: User, role: Role, granted_slugs: Vec<String>) -> Self {
        let permissions = granted_slugs
            .into_iter()
            .filter(|slug| is_known_permission(slug))
            .collect();

        Self { tenant, user, role, permissions }
    }

    pub fn permissions(&self) -> &HashSet<String> {
        &self.permissions
    }
}

// O middleware de tenancy: roda DEPOIS do auth_guard e resolve o contexto
// completo UMA vez por requisição (os extensions são o memo). O tenant vem
// exclusivamente do claim do token: nunca de URL ou corpo; slug em URL só
// existe no caminho público não autenticado.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::Unauthenticated)?;

    let claims = request
        .extensions()
        .get::<crate::models::auth::Claims>()
        .cloned()
        .ok_or(AppError::Unauthenticated)?;

    let context = app_state
        .tenancy_service
        .resolve_context(&user.0, &claims)
        .await?;

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

// Extrator: entrega o contexto já resolvido pelo tenant_guard.
// Não resolve nada sozinho: pedir o contexto N vezes custa N clones,
// zero idas ao banco.
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::NoTenantSelected)
    }
}
