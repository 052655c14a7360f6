// src/handlers/public.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, provenance::RequestProvenance},
    models::tenancy::{AcceptInvitationPayload, PublicTenant},
    services::rate_limit_service::RateLimitTier,
};

// GET /api/public/schools/{slug}
//
// O ÚNICO lugar onde um slug de URL resolve escola: caminho público,
// sem autenticação, só dados de vitrine. Rotas autenticadas resolvem
// pelo claim do token, nunca por URL.
#[utoipa::path(
    get,
    path = "/api/public/schools/{slug}",
    tag = "Public",
    params(("slug" = String, Path, description = "Slug público da escola")),
    responses(
        (status = 200, description = "Escola encontrada", body = PublicTenant),
        (status = 404, description = "Escola inexistente ou desativada"),
        (status = 429, description = "Limite de requisições excedido")
    )
)]
pub async fn get_school_by_slug(
    State(app_state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicTenant>, AppError> {
    let tenant = app_state
        .tenant_repo
        .find_public_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(tenant))
}

// POST /api/public/invitations/accept
//
// Autenticado, mas a URL chega por e-mail: além do guard por endereço,
// o próprio token do convite vira identificador de throttling: força
// bruta distribuída contra UM convite também esbarra no limite.
#[utoipa::path(
    post,
    path = "/api/public/invitations/accept",
    tag = "Public",
    request_body = AcceptInvitationPayload,
    responses(
        (status = 201, description = "Convite aceito, vínculo criado"),
        (status = 410, description = "Convite inválido ou já utilizado"),
        (status = 429, description = "Limite de requisições excedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    provenance: RequestProvenance,
    Json(payload): Json<AcceptInvitationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let decision = app_state
        .rate_limit_service
        .check(RateLimitTier::AuthAction, &payload.token)
        .await;
    if !decision.allowed {
        return Err(AppError::RateLimited { reset_at: decision.reset_at });
    }

    let membership = app_state
        .tenancy_service
        .accept_invitation(&user, &payload.token)
        .await?;

    // Ainda não existe contexto de tenant resolvido nesta rota, então o
    // registro vai pelo caminho de sistema, com o usuário nos metadados.
    app_state.audit_service.record_system(
        membership.tenant_id,
        Some(&provenance),
        "invitation_accepted",
        "memberships",
        Some(membership.id),
        serde_json::json!({ "userId": membership.user_id }),
    );

    Ok((StatusCode::CREATED, Json(membership)))
}
