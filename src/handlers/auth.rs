use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{
        AuthResponse, Claims, LoginUserPayload, RegisterUserPayload, SelectTenantPayload, User,
    },
    models::tenancy::MembershipSummary,
    services::auth::CredentialExchange,
};

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 429, description = "Limite de requisições excedido")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<Response, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let issued = app_state
        .auth_service
        .register_user(&payload.email, &payload.password, payload.display_name.as_deref())
        .await?;

    // Acumula a credencial e reaplica NA resposta final
    let mut exchange = CredentialExchange::new();
    exchange.stamp_token(&issued.token);

    let response = (
        StatusCode::CREATED,
        Json(AuthResponse { token: issued.token, tenant_selected: issued.tenant_selected }),
    )
        .into_response();
    Ok(exchange.apply(response))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Autenticado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas"),
        (status = 429, description = "Limite de requisições excedido")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Response, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    // Com exatamente um vínculo, o token já sai carimbado com a escola,
    // pelo MESMO caminho da seleção explícita
    let issued = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    let mut exchange = CredentialExchange::new();
    exchange.stamp_token(&issued.token);

    let response = Json(AuthResponse {
        token: issued.token,
        tenant_selected: issued.tenant_selected,
    })
    .into_response();
    Ok(exchange.apply(response))
}

// Handler de logout: revoga a sessão no servidor. Todas as outras abas
// e dispositivos da mesma sessão morrem na próxima resolução.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Sessão encerrada")),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    claims: Claims,
) -> Result<Response, AppError> {
    app_state.auth_service.logout(&claims).await?;

    let mut exchange = CredentialExchange::new();
    exchange.clear_token();

    let response = Json(json!({ "ok": true })).into_response();
    Ok(exchange.apply(response))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses((status = 200, description = "Usuário autenticado", body = User)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// Lista os vínculos do usuário (a tela de seleção de escola)
#[utoipa::path(
    get,
    path = "/api/users/me/memberships",
    tag = "Users",
    responses((status = 200, description = "Vínculos do usuário", body = [MembershipSummary])),
    security(("api_jwt" = []))
)]
pub async fn get_my_memberships(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<MembershipSummary>>, AppError> {
    let memberships = app_state.tenancy_service.list_memberships(user.id).await?;
    Ok(Json(memberships))
}

// Seleção explícita de escola: reemite o token com o claim `tid` e
// reaplica a credencial na resposta devolvida.
#[utoipa::path(
    post,
    path = "/api/auth/select-tenant",
    tag = "Auth",
    request_body = SelectTenantPayload,
    responses(
        (status = 200, description = "Escola selecionada", body = AuthResponse),
        (status = 401, description = "Vínculo inexistente ou escola desativada")
    ),
    security(("api_jwt" = []))
)]
pub async fn select_tenant(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    claims: Claims,
    Json(payload): Json<SelectTenantPayload>,
) -> Result<Response, AppError> {
    let token = app_state
        .auth_service
        .stamp_tenant(user.id, claims.jti, payload.tenant_id)
        .await?;

    let mut exchange = CredentialExchange::new();
    exchange.stamp_token(&token);

    let response = Json(AuthResponse { token, tenant_selected: true }).into_response();
    Ok(exchange.apply(response))
}
