// src/handlers/rbac.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        provenance::RequestProvenance,
        rbac::{PermManageRoles, RequirePermission},
        tenancy::TenantContext,
    },
    models::rbac::{CreateRolePayload, Permission, RoleResponse},
};

// POST /api/tenants/roles
#[utoipa::path(
    post,
    path = "/api/tenants/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Cargo criado", body = RoleResponse),
        (status = 403, description = "Sem a permissão manage_roles"),
        (status = 409, description = "Nome de cargo duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    context: TenantContext,
    provenance: RequestProvenance,
    _: RequirePermission<PermManageRoles>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .rbac_service
        .create_role_with_permissions(
            context.tenant.id,
            payload.name,
            payload.description,
            payload.permissions,
        )
        .await?;

    app_state.audit_service.record(
        &context,
        &provenance,
        "role_created",
        "roles",
        Some(response.role.id),
        serde_json::json!({ "permissions": response.permissions }),
    );

    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/permissions: o vocabulário completo, agrupado por módulo
// (agrupamento é só para a tela administrativa)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses((status = 200, description = "Vocabulário de permissões", body = [Permission]))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Permission>>, AppError> {
    let permissions = app_state.rbac_service.list_system_permissions().await?;
    Ok(Json(permissions))
}
