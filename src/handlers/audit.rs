// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        rbac::{PermViewAuditLogs, RequirePermission},
        tenancy::TenantContext,
    },
    models::audit::AuditLogEntry,
};

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub entity_type: Option<String>,
    pub limit: Option<i64>,
}

// GET /api/tenants/audit-logs
//
// Leitura da trilha pela credencial da APLICAÇÃO (SELECT escopado por
// RLS); só a escrita usa a credencial elevada. Mais recente primeiro.
#[utoipa::path(
    get,
    path = "/api/tenants/audit-logs",
    tag = "Audit",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Entradas da trilha", body = [AuditLogEntry]),
        (status = 403, description = "Sem a permissão view_audit_logs")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    context: TenantContext,
    _: RequirePermission<PermViewAuditLogs>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);

    let entries = app_state
        .audit_query_repo
        .list_for_tenant(
            context.tenant.id,
            context.user.id,
            query.entity_type.as_deref(),
            limit,
        )
        .await?;

    Ok(Json(entries))
}
