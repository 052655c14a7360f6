// src/handlers/tenancy.rs

use axum::Json;

use crate::{
    middleware::tenancy::TenantContext,
    models::tenancy::Tenant,
};

// A escola ativa da sessão, direto do contexto já resolvido pelo
// tenant_guard: nenhuma ida extra ao banco.
#[utoipa::path(
    get,
    path = "/api/tenants/current",
    tag = "Tenancy",
    responses((status = 200, description = "Escola ativa da sessão", body = Tenant)),
    security(("api_jwt" = []))
)]
pub async fn get_current_tenant(context: TenantContext) -> Json<Tenant> {
    Json(context.tenant.clone())
}
