// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::select_tenant,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_memberships,

        // --- Public ---
        handlers::public::get_school_by_slug,
        handlers::public::accept_invitation,

        // --- Tenancy ---
        handlers::tenancy::get_current_tenant,

        // --- RBAC ---
        handlers::rbac::create_role,
        handlers::rbac::list_permissions,

        // --- Audit ---
        handlers::audit::list_audit_logs,

        // --- Students ---
        handlers::students::get_student,
        handlers::students::update_student_health,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::SelectTenantPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::Tenant,
            models::tenancy::Membership,
            models::tenancy::MembershipSummary,
            models::tenancy::PublicTenant,
            models::tenancy::AcceptInvitationPayload,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Permission,
            models::rbac::CreateRolePayload,
            models::rbac::RoleResponse,

            // --- Audit ---
            models::audit::AuditLogEntry,
            models::audit::Sensitivity,

            // --- Students ---
            models::students::StudentResponse,
            models::students::UpdateHealthPayload,

            // --- Billing ---
            models::billing::Invoice,
            models::billing::InvoiceStatus,
            models::billing::PaymentWebhookPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, sessões e seleção de escola"),
        (name = "Users", description = "Dados do Usuário e Vínculos"),
        (name = "Public", description = "Rotas públicas (sem sessão ou com URL pública)"),
        (name = "Tenancy", description = "A escola ativa da sessão"),
        (name = "RBAC", description = "Controle de Acesso (Cargos e Permissões)"),
        (name = "Audit", description = "Trilha de auditoria da escola"),
        (name = "Students", description = "Alunos e fichas sensíveis")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
