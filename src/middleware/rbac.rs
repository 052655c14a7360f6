// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{common::error::AppError, middleware::tenancy::TenantContext};

// ---
// O avaliador de permissões: função pura sobre o contexto já resolvido.
// ---
// Zero I/O aqui. O agrupamento das permissões em módulos existe só para
// telas administrativas; a avaliação é um teste plano de pertencimento.
impl TenantContext {
    pub fn has_permission(&self, key: &str) -> bool {
        self.permissions().contains(key)
    }

    /// Versão "guardiã": devolve o próprio contexto ou Forbidden.
    pub fn require_permission(&self, key: &str) -> Result<&Self, AppError> {
        if self.has_permission(key) {
            Ok(self)
        } else {
            Err(AppError::Forbidden(key.to_string()))
        }
    }
}

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
//
// Diferente de checar no banco a cada rota: o tenant_guard já carregou o
// conjunto completo, então aqui é só o teste de pertencimento.
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<TenantContext>()
            .ok_or(AppError::NoTenantSelected)?;

        context.require_permission(T::slug())?;

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermManageUsers;
impl PermissionDef for PermManageUsers {
    fn slug() -> &'static str { "manage_users" }
}

pub struct PermManageRoles;
impl PermissionDef for PermManageRoles {
    fn slug() -> &'static str { "manage_roles" }
}

pub struct PermViewStudents;
impl PermissionDef for PermViewStudents {
    fn slug() -> &'static str { "view_students" }
}

pub struct PermViewSensitiveRecords;
impl PermissionDef for PermViewSensitiveRecords {
    fn slug() -> &'static str { "view_sensitive_records" }
}

pub struct PermManageSensitiveRecords;
impl PermissionDef for PermManageSensitiveRecords {
    fn slug() -> &'static str { "manage_sensitive_records" }
}

pub struct PermViewAuditLogs;
impl PermissionDef for PermViewAuditLogs {
    fn slug() -> &'static str { "view_audit_logs" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::User, rbac::Role, tenancy::Tenant};
    use chrono::Utc;
    use uuid::Uuid;

    fn tenant(name: &str) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            slug: name.to_lowercase(),
            name: name.to_string(),
            settings: serde_json::json!({}),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@escola.com".into(),
            password_hash: "hash".into(),
            display_name: Some("Ana".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn role(tenant_id: Uuid, name: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn context(role_name: &str, slugs: &[&str]) -> TenantContext {
        let tenant = tenant("Escola B");
        let role = role(tenant.id, role_name);
        TenantContext::new(
            tenant,
            user(),
            role,
            slugs.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn evaluation_is_flat_set_membership() {
        // Usuária com vínculos em duas escolas; resolvendo com o claim da
        // escola B (admin), valem SÓ as permissões do cargo de lá.
        let ctx = context("Administradora", &["manage_users", "view_audit_logs"]);

        assert!(ctx.has_permission("manage_users"));
        assert!(ctx.has_permission("view_audit_logs"));
        assert!(!ctx.has_permission("create_observation"));
    }

    #[test]
    fn require_permission_returns_forbidden() {
        let ctx = context("Professora", &["create_observation"]);

        assert!(ctx.require_permission("create_observation").is_ok());
        match ctx.require_permission("manage_users") {
            Err(AppError::Forbidden(slug)) => assert_eq!(slug, "manage_users"),
            other => panic!("esperava Forbidden, veio {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_grant_rows_are_dropped_not_fatal() {
        // Linha de grant corrompida/desconhecida não derruba a resolução;
        // ela simplesmente não vira permissão.
        let ctx = context(
            "Coordenadora",
            &["manage_users", "permissao_que_nao_existe", ""],
        );

        assert!(ctx.has_permission("manage_users"));
        assert!(!ctx.has_permission("permissao_que_nao_existe"));
        assert_eq!(ctx.permissions().len(), 1);
    }

    #[test]
    fn empty_grant_set_denies_everything() {
        let ctx = context("Visitante", &[]);
        assert!(!ctx.has_permission("view_students"));
        assert!(ctx.require_permission("view_students").is_err());
    }
}
