// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// O que sai do banco (Tabela Roles)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(ignore)] // Ocultamos tenant_id da documentação pública
    pub tenant_id: Uuid,

    #[schema(example = "Professora")]
    pub name: String,

    #[schema(example = "Registra observações e consulta turmas")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela Permissions)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,

    #[schema(example = "view_audit_logs")]
    pub slug: String,

    #[schema(example = "Consultar a trilha de auditoria da escola")]
    pub description: String,

    #[schema(example = "AUDIT")]
    pub module: String,
}

// O Payload para criar um cargo
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[schema(example = "Coordenadora")]
    pub name: String,

    #[schema(example = "Gerencia membros e consulta auditoria")]
    pub description: Option<String>,

    #[schema(example = json!(["manage_users", "view_audit_logs"]))]
    pub permissions: Vec<String>, // Slugs das permissões
}

// Resposta completa (Cargo + Lista de Permissões)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,

    #[schema(example = json!(["manage_users", "view_audit_logs"]))]
    pub permissions: Vec<String>,
}

// ---
// VOCABULÁRIO FECHADO DE PERMISSÕES
// ---
// A fonte da verdade é esta tabela embutida no binário; a tabela
// `permissions` do banco é semeada com os mesmos slugs para os joins.
// Linhas de grant com slug fora daqui são IGNORADAS na resolução
// (ausência de permissão, nunca um crash).

pub struct KnownPermission {
    pub slug: &'static str,
    pub module: &'static str,
    pub description: &'static str,
}

pub const PERMISSION_CATALOG: &[KnownPermission] = &[
    KnownPermission { slug: "manage_users",             module: "USERS",        description: "Convidar, suspender e remover membros da escola" },
    KnownPermission { slug: "view_users",               module: "USERS",        description: "Visualizar a lista de membros da escola" },
    KnownPermission { slug: "manage_roles",             module: "ROLES",        description: "Criar e editar cargos e suas permissões" },
    KnownPermission { slug: "view_students",            module: "STUDENTS",     description: "Visualizar alunos e turmas" },
    KnownPermission { slug: "manage_students",          module: "STUDENTS",     description: "Criar e editar cadastros de alunos" },
    KnownPermission { slug: "view_sensitive_records",   module: "STUDENTS",     description: "Ler fichas sensíveis (saúde, guarda)" },
    KnownPermission { slug: "manage_sensitive_records", module: "STUDENTS",     description: "Editar fichas sensíveis (saúde, guarda)" },
    KnownPermission { slug: "create_observation",       module: "OBSERVATIONS", description: "Registrar observações pedagógicas" },
    KnownPermission { slug: "view_observations",        module: "OBSERVATIONS", description: "Visualizar observações pedagógicas" },
    KnownPermission { slug: "view_audit_logs",          module: "AUDIT",        description: "Consultar a trilha de auditoria da escola" },
    KnownPermission { slug: "manage_billing",           module: "BILLING",      description: "Gerir cobranças e mensalidades" },
    KnownPermission { slug: "manage_settings",          module: "SETTINGS",     description: "Alterar configurações da escola" },
];

/// Checa o slug contra o vocabulário fechado.
pub fn is_known_permission(slug: &str) -> bool {
    PERMISSION_CATALOG.iter().any(|p| p.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_no_duplicate_slugs() {
        let mut slugs: Vec<&str> = PERMISSION_CATALOG.iter().map(|p| p.slug).collect();
        slugs.sort();
        let before = slugs.len();
        slugs.dedup();
        assert_eq!(before, slugs.len());
    }

    #[test]
    fn known_permission_lookup() {
        assert!(is_known_permission("manage_users"));
        assert!(is_known_permission("create_observation"));
        assert!(!is_known_permission("delete_everything"));
        assert!(!is_known_permission(""));
    }
}
