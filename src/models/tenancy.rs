// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Tenant (A "Escola")
// ---
// A conta principal. Nunca é apagada, apenas desativada (is_active = false).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    // Mapa opaco de configurações da escola; o core não interpreta.
    #[schema(value_type = Object)]
    pub settings: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Membership (A "Ponte" Usuário-Escola)
// ---
// Liga um usuário a uma escola com exatamente um cargo.
// Soft delete via deleted_at: as buscas SEMPRE filtram deleted_at IS NULL.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    // 'active' | 'suspended'
    pub status: String,
    #[schema(value_type = Object)]
    pub preferences: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

pub const MEMBERSHIP_STATUS_ACTIVE: &str = "active";

impl Membership {
    pub fn is_usable(&self) -> bool {
        self.status == MEMBERSHIP_STATUS_ACTIVE && self.deleted_at.is_none()
    }
}

// ---
// 3. Resumo de vínculo para a tela de seleção de escola
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipSummary {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub tenant_slug: String,
    pub role_name: String,
}

// ---
// 4. Visão pública de uma escola (resolução por slug, SEM autenticação)
// ---
// Caminho de confiança mais baixa: só dados de vitrine, nunca um contexto.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicTenant {
    pub slug: String,
    pub name: String,
}

// ---
// 5. Convite por e-mail (token chega por URL pública)
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role_id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationPayload {
    pub token: String,
}
