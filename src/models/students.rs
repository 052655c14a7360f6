// src/models/students.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// A linha como está no banco: medical_notes/custody_notes podem conter o
// envelope `enc:v1:...` ou texto puro legado (rollout incremental).
#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub full_name: String,
    pub medical_notes: Option<String>,
    pub custody_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que o handler devolve: campos sensíveis já decifrados (ou omitidos,
// quando quem pede não tem view_sensitive_records).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: Uuid,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custody_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHealthPayload {
    pub medical_notes: Option<String>,
    pub custody_notes: Option<String>,
}
