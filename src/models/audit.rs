// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Sensibilidade
// ---
// Classificação estática por ação; ações fora da tabela caem em Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
    Critical,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
            Sensitivity::Critical => "critical",
        }
    }
}

/// Tabela estática ação -> sensibilidade.
pub fn classify_action(action: &str) -> Sensitivity {
    match action {
        // Fichas sensíveis de alunos
        "student_sensitive_viewed" => Sensitivity::High,
        "student_sensitive_updated" => Sensitivity::Critical,

        // Gestão de membros
        "member_suspended" | "member_removed" => Sensitivity::High,
        "member_invited" | "invitation_accepted" => Sensitivity::Medium,

        // Cargos e configurações
        "role_created" | "role_updated" | "tenant_settings_updated" => Sensitivity::Medium,

        // Reconciliação de pagamentos (via webhook, sem usuário)
        "payment_reconciled" | "payment_failed" => Sensitivity::Medium,

        // Consulta da própria trilha
        "audit_log_viewed" => Sensitivity::Medium,

        _ => Sensitivity::Low,
    }
}

// ---
// 2. A entrada da trilha (linha da tabela audit_log)
// ---
// Append-only: não existe caminho de UPDATE/DELETE no domínio.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    // Nulo para ações de sistema (webhooks, tarefas agendadas)
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub sensitivity: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---
// 3. O que os serviços montam antes de gravar
// ---
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub tenant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub sensitivity: Sensitivity,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// Item de um lote (recordBulk); os campos comuns vêm do contexto.
#[derive(Debug, Clone)]
pub struct AuditItem {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_student_actions_rank_highest() {
        assert_eq!(classify_action("student_sensitive_updated"), Sensitivity::Critical);
        assert_eq!(classify_action("student_sensitive_viewed"), Sensitivity::High);
    }

    #[test]
    fn unlisted_actions_default_to_low() {
        assert_eq!(classify_action("student_created"), Sensitivity::Low);
        assert_eq!(classify_action(""), Sensitivity::Low);
        assert_eq!(classify_action("acao_que_nao_existe"), Sensitivity::Low);
    }

    #[test]
    fn sensitivity_serializes_lowercase() {
        assert_eq!(Sensitivity::Critical.as_str(), "critical");
        assert_eq!(
            serde_json::to_string(&Sensitivity::High).expect("serializa"),
            "\"high\""
        );
    }
}
