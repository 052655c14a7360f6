// src/models/billing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Máquina de estados mínima da reconciliação de cobranças.
// ---
// Pending -> Paid | Failed; estados terminais não regridem. O webhook do
// processador só aplica transições válidas, e toda transição aplicada vira
// uma entrada de auditoria de sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            "failed" => Some(InvoiceStatus::Failed),
            _ => None,
        }
    }

    /// Transições permitidas pela reconciliação.
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Pending, InvoiceStatus::Paid)
                | (InvoiceStatus::Pending, InvoiceStatus::Failed)
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub external_ref: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que o processador de pagamentos envia no webhook
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookPayload {
    pub external_ref: String,
    pub status: InvoiceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_settle_either_way() {
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Failed));
    }

    #[test]
    fn terminal_states_are_sticky() {
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Failed));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Pending));
        assert!(!InvoiceStatus::Failed.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Pending));
    }

    #[test]
    fn status_roundtrips_through_storage_strings() {
        for status in [InvoiceStatus::Pending, InvoiceStatus::Paid, InvoiceStatus::Failed] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceStatus::parse("refunded"), None);
    }
}
