// src/handlers/webhooks.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::provenance::RequestProvenance,
    models::billing::{InvoiceStatus, PaymentWebhookPayload},
};

// POST /api/webhooks/payments
//
// Entrada sem autenticação (o processador chama de fora), então passa
// pelo tier public_write antes de chegar aqui. Webhooks duplicados e
// fora de ordem são esperados: só transições válidas da máquina de
// estados são aplicadas, e toda aplicação vira auditoria de SISTEMA
// (user_id nulo: nenhum usuário agiu).
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    provenance: RequestProvenance,
    Json(payload): Json<PaymentWebhookPayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state
        .invoice_repo
        .find_by_external_ref(&payload.external_ref)
        .await?
        .ok_or(AppError::NotFound)?;

    let current = InvoiceStatus::parse(&invoice.status).unwrap_or(InvoiceStatus::Pending);

    if !current.can_transition_to(payload.status) {
        // Duplicata ou regressão: reconhece sem aplicar, para o
        // processador parar de reenviar
        tracing::warn!(
            "💳 Webhook ignorado: transição {} -> {} inválida para {}",
            current.as_str(),
            payload.status.as_str(),
            payload.external_ref
        );
        return Ok((StatusCode::OK, Json(json!({ "applied": false }))));
    }

    let applied = app_state
        .invoice_repo
        .transition_status(&payload.external_ref, current, payload.status)
        .await?;

    if applied {
        let action = match payload.status {
            InvoiceStatus::Paid => "payment_reconciled",
            InvoiceStatus::Failed => "payment_failed",
            InvoiceStatus::Pending => "payment_received",
        };

        app_state.audit_service.record_system(
            invoice.tenant_id,
            Some(&provenance),
            action,
            "invoices",
            Some(invoice.id),
            json!({
                "externalRef": payload.external_ref,
                "from": current.as_str(),
                "to": payload.status.as_str(),
            }),
        );
    }

    Ok((StatusCode::OK, Json(json!({ "applied": applied }))))
}
