// src/services/audit_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::AuditSink,
    middleware::{provenance::RequestProvenance, tenancy::TenantContext},
    models::audit::{classify_action, AuditItem, NewAuditEntry},
};

// ---
// O serviço de auditoria: melhor esforço, NUNCA no caminho crítico.
// ---
// A escrita acontece numa task destacada com a credencial elevada. Se o
// storage falhar, o erro é logado e engolido: a disponibilidade da ação
// primária vale mais que a completude da trilha para UMA requisição.
// A aposta é que falhas são raras e monitoradas: buraco na trilha é
// incidente operacional, não erro de usuário.
#[derive(Clone)]
pub struct AuditService {
    sink: Arc<dyn AuditSink>,
}

impl AuditService {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Registra uma ação atribuída a um usuário do contexto.
    pub fn record(
        &self,
        context: &TenantContext,
        provenance: &RequestProvenance,
        action: &str,
        entity_type: &str,
        entity_id: Option<Uuid>,
        metadata: serde_json::Value,
    ) {
        let entry = build_entry(
            context.tenant.id,
            Some(context.user.id),
            provenance,
            action,
            entity_type,
            entity_id,
            metadata,
        );
        self.dispatch(entry);
    }

    /// Registra uma ação de sistema (webhook, tarefa agendada): sem usuário.
    pub fn record_system(
        &self,
        tenant_id: Uuid,
        provenance: Option<&RequestProvenance>,
        action: &str,
        entity_type: &str,
        entity_id: Option<Uuid>,
        metadata: serde_json::Value,
    ) {
        let empty = RequestProvenance::default();
        let entry = build_entry(
            tenant_id,
            None,
            provenance.unwrap_or(&empty),
            action,
            entity_type,
            entity_id,
            metadata,
        );
        self.dispatch(entry);
    }

    /// Registra um lote como UMA transação, todas as entradas marcadas
    /// com o mesmo batchId.
    pub fn record_bulk(
        &self,
        context: &TenantContext,
        provenance: &RequestProvenance,
        items: Vec<AuditItem>,
    ) {
        if items.is_empty() {
            return;
        }

        let batch_id = Uuid::new_v4();
        let entries: Vec<NewAuditEntry> = items
            .into_iter()
            .map(|item| {
                let mut metadata = item.metadata;
                if let Some(map) = metadata.as_object_mut() {
                    map.insert("batchId".into(), serde_json::json!(batch_id));
                } else {
                    metadata = serde_json::json!({ "batchId": batch_id });
                }
                build_entry(
                    context.tenant.id,
                    Some(context.user.id),
                    provenance,
                    &item.action,
                    &item.entity_type,
                    item.entity_id,
                    metadata,
                )
            })
            .collect();

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.append_batch(entries).await {
                tracing::error!("📋 Falha ao gravar lote de auditoria (engolida): {:#}", e);
            }
        });
    }

    // Dispara a escrita e esquece. O resultado da task nunca volta para
    // o chamador.
    fn dispatch(&self, entry: NewAuditEntry) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.append(entry).await {
                tracing::error!("📋 Falha ao gravar entrada de auditoria (engolida): {:#}", e);
            }
        });
    }
}

fn build_entry(
    tenant_id: Uuid,
    user_id: Option<Uuid>,
    provenance: &RequestProvenance,
    action: &str,
    entity_type: &str,
    entity_id: Option<Uuid>,
    metadata: serde_json::Value,
) -> NewAuditEntry {
    NewAuditEntry {
        tenant_id,
        user_id,
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id,
        metadata,
        sensitivity: classify_action(action),
        ip_address: provenance.ip_address.clone(),
        user_agent: provenance.user_agent.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audit::Sensitivity;
    use crate::models::{auth::User, rbac::Role, tenancy::Tenant};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    // Sink que falha sempre: simula o storage de auditoria fora do ar
    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn append(&self, _entry: NewAuditEntry) -> anyhow::Result<()> {
            anyhow::bail!("storage de auditoria indisponível")
        }

        async fn append_batch(&self, _entries: Vec<NewAuditEntry>) -> anyhow::Result<()> {
            anyhow::bail!("storage de auditoria indisponível")
        }
    }

    // Sink que captura o que seria gravado
    #[derive(Default)]
    struct CapturingSink {
        entries: Mutex<Vec<NewAuditEntry>>,
        batches: Mutex<Vec<Vec<NewAuditEntry>>>,
    }

    #[async_trait]
    impl AuditSink for CapturingSink {
        async fn append(&self, entry: NewAuditEntry) -> anyhow::Result<()> {
            self.entries.lock().expect("lock").push(entry);
            Ok(())
        }

        async fn append_batch(&self, entries: Vec<NewAuditEntry>) -> anyhow::Result<()> {
            self.batches.lock().expect("lock").push(entries);
            Ok(())
        }
    }

    fn context() -> TenantContext {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            slug: "aurora".into(),
            name: "Escola Aurora".into(),
            settings: serde_json::json!({}),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let role = Role {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            name: "Coordenadora".into(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let user = User {
            id: Uuid::new_v4(),
            email: "ana@escola.com".into(),
            password_hash: "hash".into(),
            display_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        TenantContext::new(tenant, user, role, vec!["view_audit_logs".into()])
    }

    fn provenance() -> RequestProvenance {
        RequestProvenance {
            ip_address: Some("203.0.113.9".into()),
            user_agent: Some("Mozilla/5.0".into()),
        }
    }

    async fn settle() {
        // Dá espaço para as tasks destacadas rodarem
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn storage_outage_never_fails_the_primary_action() {
        let service = AuditService::new(Arc::new(FailingSink));
        let ctx = context();

        // `record` não devolve Result: a ação primária segue como sucesso
        service.record(
            &ctx,
            &provenance(),
            "student_sensitive_updated",
            "students",
            Some(Uuid::new_v4()),
            serde_json::json!({"fields": ["medical_notes"]}),
        );
        settle().await;
    }

    #[tokio::test]
    async fn entries_are_enriched_with_provenance_and_sensitivity() {
        let sink = Arc::new(CapturingSink::default());
        let service = AuditService::new(Arc::clone(&sink) as Arc<dyn AuditSink>);
        let ctx = context();

        service.record(
            &ctx,
            &provenance(),
            "student_sensitive_viewed",
            "students",
            None,
            serde_json::json!({}),
        );
        settle().await;

        let entries = sink.entries.lock().expect("lock");
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.tenant_id, ctx.tenant.id);
        assert_eq!(entry.user_id, Some(ctx.user.id));
        assert_eq!(entry.sensitivity, Sensitivity::High);
        assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(entry.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn system_entries_have_no_acting_user() {
        let sink = Arc::new(CapturingSink::default());
        let service = AuditService::new(Arc::clone(&sink) as Arc<dyn AuditSink>);
        let tenant_id = Uuid::new_v4();

        service.record_system(
            tenant_id,
            None,
            "payment_reconciled",
            "invoices",
            Some(Uuid::new_v4()),
            serde_json::json!({"status": "paid"}),
        );
        settle().await;

        let entries = sink.entries.lock().expect("lock");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, None);
        assert_eq!(entries[0].sensitivity, Sensitivity::Medium);
    }

    #[tokio::test]
    async fn bulk_entries_share_one_batch_marker() {
        let sink = Arc::new(CapturingSink::default());
        let service = AuditService::new(Arc::clone(&sink) as Arc<dyn AuditSink>);
        let ctx = context();

        let items = vec![
            AuditItem {
                action: "member_suspended".into(),
                entity_type: "memberships".into(),
                entity_id: Some(Uuid::new_v4()),
                metadata: serde_json::json!({}),
            },
            AuditItem {
                action: "member_suspended".into(),
                entity_type: "memberships".into(),
                entity_id: Some(Uuid::new_v4()),
                metadata: serde_json::json!({}),
            },
        ];
        service.record_bulk(&ctx, &provenance(), items);
        settle().await;

        let batches = sink.batches.lock().expect("lock");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);

        let marker_a = batches[0][0].metadata.get("batchId").cloned();
        let marker_b = batches[0][1].metadata.get("batchId").cloned();
        assert!(marker_a.is_some());
        assert_eq!(marker_a, marker_b);
    }
}
