// src/services/student_service.rs

use uuid::Uuid;

use crate::{
    common::{crypto::FieldCipher, error::AppError},
    db::StudentRepository,
    middleware::{provenance::RequestProvenance, tenancy::TenantContext},
    models::students::{Student, StudentResponse, UpdateHealthPayload},
    services::audit_service::AuditService,
};

// A composição obrigatória de toda mutação sensível: contexto resolvido ->
// permissão checada (no handler) -> cifra -> mutação -> auditoria.
#[derive(Clone)]
pub struct StudentService {
    repo: StudentRepository,
    cipher: FieldCipher,
    audit: AuditService,
}

impl StudentService {
    pub fn new(repo: StudentRepository, cipher: FieldCipher, audit: AuditService) -> Self {
        Self { repo, cipher, audit }
    }

    /// Busca um aluno. Com `include_sensitive` (quem chama já provou
    /// view_sensitive_records), decifra as fichas e registra a leitura
    /// na trilha; sem, os campos sensíveis nem saem do serviço.
    pub async fn get_student(
        &self,
        context: &TenantContext,
        provenance: &RequestProvenance,
        student_id: Uuid,
        include_sensitive: bool,
    ) -> Result<StudentResponse, AppError> {
        let student = self
            .repo
            .find_by_id(context.tenant.id, context.user.id, student_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !include_sensitive {
            return Ok(self.to_response(student, false));
        }

        let response = self.to_response(student, true);

        self.audit.record(
            context,
            provenance,
            "student_sensitive_viewed",
            "students",
            Some(student_id),
            serde_json::json!({}),
        );

        Ok(response)
    }

    /// Atualiza as fichas sensíveis, cifrando antes de gravar.
    pub async fn update_health(
        &self,
        context: &TenantContext,
        provenance: &RequestProvenance,
        student_id: Uuid,
        payload: UpdateHealthPayload,
    ) -> Result<StudentResponse, AppError> {
        let medical = payload
            .medical_notes
            .as_deref()
            .map(|v| self.cipher.encrypt_field(v));
        let custody = payload
            .custody_notes
            .as_deref()
            .map(|v| self.cipher.encrypt_field(v));

        // Para a trilha: QUAIS campos mudaram, nunca os valores
        let mut changed: Vec<&str> = Vec::new();
        if medical.is_some() {
            changed.push("medical_notes");
        }
        if custody.is_some() {
            changed.push("custody_notes");
        }

        let student = self
            .repo
            .update_health_fields(
                context.tenant.id,
                context.user.id,
                student_id,
                medical.as_deref(),
                custody.as_deref(),
            )
            .await?
            .ok_or(AppError::NotFound)?;

        self.audit.record(
            context,
            provenance,
            "student_sensitive_updated",
            "students",
            Some(student_id),
            serde_json::json!({ "fields": changed }),
        );

        Ok(self.to_response(student, true))
    }

    fn to_response(&self, student: Student, include_sensitive: bool) -> StudentResponse {
        let (medical_notes, custody_notes) = if include_sensitive {
            (
                student.medical_notes.as_deref().map(|v| self.cipher.decrypt_field(v)),
                student.custody_notes.as_deref().map(|v| self.cipher.decrypt_field(v)),
            )
        } else {
            (None, None)
        };

        StudentResponse {
            id: student.id,
            full_name: student.full_name,
            medical_notes,
            custody_notes,
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}
