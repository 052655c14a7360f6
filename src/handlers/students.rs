// src/handlers/students.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        provenance::RequestProvenance,
        rbac::{PermManageSensitiveRecords, PermViewStudents, RequirePermission},
        tenancy::TenantContext,
    },
    models::students::{StudentResponse, UpdateHealthPayload},
};

// GET /api/students/{id}
//
// As fichas sensíveis só entram na resposta se o cargo tiver
// view_sensitive_records, e essa leitura fica na trilha de auditoria.
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    tag = "Students",
    params(("id" = Uuid, Path, description = "ID do aluno")),
    responses(
        (status = 200, description = "Aluno", body = StudentResponse),
        (status = 403, description = "Sem a permissão view_students"),
        (status = 404, description = "Aluno não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_student(
    State(app_state): State<AppState>,
    context: TenantContext,
    provenance: RequestProvenance,
    _: RequirePermission<PermViewStudents>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<StudentResponse>, AppError> {
    let include_sensitive = context.has_permission("view_sensitive_records");

    let student = app_state
        .student_service
        .get_student(&context, &provenance, student_id, include_sensitive)
        .await?;

    Ok(Json(student))
}

// PATCH /api/students/{id}/health
//
// A mutação sensível completa: contexto -> permissão -> cifra -> gravação
// -> auditoria (critical). A trilha guarda QUAIS campos mudaram, nunca o
// conteúdo.
#[utoipa::path(
    patch,
    path = "/api/students/{id}/health",
    tag = "Students",
    params(("id" = Uuid, Path, description = "ID do aluno")),
    request_body = UpdateHealthPayload,
    responses(
        (status = 200, description = "Fichas atualizadas", body = StudentResponse),
        (status = 403, description = "Sem a permissão manage_sensitive_records"),
        (status = 404, description = "Aluno não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_student_health(
    State(app_state): State<AppState>,
    context: TenantContext,
    provenance: RequestProvenance,
    _: RequirePermission<PermManageSensitiveRecords>,
    Path(student_id): Path<Uuid>,
    Json(payload): Json<UpdateHealthPayload>,
) -> Result<Json<StudentResponse>, AppError> {
    let student = app_state
        .student_service
        .update_health(&context, &provenance, student_id, payload)
        .await?;

    Ok(Json(student))
}
