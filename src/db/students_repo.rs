// src/db/students_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::db_utils::acquire_rls_connection;
use crate::common::error::AppError;
use crate::models::students::Student;

// Cadastro de alunos. Todas as consultas passam pela conexão com RLS
// armado E filtram tenant_id explicitamente (defesa em profundidade).
#[derive(Clone)]
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Student>, AppError> {
        let mut conn = acquire_rls_connection(&self.pool, tenant_id, user_id).await?;

        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, tenant_id, full_name, medical_notes, custody_notes,
                   created_at, updated_at
            FROM students
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(student_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(student)
    }

    /// Grava as fichas sensíveis. Os valores chegam aqui JÁ cifrados
    /// (ou em claro, se o cifrador estiver degradado): o repositório não
    /// conhece o cifrador.
    pub async fn update_health_fields(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        student_id: Uuid,
        medical_notes: Option<&str>,
        custody_notes: Option<&str>,
    ) -> Result<Option<Student>, AppError> {
        let mut conn = acquire_rls_connection(&self.pool, tenant_id, user_id).await?;

        let student = sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET medical_notes = COALESCE($3, medical_notes),
                custody_notes = COALESCE($4, custody_notes),
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING id, tenant_id, full_name, medical_notes, custody_notes,
                      created_at, updated_at
            "#,
        )
        .bind(student_id)
        .bind(tenant_id)
        .bind(medical_notes)
        .bind(custody_notes)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(student)
    }
}
