use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// As falhas "duras" de resolução de contexto (Unauthenticated, NoTenantSelected,
// TenantNotFound, MembershipNotFound) carregam um `code` na resposta para o
// cliente saber se redireciona para o login ou para a seleção de escola.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Não autenticado")]
    Unauthenticated,

    #[error("Nenhuma escola selecionada")]
    NoTenantSelected,

    #[error("Escola não encontrada ou desativada")]
    TenantNotFound,

    #[error("Vínculo com a escola não encontrado")]
    MembershipNotFound,

    #[error("Permissão '{0}' necessária")]
    Forbidden(String),

    #[error("Limite de requisições excedido")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Registro não encontrado")]
    NotFound,

    #[error("Convite inválido ou já utilizado")]
    InvitationInvalid,

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            // Retornar todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // O 429 leva Retry-After para o cliente saber quando tentar de novo.
            AppError::RateLimited { reset_at } => {
                let retry_after = (reset_at - Utc::now()).num_seconds().max(0);
                let body = Json(json!({
                    "error": "Muitas requisições. Tente novamente em instantes.",
                    "code": "RATE_LIMITED",
                    "resetAt": reset_at,
                }));
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    body,
                )
                    .into_response();
            }

            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, None, "Este e-mail já está em uso."),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, None, "E-mail ou senha inválidos."),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Some("UNAUTHENTICATED"),
                "Token de autenticação inválido, expirado ou ausente.",
            ),
            AppError::NoTenantSelected => (
                StatusCode::UNAUTHORIZED,
                Some("NO_TENANT_SELECTED"),
                "Nenhuma escola selecionada para esta sessão.",
            ),
            AppError::TenantNotFound => (
                StatusCode::UNAUTHORIZED,
                Some("TENANT_NOT_FOUND"),
                "A escola desta sessão não existe ou foi desativada.",
            ),
            AppError::MembershipNotFound => (
                StatusCode::UNAUTHORIZED,
                Some("MEMBERSHIP_NOT_FOUND"),
                "Seu vínculo com esta escola não está mais ativo.",
            ),
            AppError::Forbidden(ref perm) => {
                let body = Json(json!({
                    "error": format!("Você precisa da permissão '{}' para realizar esta ação.", perm),
                    "code": "FORBIDDEN",
                }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            AppError::UserNotFound => (StatusCode::NOT_FOUND, None, "Usuário não encontrado."),
            AppError::NotFound => (StatusCode::NOT_FOUND, None, "Registro não encontrado."),
            AppError::InvitationInvalid => (StatusCode::GONE, None, "Convite inválido ou já utilizado."),
            AppError::UniqueConstraintViolation(_) => {
                (StatusCode::CONFLICT, None, "Já existe um registro com esses dados.")
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `#[from]` cuidou da conversão, agora só precisamos tratar o que fazer com eles.
            // O `tracing` vai logar a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = match code {
            Some(code) => Json(json!({ "error": error_message, "code": code })),
            None => Json(json!({ "error": error_message })),
        };
        (status, body).into_response()
    }
}
