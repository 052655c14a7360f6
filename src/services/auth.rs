// src/services/auth.rs

use axum::http::{header, HeaderName, HeaderValue};
use axum::response::Response;
use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{SessionRepository, TenantRepository, UserRepository},
    models::auth::{Claims, User},
};

use super::tenancy_service::{selection_outcome, SelectionOutcome};

// ---
// Acumulador de credenciais da troca de autenticação.
// ---
// Toda mutação de cookie/header acumulada durante login ou seleção de
// escola é reaplicada na RESPOSTA FINAL devolvida ao cliente, via
// `apply`. Montar headers em um objeto de resposta intermediário e
// devolver outro deixa o navegador com a credencial velha, e a seleção
// de escola nunca "pega".
#[derive(Debug, Default)]
pub struct CredentialExchange {
    headers: Vec<(HeaderName, HeaderValue)>,
}

pub const SESSION_COOKIE: &str = "escola_token";

impl CredentialExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra o cookie de sessão com o token recém-emitido.
    pub fn stamp_token(&mut self, token: &str) {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax",
            SESSION_COOKIE, token
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            self.headers.push((header::SET_COOKIE, value));
        }
    }

    /// Apaga o cookie de sessão (logout).
    pub fn clear_token(&mut self) {
        let cookie = format!(
            "{}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0",
            SESSION_COOKIE
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            self.headers.push((header::SET_COOKIE, value));
        }
    }

    /// Reaplica tudo o que foi acumulado NA resposta que vai ser devolvida.
    pub fn apply(self, mut response: Response) -> Response {
        for (name, value) in self.headers {
            response.headers_mut().append(name, value);
        }
        response
    }
}

// ---
// Emissão e validação de tokens (funções puras sobre o segredo)
// ---

const TOKEN_TTL_DAYS: i64 = 7;

/// Emite um token para a sessão, com ou sem o claim de escola (`tid`).
/// A seleção automática (vínculo único) e a explícita passam AMBAS por
/// aqui: pular a reemissão no caso de vínculo único deixa o claim velho
/// no token e o cliente entra em loop de redirecionamento.
pub fn mint_token(
    jwt_secret: &str,
    user_id: Uuid,
    session_id: Uuid,
    tenant_id: Option<Uuid>,
) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

    let claims = Claims {
        sub: user_id,
        jti: session_id,
        tid: tenant_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    // Usa '?' para um tratamento de erro mais limpo
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )?)
}

/// Decodifica e valida assinatura + expiração. Qualquer defeito = Unauthenticated.
pub fn decode_claims(jwt_secret: &str, token: &str) -> Result<Claims, AppError> {
    let validation = Validation::default();
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &validation,
    )
    .map_err(|_| AppError::Unauthenticated)?;

    Ok(token_data.claims)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    tenant_repo: TenantRepository,
    jwt_secret: String,
    pool: PgPool,
}

// O que o login devolve para o handler montar a resposta
pub struct IssuedCredential {
    pub token: String,
    pub tenant_selected: bool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        tenant_repo: TenantRepository,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, session_repo, tenant_repo, jwt_secret, pool }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<IssuedCredential, AppError> {
        // Hashing em thread separada (bcrypt é pesado de propósito)
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let new_user = self
            .user_repo
            .create_user(&self.pool, email, &hashed_password, display_name)
            .await?;

        let session = self.session_repo.create(new_user.id).await?;

        // Usuário recém-criado não tem vínculo nenhum: sem claim de escola.
        let token = mint_token(&self.jwt_secret, new_user.id, session.id, None)?;
        Ok(IssuedCredential { token, tenant_selected: false })
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<IssuedCredential, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let session = self.session_repo.create(user.id).await?;

        // Decide o destino da sessão pelo número de vínculos:
        // zero ou vários -> token sem escola; exatamente um -> carimba já.
        let memberships = self.tenant_repo.list_membership_summaries(user.id).await?;
        match selection_outcome(&memberships) {
            SelectionOutcome::Single(tenant_id) => {
                let token = self
                    .stamp_tenant(user.id, session.id, tenant_id)
                    .await?;
                Ok(IssuedCredential { token, tenant_selected: true })
            }
            SelectionOutcome::NoMemberships | SelectionOutcome::Multiple => {
                let token = mint_token(&self.jwt_secret, user.id, session.id, None)?;
                Ok(IssuedCredential { token, tenant_selected: false })
            }
        }
    }

    /// Carimba a escola no token da sessão: o caminho ÚNICO de seleção,
    /// usado tanto pela escolha explícita quanto pelo vínculo único.
    pub async fn stamp_tenant(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<String, AppError> {
        self.tenant_repo
            .find_active_by_id(tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        self.tenant_repo
            .find_usable_membership(user_id, tenant_id)
            .await?
            .ok_or(AppError::MembershipNotFound)?;

        mint_token(&self.jwt_secret, user_id, session_id, Some(tenant_id))
    }

    /// Valida o token e devolve usuário + claims. Sessão revogada (logout
    /// em qualquer aba/dispositivo) falha aqui, na próxima requisição.
    pub async fn validate_token(&self, token: &str) -> Result<(User, Claims), AppError> {
        let claims = decode_claims(&self.jwt_secret, token)?;

        if !self.session_repo.is_alive(claims.jti).await? {
            return Err(AppError::Unauthenticated);
        }

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        Ok((user, claims))
    }

    pub async fn logout(&self, claims: &Claims) -> Result<(), AppError> {
        self.session_repo.revoke(claims.jti).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn token_roundtrip_preserves_tenant_claim() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        let token = mint_token("segredo-de-teste", user_id, session_id, Some(tenant_id))
            .expect("emite token");
        let claims = decode_claims("segredo-de-teste", &token).expect("decodifica");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.jti, session_id);
        assert_eq!(claims.tid, Some(tenant_id));
    }

    #[test]
    fn token_without_tenant_claim_decodes_to_none() {
        let token = mint_token("segredo-de-teste", Uuid::new_v4(), Uuid::new_v4(), None)
            .expect("emite token");
        let claims = decode_claims("segredo-de-teste", &token).expect("decodifica");
        assert_eq!(claims.tid, None);
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = mint_token("segredo-a", Uuid::new_v4(), Uuid::new_v4(), None)
            .expect("emite token");
        assert!(matches!(
            decode_claims("segredo-b", &token),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn exchange_replays_cookies_onto_the_final_response() {
        let mut exchange = CredentialExchange::new();
        exchange.stamp_token("token-novo");

        // A resposta FINAL, não uma intermediária descartada
        let response = Response::new(Body::empty());
        let response = exchange.apply(response);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("cookie presente")
            .to_str()
            .expect("ascii");
        assert!(cookie.contains("escola_token=token-novo"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn clear_token_expires_the_cookie() {
        let mut exchange = CredentialExchange::new();
        exchange.clear_token();

        let response = exchange.apply(Response::new(Body::empty()));
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("cookie presente")
            .to_str()
            .expect("ascii");
        assert!(cookie.contains("Max-Age=0"));
    }
}
