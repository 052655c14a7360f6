// src/middleware/provenance.rs

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, Extensions, HeaderMap};
use axum_extra::headers::{HeaderMapExt, UserAgent};

// Proveniência da requisição: endereço do cliente + user-agent.
// Capturada UMA vez por requisição e anexada a toda entrada de auditoria
// que a requisição gerar.
#[derive(Debug, Clone, Default)]
pub struct RequestProvenance {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Endereço do cliente: primeiro o X-Forwarded-For (estamos atrás do proxy
/// da plataforma), senão o endereço do socket.
pub(crate) fn client_address(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

impl<S> FromRequestParts<S> for RequestProvenance
where
    S: Send + Sync,
{
    // Proveniência faltando nunca derruba a requisição
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let ip_address = client_address(&parts.headers, &parts.extensions);
        let user_agent = parts
            .headers
            .typed_get::<UserAgent>()
            .map(|ua| ua.as_str().to_string());

        Ok(RequestProvenance { ip_address, user_agent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_header_wins_and_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );

        let addr = client_address(&headers, &Extensions::new());
        assert_eq!(addr.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn missing_everything_yields_none() {
        let addr = client_address(&HeaderMap::new(), &Extensions::new());
        assert_eq!(addr, None);
    }
}
