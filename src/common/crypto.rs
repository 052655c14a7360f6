// src/common/crypto.rs

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

// O prefixo versionado do envelope. A presença dele é o que distingue um
// valor cifrado de texto puro legado, então dados mistos convivem na mesma
// coluna durante o rollout da chave.
const ENVELOPE_PREFIX: &str = "enc:v1:";

// Nonce de 96 bits e tag de 128 bits, os tamanhos padrão do GCM.
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

// Lista estática de campos cifrados por entidade. Nomes ficam de fora
// porque precisam continuar pesquisáveis e ordenáveis no banco.
const ENCRYPTED_FIELDS: &[(&str, &[&str])] = &[
    ("students", &["medical_notes", "custody_notes"]),
];

/// Consulta a lista de campos que devem passar pelo cifrador.
pub fn is_encrypted_field(entity_type: &str, field: &str) -> bool {
    ENCRYPTED_FIELDS
        .iter()
        .any(|(entity, fields)| *entity == entity_type && fields.contains(&field))
}

// O cifrador de campos sensíveis (AES-256-GCM).
//
// Se a chave não estiver configurada (ou for inválida), o cifrador degrada:
// `encrypt_field` devolve o texto puro (logando alto) em vez de derrubar o
// caminho de escrita, e `decrypt_field` repassa qualquer valor sem envelope.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Option<Aes256Gcm>,
}

impl FieldCipher {
    /// Monta o cifrador a partir de uma chave de 256 bits em hex (64 caracteres).
    pub fn new(key_hex: Option<&str>) -> Self {
        let cipher = key_hex.and_then(|raw| match hex::decode(raw.trim()) {
            Ok(bytes) if bytes.len() == 32 => {
                Some(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bytes)))
            }
            Ok(bytes) => {
                tracing::error!(
                    "🔑 FIELD_ENCRYPTION_KEY tem {} bytes, esperados 32. Cifrador DESATIVADO.",
                    bytes.len()
                );
                None
            }
            Err(e) => {
                tracing::error!("🔑 FIELD_ENCRYPTION_KEY não é hex válido ({}). Cifrador DESATIVADO.", e);
                None
            }
        });

        if cipher.is_none() {
            tracing::warn!("⚠️ Criptografia de campos indisponível: valores sensíveis serão gravados em claro.");
        }

        Self { cipher }
    }

    /// Flag de capacidade calculada na inicialização, checada nos call sites.
    pub fn is_available(&self) -> bool {
        self.cipher.is_some()
    }

    /// Cifra um campo sensível, devolvendo o envelope `enc:v1:<iv>:<ct>:<tag>`.
    ///
    /// Sem chave configurada devolve o texto puro: uma página quebrada é pior
    /// do que um valor temporariamente em claro, que já está atrás do controle
    /// de acesso.
    pub fn encrypt_field(&self, plaintext: &str) -> String {
        let Some(cipher) = &self.cipher else {
            tracing::warn!("⚠️ encrypt_field chamado sem chave: gravando valor em claro.");
            return plaintext.to_string();
        };

        // Nonce aleatório a cada chamada. Reuso de nonce quebra o GCM.
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        match cipher.encrypt(nonce, plaintext.as_bytes()) {
            Ok(combined) => {
                // O aead devolve ciphertext||tag; separamos para o envelope.
                let split_at = combined.len() - TAG_LEN;
                let (ciphertext, tag) = combined.split_at(split_at);
                format!(
                    "{}{}:{}:{}",
                    ENVELOPE_PREFIX,
                    hex::encode(nonce_bytes),
                    hex::encode(ciphertext),
                    hex::encode(tag)
                )
            }
            Err(e) => {
                tracing::error!("🔐 Falha ao cifrar campo ({}). Gravando valor em claro.", e);
                plaintext.to_string()
            }
        }
    }

    /// Decifra um valor armazenado.
    ///
    /// Valores sem o prefixo do envelope são texto puro legado e passam
    /// direto. Envelope corrompido, tag inválida ou chave errada devolvem o
    /// valor bruto armazenado (o GCM nunca entrega um plaintext errado).
    pub fn decrypt_field(&self, stored: &str) -> String {
        if !stored.starts_with(ENVELOPE_PREFIX) {
            return stored.to_string();
        }

        let Some(cipher) = &self.cipher else {
            tracing::warn!("⚠️ decrypt_field chamado sem chave: devolvendo valor armazenado.");
            return stored.to_string();
        };

        let Some((nonce_bytes, payload)) = parse_envelope(stored) else {
            tracing::error!("🔐 Envelope de campo cifrado malformado.");
            return stored.to_string();
        };

        let nonce = Nonce::from_slice(&nonce_bytes);
        match cipher.decrypt(nonce, payload.as_slice()) {
            Ok(plaintext) => match String::from_utf8(plaintext) {
                Ok(s) => s,
                Err(_) => {
                    tracing::error!("🔐 Campo decifrado não é UTF-8 válido.");
                    stored.to_string()
                }
            },
            Err(_) => {
                tracing::error!("🔐 Falha de autenticação ao decifrar campo (tag inválida ou chave errada).");
                stored.to_string()
            }
        }
    }
}

// Desmonta `enc:v1:<iv>:<ct>:<tag>` em (nonce, ciphertext||tag).
fn parse_envelope(stored: &str) -> Option<([u8; NONCE_LEN], Vec<u8>)> {
    let mut parts = stored.splitn(5, ':');
    if parts.next() != Some("enc") || parts.next() != Some("v1") {
        return None;
    }

    let iv_hex = parts.next()?;
    let ct_hex = parts.next()?;
    let tag_hex = parts.next()?;

    let iv = hex::decode(iv_hex).ok()?;
    if iv.len() != NONCE_LEN {
        return None;
    }
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&iv);

    let tag = hex::decode(tag_hex).ok()?;
    if tag.len() != TAG_LEN {
        return None;
    }

    // Remonta ciphertext||tag, o formato que o aead espera.
    let mut payload = hex::decode(ct_hex).ok()?;
    payload.extend_from_slice(&tag);

    Some((nonce, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher_with_key() -> FieldCipher {
        FieldCipher::new(Some(&hex::encode([42u8; 32])))
    }

    #[test]
    fn roundtrip_preserves_plaintext() {
        let cipher = cipher_with_key();
        let stored = cipher.encrypt_field("alergia grave a amendoim");
        assert!(stored.starts_with("enc:v1:"));
        assert_eq!(cipher.decrypt_field(&stored), "alergia grave a amendoim");
    }

    #[test]
    fn plaintext_without_prefix_passes_through() {
        let cipher = cipher_with_key();
        assert_eq!(cipher.decrypt_field("valor legado em claro"), "valor legado em claro");
        assert_eq!(cipher.decrypt_field(""), "");
    }

    #[test]
    fn same_plaintext_encrypts_to_different_envelopes() {
        let cipher = cipher_with_key();
        let a = cipher.encrypt_field("mesmo texto");
        let b = cipher.encrypt_field("mesmo texto");
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ciphertext_returns_stored_value() {
        let cipher = cipher_with_key();
        let stored = cipher.encrypt_field("guarda exclusiva da mãe");

        // Troca um caractere hex do ciphertext (quarta seção do envelope)
        let mut parts: Vec<String> = stored.split(':').map(String::from).collect();
        let flipped = if parts[3].starts_with('0') { "1" } else { "0" };
        parts[3].replace_range(0..1, flipped);
        let tampered = parts.join(":");

        assert_eq!(cipher.decrypt_field(&tampered), tampered);
    }

    #[test]
    fn tampered_tag_returns_stored_value() {
        let cipher = cipher_with_key();
        let stored = cipher.encrypt_field("nota médica");

        let mut parts: Vec<String> = stored.split(':').map(String::from).collect();
        let flipped = if parts[4].starts_with('0') { "1" } else { "0" };
        parts[4].replace_range(0..1, flipped);
        let tampered = parts.join(":");

        assert_eq!(cipher.decrypt_field(&tampered), tampered);
    }

    #[test]
    fn wrong_key_returns_stored_value() {
        let cipher = cipher_with_key();
        let stored = cipher.encrypt_field("segredo");

        let other = FieldCipher::new(Some(&hex::encode([7u8; 32])));
        assert_eq!(other.decrypt_field(&stored), stored);
    }

    #[test]
    fn missing_key_degrades_to_plaintext() {
        let cipher = FieldCipher::new(None);
        assert!(!cipher.is_available());
        assert_eq!(cipher.encrypt_field("sem chave"), "sem chave");
        assert_eq!(cipher.decrypt_field("sem chave"), "sem chave");
    }

    #[test]
    fn malformed_key_degrades_to_plaintext() {
        let cipher = FieldCipher::new(Some("nao-e-hex"));
        assert!(!cipher.is_available());

        let short = FieldCipher::new(Some(&hex::encode([1u8; 16])));
        assert!(!short.is_available());
    }

    #[test]
    fn truncated_envelope_returns_stored_value() {
        let cipher = cipher_with_key();
        assert_eq!(cipher.decrypt_field("enc:v1:abcd"), "enc:v1:abcd");
        assert_eq!(cipher.decrypt_field("enc:v1:zz:zz:zz"), "enc:v1:zz:zz:zz");
    }

    #[test]
    fn allow_list_covers_sensitive_student_fields() {
        assert!(is_encrypted_field("students", "medical_notes"));
        assert!(is_encrypted_field("students", "custody_notes"));
        assert!(!is_encrypted_field("students", "full_name"));
        assert!(!is_encrypted_field("invoices", "status"));
    }
}
