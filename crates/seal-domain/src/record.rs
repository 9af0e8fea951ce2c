use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DomainError;
use std::fmt;

/// Claves de metadatos de firma. Son datos *sobre* la firma, no contenido
/// atestado: el canonicalizador las excluye si aparecen inline en `content`.
pub const RESERVED_KEYS: [&str; 4] = ["signedAt", "contentDigest", "previousDigest", "chainSeq"];

/// Bloque de firma de un registro. Los cuatro campos se fijan juntos,
/// exactamente una vez, y nunca se actualizan después (write-once).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSeal {
    signed_at: DateTime<Utc>,
    content_digest: String,
    previous_digest: Option<String>,
    chain_seq: u64,
}

impl SignatureSeal {
    pub fn new(signed_at: DateTime<Utc>,
               content_digest: impl Into<String>,
               previous_digest: Option<String>,
               chain_seq: u64)
               -> Result<Self, DomainError> {
        let content_digest = content_digest.into();
        validate_digest(&content_digest)?;
        if let Some(prev) = &previous_digest {
            validate_digest(prev)?;
        }
        if chain_seq == 0 {
            return Err(DomainError::ValidationError("chain_seq empieza en 1".to_string()));
        }
        // previous_digest None sólo puede corresponder a la primera posición
        Ok(SignatureSeal { signed_at,
                           content_digest,
                           previous_digest,
                           chain_seq })
    }

    pub fn signed_at(&self) -> DateTime<Utc> { self.signed_at }
    pub fn content_digest(&self) -> &str { &self.content_digest }
    pub fn previous_digest(&self) -> Option<&str> { self.previous_digest.as_deref() }
    pub fn chain_seq(&self) -> u64 { self.chain_seq }
}

/// Digest SHA-256 en hex minúsculas (64 chars).
fn validate_digest(digest: &str) -> Result<(), DomainError> {
    if digest.len() != 64 || !digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(DomainError::ValidationError(format!("digest inválido: {digest}")));
    }
    Ok(())
}

/// Documento firmable identificado por una clave única. El `content` es el
/// payload de negocio (mapping JSON arbitrario); el `seal` aparece sólo tras
/// el firmado y es inmutable a partir de entonces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    key: String,
    content: Value,
    #[serde(flatten)]
    seal: Option<SignatureSeal>,
}

impl Record {
    /// Crea un registro sin firmar. Valida clave y forma del contenido.
    pub fn new(key: impl Into<String>, content: Value) -> Result<Self, DomainError> {
        Self::from_parts(key, content, None)
    }

    /// Reconstruye un registro desde sus partes persistidas (capas de storage).
    pub fn from_parts(key: impl Into<String>,
                      content: Value,
                      seal: Option<SignatureSeal>)
                      -> Result<Self, DomainError> {
        let key = Self::validate_key(&key.into())?.to_string();
        if !content.is_object() {
            return Err(DomainError::ValidationError("el contenido debe ser un mapping JSON".to_string()));
        }
        Ok(Record { key, content, seal })
    }

    /// Normaliza y valida una clave de registro: no vacía tras trim, sin
    /// saltos de línea, longitud acotada.
    pub fn validate_key(key: &str) -> Result<&str, DomainError> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(DomainError::ValidationError("clave de registro vacía".to_string()));
        }
        if trimmed.len() > 512 || trimmed.chars().any(|c| c.is_control()) {
            return Err(DomainError::ValidationError(format!("clave de registro malformada: {key}")));
        }
        Ok(trimmed)
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn content(&self) -> &Value { &self.content }
    pub fn seal(&self) -> Option<&SignatureSeal> { self.seal.as_ref() }
    pub fn is_signed(&self) -> bool { self.seal.is_some() }

    /// Aplica el bloque de firma. Falla si el registro ya está firmado:
    /// los campos de firma son write-once.
    pub fn with_seal(self, seal: SignatureSeal) -> Result<Self, DomainError> {
        if self.seal.is_some() {
            return Err(DomainError::AlreadySealed(self.key.clone()));
        }
        Ok(Record { seal: Some(seal), ..self })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.seal {
            Some(s) => write!(f, "<record {} signed seq={}>", self.key, s.chain_seq()),
            None => write!(f, "<record {} unsigned>", self.key),
        }
    }
}
