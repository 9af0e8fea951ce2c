//! Recorrido de verificación: lo que ejecuta un auditor para comprobar que
//! ningún registro firmado fue alterado y que la cadena es lineal, sin
//! huecos ni bifurcaciones.

use serde::Serialize;
use std::collections::HashMap;

use crate::errors::StoreError;
use crate::hashing::hash_content;
use crate::store::RecordStore;

/// Problema detectado durante el recorrido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainIssue {
    /// El contenido actual no reproduce el `contentDigest` firmado
    /// (mutación post-firma).
    DigestMismatch { key: String, stored: String, recomputed: String },
    /// El `previousDigest` no coincide con el digest del predecesor.
    BrokenLink {
        key: String,
        expected_previous: Option<String>,
        actual_previous: Option<String>,
    },
    /// Más de un registro reclama el mismo previous-link (fork). El slot
    /// null cuenta: sólo un registro puede ser el primero de la cadena.
    Fork { previous_digest: Option<String>, claimants: Vec<String> },
    /// Posiciones no contiguas en `chainSeq`.
    SequenceGap { key: String, expected_seq: u64, actual_seq: u64 },
    /// El ancla no apunta al último firmado.
    HeadMismatch { anchor: Option<String>, tail: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerificationResult {
    pub valid: bool,
    pub length: usize,
    pub issues: Vec<ChainIssue>,
}

/// Recorre todos los registros firmados en orden de cadena y acumula
/// problemas. Una cadena vacía es válida con longitud 0.
pub fn verify_chain(store: &dyn RecordStore) -> Result<ChainVerificationResult, StoreError> {
    let signed = store.signed_records()?;
    let head = store.chain_head()?;
    let mut issues = Vec::new();

    let mut claims: HashMap<Option<String>, Vec<String>> = HashMap::new();
    let mut previous_digest: Option<String> = None;

    for (idx, record) in signed.iter().enumerate() {
        let seal = match record.seal() {
            Some(s) => s,
            // signed_records() sólo devuelve firmados; un None aquí es
            // corrupción del backend
            None => return Err(StoreError::Corrupted(format!("unsigned record in chain walk: {}",
                                                             record.key()))),
        };

        let recomputed = hash_content(record.content());
        if recomputed != seal.content_digest() {
            issues.push(ChainIssue::DigestMismatch { key: record.key().to_string(),
                                                     stored: seal.content_digest().to_string(),
                                                     recomputed });
        }

        let actual_previous = seal.previous_digest().map(str::to_string);
        if actual_previous != previous_digest {
            issues.push(ChainIssue::BrokenLink { key: record.key().to_string(),
                                                 expected_previous: previous_digest.clone(),
                                                 actual_previous: actual_previous.clone() });
        }

        let expected_seq = idx as u64 + 1;
        if seal.chain_seq() != expected_seq {
            issues.push(ChainIssue::SequenceGap { key: record.key().to_string(),
                                                  expected_seq,
                                                  actual_seq: seal.chain_seq() });
        }

        claims.entry(actual_previous).or_default().push(record.key().to_string());
        previous_digest = Some(seal.content_digest().to_string());
    }

    for (prev, mut claimants) in claims {
        if claimants.len() > 1 {
            claimants.sort();
            issues.push(ChainIssue::Fork { previous_digest: prev, claimants });
        }
    }

    if head.digest != previous_digest {
        issues.push(ChainIssue::HeadMismatch { anchor: head.digest.clone(),
                                               tail: previous_digest });
    }

    Ok(ChainVerificationResult { valid: issues.is_empty(),
                                 length: signed.len(),
                                 issues })
}
