//! Módulo de hashing y canonicalización JSON.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::{canonical_content, to_canonical_json};
pub use hash::hash_str;

use serde_json::Value;

/// Digest de contenido: canonicaliza (excluyendo metadatos de firma) y
/// hashea. Es la función que fija `contentDigest` en el momento de la firma
/// y la que recalcula un auditor al verificar la cadena.
pub fn hash_content(content: &Value) -> String {
    hash_str(&canonical_content(content))
}
