//! Hash helpers – SHA-256 como función de huella de contenido.

use sha2::{Digest, Sha256};

/// Hashea un string y devuelve hex minúsculas (64 chars). Función pura.
pub fn hash_str(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
