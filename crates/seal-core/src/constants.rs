//! Constantes del motor de firmado.

/// Intentos máximos de resolución+commit ante contención en la cola de la
/// cadena. Superado el presupuesto se devuelve `SignError::Contention`.
pub const MAX_SIGN_ATTEMPTS: u32 = 3;

/// Backoff lineal entre reintentos (ms * número de intento).
pub const RETRY_BACKOFF_MS: u64 = 15;

/// Longitud hex de un digest SHA-256.
pub const DIGEST_HEX_LEN: usize = 64;
