//! Errores del motor de firmado y su clasificación.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallos del colaborador de almacenamiento. Infraestructura, no dominio:
/// se propagan al caller sin reintento interno.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum StoreError {
    #[error("store unavailable: {0}")] Unavailable(String),
    #[error("store state corrupted: {0}")] Corrupted(String),
}

/// Taxonomía de errores de una petición de firma. Los de dominio son
/// terminales (nunca se reintentan internamente); sólo la contención sobre
/// la cola de la cadena pasa por el presupuesto de reintentos del Signer.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum SignError {
    #[error("caller is not authenticated")] Unauthenticated,
    #[error("invalid record key: {0}")] InvalidArgument(String),
    #[error("record not found: {0}")] NotFound(String),
    #[error("record already signed: {0}")] AlreadySigned(String),
    #[error("chain tail contention after {attempts} attempts")] Contention { attempts: u32 },
    #[error(transparent)] Store(#[from] StoreError),
}

/// Clase operacional de un error, para la capa que decide reintentos
/// externos / alertas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Petición malformada o no autorizada; reintentar no ayuda.
    Validation,
    /// Precondición de dominio violada (no existe / ya firmado); terminal.
    Precondition,
    /// Colisión con escritores concurrentes; el caller puede reintentar la
    /// petición completa.
    Contention,
    /// Fallo de infraestructura; reintentable a nivel operacional.
    Infrastructure,
}

pub fn classify_error(err: &SignError) -> ErrorClass {
    match err {
        SignError::Unauthenticated | SignError::InvalidArgument(_) => ErrorClass::Validation,
        SignError::NotFound(_) | SignError::AlreadySigned(_) => ErrorClass::Precondition,
        SignError::Contention { .. } => ErrorClass::Contention,
        SignError::Store(_) => ErrorClass::Infrastructure,
    }
}
