//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas, y éstas al
//! `StoreError` del core (infraestructura vs estado corrupto).

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use seal_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo("connection closed".into()),
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::Unknown(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            // Las violaciones de constraint son la defensa en profundidad
            // del esquema: si disparan, la disciplina CAS se saltó por
            // algún lado y el estado merece inspección, no reintento.
            PersistenceError::UniqueViolation(m) | PersistenceError::CheckViolation(m) => {
                StoreError::Corrupted(m)
            }
            PersistenceError::NotFound => StoreError::Corrupted("row vanished mid-operation".into()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
