//! Secuenciador de cadena: resolución del previous-link y recorrido de
//! verificación de integridad.
//!
//! La resolución lee el ancla dedicada (`ChainHead`), no un escaneo de la
//! población: la corrección bajo concurrencia descansa en que el commit
//! final se condiciona a que el ancla no haya cambiado (ver
//! `RecordStore::commit_seal`), de modo que dos firmas concurrentes nunca
//! pueden reclamar el mismo previous-link.

pub mod verify;

pub use verify::{verify_chain, ChainIssue, ChainVerificationResult};

use log::debug;

use crate::errors::StoreError;
use crate::store::{ChainHead, RecordStore};

/// Resuelve el previous-link para un nuevo evento de firma: la cola actual
/// de la cadena. `digest: None` significa que la cadena está vacía y el
/// slot null está en juego (mismo CAS que cualquier otra posición).
pub fn resolve_previous_link(store: &dyn RecordStore) -> Result<ChainHead, StoreError> {
    let head = store.chain_head()?;
    debug!("resolve_previous_link: seq={} digest={:?}", head.seq, head.digest);
    Ok(head)
}

/// Chequeo de paridad entre el ancla y la consulta por escaneo
/// (`most_recently_signed`). Ambas vistas deben coincidir en reposo; una
/// divergencia indica corrupción del store o escrituras por fuera del
/// commit condicional.
pub fn tail_parity(store: &dyn RecordStore) -> Result<bool, StoreError> {
    let head = store.chain_head()?;
    let scanned = store.most_recently_signed()?;
    let scanned_digest = scanned.as_ref()
                                .and_then(|r| r.seal())
                                .map(|s| s.content_digest().to_string());
    Ok(head.digest == scanned_digest)
}
