//! Orquestador de firma. Máquina de estados por petición:
//! `Unsigned → Signing → Signed`, con rechazo terminal en cada guard.
//!
//! El Signer no guarda estado mutable entre peticiones; todo el estado vive
//! en el store. La corrección bajo concurrencia descansa por completo en el
//! commit condicional del store, no en duración de locks.

use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use seal_domain::Record;

use crate::auth::RequestContext;
use crate::chain::resolve_previous_link;
use crate::constants::{MAX_SIGN_ATTEMPTS, RETRY_BACKOFF_MS};
use crate::errors::SignError;
use crate::hashing::{canonical_content, hash_str};
use crate::store::{CommitConflict, CommitOutcome, RecordStore};

/// Payload de éxito de una firma, tal como lo recibe el caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutcome {
    pub status: &'static str,
    pub content_digest: String,
    pub previous_digest: Option<String>,
}

impl SignOutcome {
    fn ok(content_digest: String, previous_digest: Option<String>) -> Self {
        SignOutcome { status: "ok",
                      content_digest,
                      previous_digest }
    }
}

/// Orquestador de peticiones de firma. El store se inyecta en construcción
/// (nada de handles globales), lo que permite dobles de prueba.
pub struct Signer {
    store: Arc<dyn RecordStore>,
    max_attempts: u32,
}

impl Signer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_max_attempts(store, MAX_SIGN_ATTEMPTS)
    }

    /// Presupuesto de reintentos configurable (tests de contención).
    pub fn with_max_attempts(store: Arc<dyn RecordStore>, max_attempts: u32) -> Self {
        Signer { store,
                 max_attempts: max_attempts.max(1) }
    }

    /// Firma el registro `key`. Devuelve el payload completo de éxito o
    /// exactamente un error de la taxonomía; nunca una firma parcial.
    pub fn sign(&self, ctx: &RequestContext, key: &str) -> Result<SignOutcome, SignError> {
        // -- guards (Unsigned → Signing) --
        if !ctx.is_authenticated() {
            return Err(SignError::Unauthenticated);
        }
        let key = Record::validate_key(key).map_err(|e| SignError::InvalidArgument(e.to_string()))?;

        let record = self.store
                         .get(key)?
                         .ok_or_else(|| SignError::NotFound(key.to_string()))?;
        if record.is_signed() {
            return Err(SignError::AlreadySigned(key.to_string()));
        }

        // -- Signing --
        // El contenido se lee una sola vez aquí; el commit re-valida que no
        // haya mutado en la ventana de firmado.
        let content = record.content().clone();
        let canonical = canonical_content(&content);
        let content_digest = hash_str(&canonical);
        debug!("sign:start request_id={} key={key} digest={content_digest}",
               ctx.request_id());

        let mut attempts = 0;
        loop {
            attempts += 1;
            let head = resolve_previous_link(self.store.as_ref())?;
            match self.store.commit_seal(key, &content, &head, &content_digest)? {
                CommitOutcome::Committed(seal) => {
                    debug!("sign:done request_id={} key={key} seq={} previous={:?}",
                           ctx.request_id(),
                           seal.chain_seq(),
                           seal.previous_digest());
                    return Ok(SignOutcome::ok(seal.content_digest().to_string(),
                                              seal.previous_digest().map(str::to_string)));
                }
                CommitOutcome::Conflict(CommitConflict::HeadMoved) => {
                    if attempts >= self.max_attempts {
                        warn!("sign:contention request_id={} key={key} attempts={attempts}",
                              ctx.request_id());
                        return Err(SignError::Contention { attempts });
                    }
                    warn!("sign:head moved request_id={} key={key} attempt={attempts}",
                          ctx.request_id());
                    std::thread::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempts)));
                }
                CommitOutcome::Conflict(CommitConflict::AlreadySigned) => {
                    // otro worker ganó la carrera sobre este mismo registro
                    return Err(SignError::AlreadySigned(key.to_string()));
                }
                CommitOutcome::Conflict(CommitConflict::ContentChanged) => {
                    // mutación de contenido durante la ventana de firmado:
                    // contención, el caller decide si rehace la petición
                    return Err(SignError::Contention { attempts });
                }
                CommitOutcome::Conflict(CommitConflict::Missing) => {
                    return Err(SignError::NotFound(key.to_string()));
                }
            }
        }
    }
}
