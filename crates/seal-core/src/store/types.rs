//! Puerto de almacenamiento: el contrato que el motor consume y que las
//! implementaciones (in-memory, Postgres) deben cumplir con la misma
//! semántica, en particular el commit condicional (compare-and-swap).

use seal_domain::{Record, SignatureSeal};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreError;

/// Ancla de la cola de la cadena: digest del último registro firmado (None
/// si aún no se firmó ninguno) más un contador monótono asignado por el
/// mismo commit atómico. El par completo participa del compare-and-swap,
/// por lo que la resolución de previous-link nunca puede observar un estado
/// intermedio ni sufrir ABA.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainHead {
    pub digest: Option<String>,
    pub seq: u64,
}

/// Resultado de un commit condicional de firma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// El seal quedó escrito como unidad atómica; se devuelve tal como quedó
    /// persistido (timestamp del reloj del store incluido).
    Committed(SignatureSeal),
    /// La condición falló; nada fue escrito.
    Conflict(CommitConflict),
}

/// Causa por la que un commit condicional no aplicó.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitConflict {
    /// La cola de la cadena cambió desde la resolución del previous-link.
    HeadMoved,
    /// Otro worker firmó este registro primero.
    AlreadySigned,
    /// El contenido mutó desde que fue canonicalizado.
    ContentChanged,
    /// El registro desapareció del store.
    Missing,
}

/// Colaborador de almacenamiento de registros.
///
/// Reglas del contrato:
/// - `put` sólo escribe contenido de negocio; jamás toca los campos de
///   firma (esos sólo los escribe `commit_seal`).
/// - `commit_seal` es la única vía de firmado y debe ejecutar la
///   verificación de condiciones y la escritura como una unidad atómica
///   bajo la misma garantía de snapshot. Sin esa primitiva el motor no
///   puede garantizar ausencia de forks.
/// - `signed_records` devuelve los firmados en orden de cadena
///   (`chain_seq` ascendente).
pub trait RecordStore: Send + Sync {
    /// Inserta el registro o reemplaza su contenido de negocio.
    fn put(&self, record: Record) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Lee el ancla de la cola. Para una cadena vacía: `{digest: None, seq: 0}`.
    fn chain_head(&self) -> Result<ChainHead, StoreError>;

    /// Consulta de paridad/diagnóstico: el firmado con mayor posición,
    /// resuelto escaneando la población (el mecanismo que el ancla
    /// reemplaza como fuente de verdad).
    fn most_recently_signed(&self) -> Result<Option<Record>, StoreError>;

    /// Registros firmados en orden de cadena, para el recorrido de
    /// verificación.
    fn signed_records(&self) -> Result<Vec<Record>, StoreError>;

    /// Commit condicional: escribe el seal completo sólo si (a) el ancla
    /// sigue siendo exactamente `expected_head`, (b) el registro existe y
    /// sigue sin firmar, y (c) su contenido es el mismo que
    /// `expected_content`. El `previous_digest` del seal es el digest del
    /// ancla esperada; `chain_seq` y `signed_at` los asigna el store.
    fn commit_seal(&self,
                   key: &str,
                   expected_content: &Value,
                   expected_head: &ChainHead,
                   content_digest: &str)
                   -> Result<CommitOutcome, StoreError>;
}
