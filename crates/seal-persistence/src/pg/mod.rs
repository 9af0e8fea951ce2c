//! Implementación Postgres (Diesel) del puerto de almacenamiento.
//!
//! Objetivo del módulo:
//! - Paridad 1:1 con el backend in-memory del core: mismo contrato de
//!   `put`, misma disciplina de commit condicional, misma ancla de cadena.
//! - El check-then-write de la firma se ejecuta dentro de UNA transacción
//!   Diesel con UPDATEs guardados (chequeo de filas afectadas): la misma
//!   garantía de snapshot cubre la comparación del ancla y la escritura del
//!   seal. Un fallo de cualquiera de las condiciones revierte todo.
//! - El esquema añade defensa en profundidad (índice único parcial sobre
//!   `previous_digest`, CHECKs de campos juntos), pero la corrección no
//!   depende de ella: depende del CAS.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sql_types::{BigInt, Nullable, Text, Timestamptz};
use log::debug;
use serde_json::Value;

use seal_core::{ChainHead, CommitConflict, CommitOutcome, RecordStore, StoreError};
use seal_domain::{Record, SignatureSeal};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{chain_head, signed_records};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o
/// factorear en tests unitarios sin acoplar a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Obtiene una conexión lista para ejecutar consultas Diesel.
    fn connection(&self)
                  -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self)
                  -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila mapeada de `signed_records` para lecturas.
#[derive(Queryable, Debug)]
struct RecordRow {
    key: String,
    content: Value,
    signed_at: Option<DateTime<Utc>>,
    content_digest: Option<String>,
    previous_digest: Option<String>,
    chain_seq: Option<i64>,
}

/// Fila para inserción en `signed_records`. En la práctica los campos de
/// firma llegan en NULL (los registros nacen sin firmar); se aceptan
/// poblados para reconstrucciones/backfills.
#[derive(Insertable, Debug)]
#[diesel(table_name = signed_records)]
struct NewRecordRow<'a> {
    key: &'a str,
    content: &'a Value,
    signed_at: Option<DateTime<Utc>>,
    content_digest: Option<&'a str>,
    previous_digest: Option<&'a str>,
    chain_seq: Option<i64>,
}

/// Shape del RETURNING del UPDATE guardado de firma.
#[derive(QueryableByName)]
struct SealedRow {
    #[diesel(sql_type = Timestamptz)]
    signed_at: DateTime<Utc>,
    #[diesel(sql_type = BigInt)]
    chain_seq: i64,
}

fn record_from_row(row: RecordRow) -> Result<Record, StoreError> {
    let seal = match (row.signed_at, row.content_digest, row.chain_seq) {
        (Some(ts), Some(digest), Some(seq)) => {
            Some(SignatureSeal::new(ts, digest, row.previous_digest, seq as u64)
                .map_err(|e| StoreError::Corrupted(e.to_string()))?)
        }
        (None, None, None) => None,
        _ => {
            // el CHECK del esquema lo impide; si llega, el estado está roto
            return Err(StoreError::Corrupted(format!("partial signature fields for key {}",
                                                     row.key)));
        }
    };
    Record::from_parts(row.key, row.content, seal).map_err(|e| StoreError::Corrupted(e.to_string()))
}

/// Error interno de la transacción de firma: distingue conflictos de
/// condición (que revierten y salen como `CommitOutcome::Conflict`) de
/// errores reales de base.
enum TxError {
    Conflict(CommitConflict),
    Domain(String),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(e: diesel::result::Error) -> Self {
        TxError::Db(e)
    }
}

/// Implementación Postgres de `RecordStore`.
pub struct PgRecordStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgRecordStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn conn(&self)
            -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        self.provider.connection().map_err(StoreError::from)
    }
}

impl PgRecordStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

impl<P: ConnectionProvider> RecordStore for PgRecordStore<P> {
    fn put(&self, record: Record) -> Result<(), StoreError> {
        debug!("put:start key={}", record.key());
        let mut conn = self.conn()?;
        let seal = record.seal();
        let row = NewRecordRow { key: record.key(),
                                 content: record.content(),
                                 signed_at: seal.map(|s| s.signed_at()),
                                 content_digest: seal.map(|s| s.content_digest()),
                                 previous_digest: seal.and_then(|s| s.previous_digest()),
                                 chain_seq: seal.map(|s| s.chain_seq() as i64) };
        // upsert de contenido: sobre un registro existente jamás se tocan
        // los campos de firma
        diesel::insert_into(signed_records::table)
            .values(&row)
            .on_conflict(signed_records::key)
            .do_update()
            .set(signed_records::content.eq(record.content()))
            .execute(&mut conn)
            .map_err(|e| StoreError::from(PersistenceError::from(e)))?;
        debug!("put:done key={}", record.key());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<RecordRow> = signed_records::table
            .find(key)
            .first(&mut conn)
            .optional()
            .map_err(|e| StoreError::from(PersistenceError::from(e)))?;
        row.map(record_from_row).transpose()
    }

    fn chain_head(&self) -> Result<ChainHead, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<(Option<String>, i64)> = chain_head::table
            .select((chain_head::head_digest, chain_head::seq))
            .first(&mut conn)
            .optional()
            .map_err(|e| StoreError::from(PersistenceError::from(e)))?;
        match row {
            Some((digest, seq)) => Ok(ChainHead { digest, seq: seq as u64 }),
            None => {
                // base recién creada sin fila semilla: sembrar el ancla vacía
                diesel::insert_into(chain_head::table)
                    .values((chain_head::id.eq(true), chain_head::seq.eq(0_i64)))
                    .on_conflict_do_nothing()
                    .execute(&mut conn)
                    .map_err(|e| StoreError::from(PersistenceError::from(e)))?;
                Ok(ChainHead::default())
            }
        }
    }

    fn most_recently_signed(&self) -> Result<Option<Record>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<RecordRow> = signed_records::table
            .filter(signed_records::signed_at.is_not_null())
            .order(signed_records::chain_seq.desc())
            .first(&mut conn)
            .optional()
            .map_err(|e| StoreError::from(PersistenceError::from(e)))?;
        row.map(record_from_row).transpose()
    }

    fn signed_records(&self) -> Result<Vec<Record>, StoreError> {
        let mut conn = self.conn()?;
        let rows: Vec<RecordRow> = signed_records::table
            .filter(signed_records::signed_at.is_not_null())
            .order(signed_records::chain_seq.asc())
            .load(&mut conn)
            .map_err(|e| StoreError::from(PersistenceError::from(e)))?;
        rows.into_iter().map(record_from_row).collect()
    }

    fn commit_seal(&self,
                   key: &str,
                   expected_content: &Value,
                   expected_head: &ChainHead,
                   content_digest: &str)
                   -> Result<CommitOutcome, StoreError> {
        debug!("commit_seal:start key={key} expected_seq={}", expected_head.seq);
        let mut conn = self.conn()?;

        let result = conn.build_transaction().read_write().run(|tx| {
            // Paso 1: CAS sobre el ancla. El UPDATE condicionado toma el
            // row lock; un competidor que ya avanzó la cola deja la
            // condición en falso y 0 filas afectadas.
            let moved = diesel::sql_query(
                "UPDATE chain_head SET head_digest = $1, seq = seq + 1 \
                 WHERE id AND head_digest IS NOT DISTINCT FROM $2 AND seq = $3",
            )
            .bind::<Text, _>(content_digest)
            .bind::<Nullable<Text>, _>(expected_head.digest.as_deref())
            .bind::<BigInt, _>(expected_head.seq as i64)
            .execute(tx)?;
            if moved == 0 {
                return Err(TxError::Conflict(CommitConflict::HeadMoved));
            }

            // Paso 2: escritura guardada del seal. La igualdad jsonb de
            // Postgres es semántica, igual que la comparación de Value en
            // el backend in-memory.
            let sealed: Option<SealedRow> = diesel::sql_query(
                "UPDATE signed_records \
                 SET signed_at = now(), content_digest = $1, previous_digest = $2, chain_seq = $3 \
                 WHERE key = $4 AND signed_at IS NULL AND content = $5 \
                 RETURNING signed_at, chain_seq",
            )
            .bind::<Text, _>(content_digest)
            .bind::<Nullable<Text>, _>(expected_head.digest.as_deref())
            .bind::<BigInt, _>((expected_head.seq + 1) as i64)
            .bind::<Text, _>(key)
            .bind::<diesel::sql_types::Jsonb, _>(expected_content)
            .get_result(tx)
            .optional()?;

            match sealed {
                Some(row) => {
                    SignatureSeal::new(row.signed_at,
                                       content_digest,
                                       expected_head.digest.clone(),
                                       row.chain_seq as u64)
                        .map_err(|e| TxError::Domain(e.to_string()))
                }
                None => {
                    // diagnosticar la causa dentro de la misma transacción
                    // y revertir (el avance del ancla del paso 1 se deshace)
                    let row: Option<RecordRow> =
                        signed_records::table.find(key).first(tx).optional()?;
                    let conflict = match row {
                        None => CommitConflict::Missing,
                        Some(r) if r.signed_at.is_some() => CommitConflict::AlreadySigned,
                        Some(_) => CommitConflict::ContentChanged,
                    };
                    Err(TxError::Conflict(conflict))
                }
            }
        });

        match result {
            Ok(seal) => {
                debug!("commit_seal:done key={key} seq={}", seal.chain_seq());
                Ok(CommitOutcome::Committed(seal))
            }
            Err(TxError::Conflict(conflict)) => {
                debug!("commit_seal:conflict key={key} cause={conflict:?}");
                Ok(CommitOutcome::Conflict(conflict))
            }
            Err(TxError::Domain(msg)) => Err(StoreError::Corrupted(msg)),
            Err(TxError::Db(e)) => Err(StoreError::from(PersistenceError::from(e))),
        }
    }
}

/// Construye un pool Postgres r2d2 a partir de URL. Ejecuta las migraciones
/// pendientes una sola vez tras el primer checkout.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración y construye un
/// pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
