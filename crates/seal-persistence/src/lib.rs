//! seal-persistence
//!
//! Implementación Postgres (Diesel) del puerto de almacenamiento de
//! `seal-core`, con paridad semántica 1:1 respecto al backend in-memory:
//! mismo commit condicional, mismo contrato de `put` (nunca toca campos de
//! firma sobre un registro existente), mismo ancla de cadena.
//!
//! Módulos:
//! - `pg`: implementación de `RecordStore` sobre Postgres (tabla de
//!   registros + ancla `chain_head` de una sola fila).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::init_dotenv;
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgPool, PgRecordStore,
             PoolProvider};
