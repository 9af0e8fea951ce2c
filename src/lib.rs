//! SealFlow Rust Library
//!
//! Este crate actúa como fachada del workspace:
//! - `seal_domain`: registros y bloque de firma (write-once).
//! - `seal_core`: canonicalización, hashing, secuenciador de cadena y Signer.
//! - `seal_persistence` (feature `pg_demo`): backend Postgres del store.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub use seal_core;
pub use seal_domain;

#[cfg(feature = "pg_demo")]
pub use seal_persistence;
