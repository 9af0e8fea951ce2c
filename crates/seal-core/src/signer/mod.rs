//! Signer: orquestación de una petición de firma de extremo a extremo.

pub mod core;

pub use core::{SignOutcome, Signer};
