//! seal-core: motor de firmado y encadenado (hash chain append-only)
pub mod auth;
pub mod chain;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod signer;
pub mod store;

pub use auth::RequestContext;
pub use chain::{resolve_previous_link, verify_chain, ChainIssue, ChainVerificationResult};
pub use errors::{classify_error, ErrorClass, SignError, StoreError};
pub use hashing::{canonical_content, hash_content, hash_str, to_canonical_json};
pub use signer::{SignOutcome, Signer};
pub use store::{ChainHead, CommitConflict, CommitOutcome, InMemoryRecordStore, RecordStore};

#[cfg(test)]
mod tests {
    use super::*;
    use seal_domain::Record;
    use serde_json::json;
    use std::sync::Arc;

    // Humo de extremo a extremo: dos firmas consecutivas quedan enlazadas
    // y la segunda apunta al digest de la primera.
    #[test]
    fn smoke_two_records_form_a_chain() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.put(Record::new("r1", json!({"patient": "X", "dose": 5})).unwrap()).unwrap();
        store.put(Record::new("r2", json!({"dose": 5, "patient": "X"})).unwrap()).unwrap();

        let signer = Signer::new(store.clone());
        let ctx = RequestContext::authenticated("dr-a");

        let first = signer.sign(&ctx, "r1").unwrap();
        assert_eq!(first.previous_digest, None);

        let second = signer.sign(&ctx, "r2").unwrap();
        assert_eq!(second.previous_digest.as_deref(), Some(first.content_digest.as_str()));
        // mismo contenido lógico (orden de claves distinto) => mismo digest
        assert_eq!(first.content_digest, second.content_digest);

        let report = verify_chain(store.as_ref()).unwrap();
        assert!(report.valid, "issues: {:?}", report.issues);
        assert_eq!(report.length, 2);
    }
}
