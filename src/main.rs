//! Binario de validación de escenarios (`main-core`): ejercita el motor de
//! firmado de punta a punta sobre el backend in-memory y, con el feature
//! `pg_demo`, contra Postgres real.

use std::sync::Arc;

use seal_core::{classify_error, hash_content, to_canonical_json, verify_chain, ErrorClass,
                InMemoryRecordStore, RecordStore, RequestContext, SignError, Signer};
use seal_domain::Record;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Validación: canonicalización independiente del orden de claves y digest
/// reproducible con una recomputación SHA-256 independiente.
fn run_canonicalization_validation() {
    let a = json!({"patient": "X", "dose": 5, "meta": {"unit": "mg", "route": "iv"}});
    let b = json!({"meta": {"route": "iv", "unit": "mg"}, "dose": 5, "patient": "X"});
    assert_eq!(to_canonical_json(&a), to_canonical_json(&b),
               "el orden de inserción de claves no puede afectar la forma canónica");

    // recomputación independiente del digest, sin pasar por el motor
    let mut hasher = Sha256::new();
    hasher.update(to_canonical_json(&a).as_bytes());
    let manual = format!("{:x}", hasher.finalize());
    assert_eq!(manual, hash_content(&a), "hash_content debe ser sha256(canonical)");

    println!("!Validación canonicalización: OK (orden de claves y digest reproducible)");
}

/// Validación: tres firmas secuenciales forman una cadena lineal enlazada
/// por digests, con ancla y escaneo en paridad.
fn run_chain_validation() {
    let store = Arc::new(InMemoryRecordStore::new());
    let signer = Signer::new(store.clone());
    let ctx = RequestContext::authenticated("dr-demo");

    let keys: Vec<String> = (0..3).map(|i| format!("eval-{i}-{}", Uuid::new_v4())).collect();
    for (i, key) in keys.iter().enumerate() {
        store.put(Record::new(key.clone(), json!({"patient": "X", "dose": i})).unwrap())
             .unwrap();
    }

    let mut previous: Option<String> = None;
    for key in &keys {
        let outcome = signer.sign(&ctx, key).expect("la firma debe aplicar");
        assert_eq!(outcome.previous_digest, previous, "previous-link fuera de orden");
        previous = Some(outcome.content_digest.clone());

        let sealed = store.get(key).unwrap().unwrap();
        let seal = sealed.seal().unwrap();
        println!("  firmado {} seq={} at={}", key, seal.chain_seq(),
                 seal.signed_at().to_rfc3339());
    }

    assert!(seal_core::chain::tail_parity(store.as_ref()).unwrap(),
            "ancla y escaneo deben coincidir");
    let report = verify_chain(store.as_ref()).unwrap();
    assert!(report.valid && report.length == 3);
    println!("!Validación cadena: OK (3 eslabones verificados)");
}

/// Validación: cada guard rechaza con su kind específico y sin efectos.
fn run_rejection_validation() {
    let store = Arc::new(InMemoryRecordStore::new());
    store.put(Record::new("known", json!({"v": 1})).unwrap()).unwrap();
    let signer = Signer::new(store.clone());
    let ctx = RequestContext::authenticated("dr-demo");

    assert!(matches!(signer.sign(&RequestContext::anonymous(), "known"),
                     Err(SignError::Unauthenticated)));
    assert!(matches!(signer.sign(&ctx, "  "), Err(SignError::InvalidArgument(_))));
    assert!(matches!(signer.sign(&ctx, "ghost"), Err(SignError::NotFound(_))));

    signer.sign(&ctx, "known").unwrap();
    let err = signer.sign(&ctx, "known").unwrap_err();
    assert!(matches!(&err, SignError::AlreadySigned(k) if k == "known"));
    assert_eq!(classify_error(&err), ErrorClass::Precondition);

    println!("!Validación rechazos: OK (guards terminales sin efectos)");
}

/// Validación: firmas concurrentes sobre registros distintos con la cadena
/// vacía; exactamente una gana el slot null y el resultado es lineal.
fn run_concurrency_validation() {
    const WORKERS: usize = 6;
    let store = Arc::new(InMemoryRecordStore::new());
    for i in 0..WORKERS {
        store.put(Record::new(format!("w{i}"), json!({"worker": i})).unwrap()).unwrap();
    }
    let signer = Arc::new(Signer::with_max_attempts(store.clone(), (WORKERS * 4) as u32));

    let handles: Vec<_> = (0..WORKERS).map(|i| {
                                          let signer = signer.clone();
                                          std::thread::spawn(move || {
                                              let ctx = RequestContext::authenticated(format!("w{i}"));
                                              signer.sign(&ctx, &format!("w{i}"))
                                          })
                                      })
                                      .collect();
    let outcomes: Vec<_> = handles.into_iter()
                                  .map(|h| h.join().unwrap().expect("todas las firmas deben aplicar"))
                                  .collect();

    let null_links = outcomes.iter().filter(|o| o.previous_digest.is_none()).count();
    assert_eq!(null_links, 1, "exactamente un primer eslabón");

    let report = verify_chain(store.as_ref()).unwrap();
    assert!(report.valid && report.length == WORKERS, "issues: {:?}", report.issues);
    println!("!Validación concurrencia: OK ({WORKERS} workers, cadena lineal única)");
}

/// Demo de persistencia: misma secuencia de firmas contra Postgres.
#[cfg(feature = "pg_demo")]
fn run_pg_demo() {
    use seal_persistence::{build_dev_pool_from_env, PgRecordStore};

    let pool = match build_dev_pool_from_env() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("pg_demo omitido: {e}");
            return;
        }
    };
    let store = Arc::new(PgRecordStore::from_pool(pool));
    let signer = Signer::new(store.clone());
    let ctx = RequestContext::authenticated("dr-demo");

    let key = format!("pg-demo-{}", Uuid::new_v4());
    store.put(Record::new(key.clone(), json!({"patient": "X", "dose": 5})).unwrap())
         .unwrap();
    let outcome = signer.sign(&ctx, &key).expect("firma en Postgres");
    println!("  pg firmado {} digest={} previous={:?}",
             key, outcome.content_digest, outcome.previous_digest);

    let report = verify_chain(store.as_ref()).unwrap();
    assert!(report.valid, "issues: {:?}", report.issues);
    println!("!Validación pg_demo: OK (cadena verificada en Postgres)");
}

fn main() {
    println!("== sealflow main-core ==");
    run_canonicalization_validation();
    run_chain_validation();
    run_rejection_validation();
    run_concurrency_validation();
    #[cfg(feature = "pg_demo")]
    run_pg_demo();
    println!("== validaciones completas ==");
}
