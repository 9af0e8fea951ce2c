//! Flujo de firma de punta a punta sobre el backend in-memory: guards,
//! payload de éxito y rechazos terminales.

use seal_core::{classify_error, hash_content, ErrorClass, InMemoryRecordStore, RecordStore,
                RequestContext, SignError, Signer};
use seal_domain::Record;
use serde_json::json;
use std::sync::Arc;

fn store_with(records: &[(&str, serde_json::Value)]) -> Arc<InMemoryRecordStore> {
    let store = Arc::new(InMemoryRecordStore::new());
    for (key, content) in records {
        store.put(Record::new(*key, content.clone()).unwrap()).unwrap();
    }
    store
}

#[test]
fn first_signature_wins_the_null_slot() {
    let content = json!({"patient": "X", "dose": 5});
    let store = store_with(&[("r1", content.clone())]);
    let signer = Signer::new(store.clone());

    let outcome = signer.sign(&RequestContext::authenticated("dr-a"), "r1").unwrap();
    assert_eq!(outcome.status, "ok");
    assert_eq!(outcome.previous_digest, None);
    assert_eq!(outcome.content_digest, hash_content(&content));

    let sealed = store.get("r1").unwrap().unwrap();
    let seal = sealed.seal().expect("debe quedar firmado");
    assert_eq!(seal.content_digest(), outcome.content_digest);
    assert_eq!(seal.chain_seq(), 1);
}

#[test]
fn outcome_payload_has_the_documented_shape() {
    let store = store_with(&[("r1", json!({"dose": 5}))]);
    let outcome = Signer::new(store).sign(&RequestContext::authenticated("dr-a"), "r1").unwrap();
    let payload = serde_json::to_value(&outcome).unwrap();
    assert_eq!(payload["status"], json!("ok"));
    assert!(payload["contentDigest"].is_string());
    assert_eq!(payload["previousDigest"], serde_json::Value::Null);
}

#[test]
fn unauthenticated_is_rejected_before_any_store_access() {
    let store = store_with(&[]);
    let signer = Signer::new(store);
    let err = signer.sign(&RequestContext::anonymous(), "r1").unwrap_err();
    assert_eq!(err, SignError::Unauthenticated);
    assert_eq!(classify_error(&err), ErrorClass::Validation);
}

#[test]
fn malformed_key_is_invalid_argument() {
    let store = store_with(&[]);
    let signer = Signer::new(store);
    let err = signer.sign(&RequestContext::authenticated("dr-a"), "   ").unwrap_err();
    assert!(matches!(err, SignError::InvalidArgument(_)), "llegó {err:?}");
}

#[test]
fn unknown_key_is_not_found() {
    let store = store_with(&[]);
    let err = Signer::new(store).sign(&RequestContext::authenticated("dr-a"), "ghost").unwrap_err();
    assert_eq!(err, SignError::NotFound("ghost".to_string()));
}

#[test]
fn key_is_trimmed_before_lookup() {
    let store = store_with(&[("r1", json!({"dose": 5}))]);
    let outcome = Signer::new(store).sign(&RequestContext::authenticated("dr-a"), "  r1  ").unwrap();
    assert_eq!(outcome.status, "ok");
}

#[test]
fn signing_twice_is_an_idempotent_rejection() {
    let store = store_with(&[("r1", json!({"dose": 5}))]);
    let signer = Signer::new(store.clone());
    let ctx = RequestContext::authenticated("dr-a");

    signer.sign(&ctx, "r1").unwrap();
    let snapshot = store.get("r1").unwrap().unwrap();

    for _ in 0..3 {
        let err = signer.sign(&ctx, "r1").unwrap_err();
        assert_eq!(err, SignError::AlreadySigned("r1".to_string()));
        assert_eq!(classify_error(&err), ErrorClass::Precondition);
    }
    // ningún campo del registro cambió con los rechazos
    assert_eq!(store.get("r1").unwrap().unwrap(), snapshot);
}

#[test]
fn chain_links_follow_signing_order() {
    let store = store_with(&[("a", json!({"v": 1})), ("b", json!({"v": 2})), ("c", json!({"v": 3}))]);
    let signer = Signer::new(store.clone());
    let ctx = RequestContext::authenticated("dr-a");

    let oa = signer.sign(&ctx, "a").unwrap();
    let ob = signer.sign(&ctx, "b").unwrap();
    let oc = signer.sign(&ctx, "c").unwrap();

    assert_eq!(oa.previous_digest, None);
    assert_eq!(ob.previous_digest.as_deref(), Some(oa.content_digest.as_str()));
    assert_eq!(oc.previous_digest.as_deref(), Some(ob.content_digest.as_str()));

    let tail = store.most_recently_signed().unwrap().unwrap();
    assert_eq!(tail.key(), "c");
}
