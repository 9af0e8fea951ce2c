//! Recorrido de verificación: evidencia de manipulación sobre cadenas
//! sanas, manipuladas y fabricadas con corrupción deliberada.

use chrono::Utc;
use seal_core::{hash_content, verify_chain, ChainIssue, InMemoryRecordStore, RecordStore,
                RequestContext, Signer};
use seal_domain::{Record, SignatureSeal};
use serde_json::json;
use std::sync::Arc;

#[test]
fn empty_chain_is_valid_with_length_zero() {
    let store = InMemoryRecordStore::new();
    let report = verify_chain(&store).unwrap();
    assert!(report.valid);
    assert_eq!(report.length, 0);
}

#[test]
fn tampered_content_is_flagged_as_digest_mismatch() {
    let store = Arc::new(InMemoryRecordStore::new());
    for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
        store.put(Record::new(k, json!({"v": v})).unwrap()).unwrap();
    }
    let signer = Signer::new(store.clone());
    let ctx = RequestContext::authenticated("dr-a");
    for k in ["a", "b", "c"] {
        signer.sign(&ctx, k).unwrap();
    }
    assert!(verify_chain(store.as_ref()).unwrap().valid);

    // manipulación post-firma del contenido del registro del medio: put
    // reemplaza contenido sin tocar el seal, exactamente el escenario que
    // la evidencia de manipulación debe detectar
    store.put(Record::new("b", json!({"v": 222})).unwrap()).unwrap();

    let report = verify_chain(store.as_ref()).unwrap();
    assert!(!report.valid);
    assert_eq!(report.length, 3);
    assert!(report.issues.iter().any(|i| matches!(
        i,
        ChainIssue::DigestMismatch { key, .. } if key == "b"
    )), "issues: {:?}", report.issues);
    // los enlaces en sí siguen íntegros: el digest firmado no cambió
    assert!(!report.issues.iter().any(|i| matches!(i, ChainIssue::BrokenLink { .. })));
}

fn sealed(key: &str, content: serde_json::Value, previous: Option<String>, seq: u64) -> Record {
    let digest = hash_content(&content);
    let seal = SignatureSeal::new(Utc::now(), digest, previous, seq).unwrap();
    Record::new(key, content).unwrap().with_seal(seal).unwrap()
}

#[test]
fn duplicate_previous_link_is_flagged_as_fork() {
    let store = InMemoryRecordStore::new();
    let d1 = hash_content(&json!({"v": 1}));
    store.put(sealed("r1", json!({"v": 1}), None, 1)).unwrap();
    store.put(sealed("r2", json!({"v": 2}), Some(d1.clone()), 2)).unwrap();
    store.put(sealed("r3", json!({"v": 3}), Some(d1.clone()), 3)).unwrap();

    let report = verify_chain(&store).unwrap();
    assert!(!report.valid);
    assert!(report.issues.iter().any(|i| matches!(
        i,
        ChainIssue::Fork { previous_digest: Some(d), claimants } if *d == d1 && claimants.len() == 2
    )), "issues: {:?}", report.issues);
}

#[test]
fn two_chain_firsts_are_a_fork_over_the_null_slot() {
    let store = InMemoryRecordStore::new();
    store.put(sealed("r1", json!({"v": 1}), None, 1)).unwrap();
    store.put(sealed("r2", json!({"v": 2}), None, 2)).unwrap();

    let report = verify_chain(&store).unwrap();
    assert!(report.issues.iter().any(|i| matches!(
        i,
        ChainIssue::Fork { previous_digest: None, claimants } if claimants.len() == 2
    )), "issues: {:?}", report.issues);
}

#[test]
fn non_contiguous_positions_are_a_sequence_gap() {
    let store = InMemoryRecordStore::new();
    let d1 = hash_content(&json!({"v": 1}));
    store.put(sealed("r1", json!({"v": 1}), None, 1)).unwrap();
    store.put(sealed("r2", json!({"v": 2}), Some(d1), 3)).unwrap();

    let report = verify_chain(&store).unwrap();
    assert!(report.issues.iter().any(|i| matches!(
        i,
        ChainIssue::SequenceGap { key, expected_seq: 2, actual_seq: 3 } if key == "r2"
    )), "issues: {:?}", report.issues);
}

#[test]
fn fabricated_chain_without_anchor_update_is_a_head_mismatch() {
    let store = InMemoryRecordStore::new();
    // registro sellado insertado por fuera del commit condicional: el ancla
    // sigue en su estado inicial y la paridad se rompe
    store.put(sealed("r1", json!({"v": 1}), None, 1)).unwrap();

    let report = verify_chain(&store).unwrap();
    assert!(report.issues.iter().any(|i| matches!(i, ChainIssue::HeadMismatch { .. })),
            "issues: {:?}", report.issues);
}
