//! Backend in-memory del puerto de almacenamiento.
//!
//! Paridad semántica con el backend Postgres: misma disciplina de commit
//! condicional, mismo reloj-del-store para `signed_at`. El mutex sobre el
//! ancla es la unidad check-then-write; el mapa de registros va en DashMap
//! para lecturas concurrentes sin bloqueo global.

use chrono::Utc;
use dashmap::DashMap;
use seal_domain::{Record, SignatureSeal};
use serde_json::Value;
use std::sync::Mutex;

use super::types::{ChainHead, CommitConflict, CommitOutcome, RecordStore};
use crate::errors::StoreError;

pub struct InMemoryRecordStore {
    records: DashMap<String, Record>,
    head: Mutex<ChainHead>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        InMemoryRecordStore { records: DashMap::new(),
                              head: Mutex::new(ChainHead::default()) }
    }

    fn lock_head(&self) -> Result<std::sync::MutexGuard<'_, ChainHead>, StoreError> {
        self.head
            .lock()
            .map_err(|_| StoreError::Corrupted("chain head lock poisoned".to_string()))
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn put(&self, record: Record) -> Result<(), StoreError> {
        match self.records.get_mut(record.key()) {
            Some(mut existing) => {
                // sólo contenido de negocio; el seal existente (si lo hay)
                // se conserva intacto
                let seal = existing.seal().cloned();
                let updated = Record::from_parts(record.key(), record.content().clone(), seal)
                    .map_err(|e| StoreError::Corrupted(e.to_string()))?;
                *existing = updated;
            }
            None => {
                self.records.insert(record.key().to_string(), record);
            }
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    fn chain_head(&self) -> Result<ChainHead, StoreError> {
        Ok(self.lock_head()?.clone())
    }

    fn most_recently_signed(&self) -> Result<Option<Record>, StoreError> {
        let mut tail: Option<Record> = None;
        for entry in self.records.iter() {
            if let Some(seal) = entry.value().seal() {
                let is_newer = tail.as_ref()
                                   .and_then(|t| t.seal())
                                   .map(|s| seal.chain_seq() > s.chain_seq())
                                   .unwrap_or(true);
                if is_newer {
                    tail = Some(entry.value().clone());
                }
            }
        }
        Ok(tail)
    }

    fn signed_records(&self) -> Result<Vec<Record>, StoreError> {
        let mut signed: Vec<Record> = self.records
                                          .iter()
                                          .filter(|e| e.value().is_signed())
                                          .map(|e| e.value().clone())
                                          .collect();
        signed.sort_by_key(|r| r.seal().map(|s| s.chain_seq()).unwrap_or(0));
        Ok(signed)
    }

    fn commit_seal(&self,
                   key: &str,
                   expected_content: &Value,
                   expected_head: &ChainHead,
                   content_digest: &str)
                   -> Result<CommitOutcome, StoreError> {
        // El guard del ancla delimita la unidad atómica check-then-write:
        // nadie puede avanzar la cola entre la comparación y la escritura.
        let mut head = self.lock_head()?;
        if *head != *expected_head {
            return Ok(CommitOutcome::Conflict(CommitConflict::HeadMoved));
        }

        let mut entry = match self.records.get_mut(key) {
            Some(e) => e,
            None => return Ok(CommitOutcome::Conflict(CommitConflict::Missing)),
        };
        if entry.is_signed() {
            return Ok(CommitOutcome::Conflict(CommitConflict::AlreadySigned));
        }
        if entry.content() != expected_content {
            return Ok(CommitOutcome::Conflict(CommitConflict::ContentChanged));
        }

        let seq = head.seq + 1;
        let seal = SignatureSeal::new(Utc::now(), content_digest, expected_head.digest.clone(), seq)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let sealed = entry.clone()
                          .with_seal(seal.clone())
                          .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        *entry = sealed;
        drop(entry);

        head.digest = Some(content_digest.to_string());
        head.seq = seq;
        Ok(CommitOutcome::Committed(seal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_content;
    use serde_json::json;

    fn unsigned(key: &str, content: Value) -> Record {
        Record::new(key, content).unwrap()
    }

    #[test]
    fn commit_rejects_stale_head() {
        let store = InMemoryRecordStore::new();
        store.put(unsigned("a", json!({"v": 1}))).unwrap();
        store.put(unsigned("b", json!({"v": 2}))).unwrap();

        let head0 = store.chain_head().unwrap();
        let da = hash_content(&json!({"v": 1}));
        let db = hash_content(&json!({"v": 2}));

        // primer commit gana el slot null
        assert!(matches!(store.commit_seal("a", &json!({"v": 1}), &head0, &da).unwrap(),
                         CommitOutcome::Committed(_)));
        // el segundo, con ancla vieja, debe perder
        assert_eq!(store.commit_seal("b", &json!({"v": 2}), &head0, &db).unwrap(),
                   CommitOutcome::Conflict(CommitConflict::HeadMoved));
        // y con ancla fresca, encadenar sobre "a"
        let head1 = store.chain_head().unwrap();
        match store.commit_seal("b", &json!({"v": 2}), &head1, &db).unwrap() {
            CommitOutcome::Committed(seal) => {
                assert_eq!(seal.previous_digest(), Some(da.as_str()));
                assert_eq!(seal.chain_seq(), 2);
            }
            other => panic!("commit esperado, llegó {other:?}"),
        }
    }

    #[test]
    fn commit_detects_content_mutation() {
        let store = InMemoryRecordStore::new();
        store.put(unsigned("a", json!({"v": 1}))).unwrap();
        let head = store.chain_head().unwrap();
        let digest = hash_content(&json!({"v": 1}));
        // otro actor muta el contenido en la ventana de firmado
        store.put(unsigned("a", json!({"v": 99}))).unwrap();
        assert_eq!(store.commit_seal("a", &json!({"v": 1}), &head, &digest).unwrap(),
                   CommitOutcome::Conflict(CommitConflict::ContentChanged));
    }

    #[test]
    fn put_never_touches_an_existing_seal() {
        let store = InMemoryRecordStore::new();
        store.put(unsigned("a", json!({"v": 1}))).unwrap();
        let head = store.chain_head().unwrap();
        let digest = hash_content(&json!({"v": 1}));
        store.commit_seal("a", &json!({"v": 1}), &head, &digest).unwrap();

        // un put posterior reemplaza contenido pero conserva el seal
        store.put(unsigned("a", json!({"v": 2}))).unwrap();
        let rec = store.get("a").unwrap().unwrap();
        assert!(rec.is_signed());
        assert_eq!(rec.content(), &json!({"v": 2}));
        assert_eq!(rec.seal().unwrap().content_digest(), digest);
    }

    #[test]
    fn missing_record_conflicts() {
        let store = InMemoryRecordStore::new();
        let head = store.chain_head().unwrap();
        assert_eq!(store.commit_seal("nope", &json!({}), &head, &hash_content(&json!({}))).unwrap(),
                   CommitOutcome::Conflict(CommitConflict::Missing));
    }
}
