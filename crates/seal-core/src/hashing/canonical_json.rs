//! Canonical JSON: serialización determinista e independiente del orden de
//! inserción de claves. Dos representaciones en memoria del mismo contenido
//! lógico producen bytes idénticos, a cualquier nivel de anidamiento.

use seal_domain::RESERVED_KEYS;
use serde_json::Value;
use std::collections::BTreeMap;

/// Serializa un `Value` a su forma canónica: claves ordenadas
/// lexicográficamente en todos los niveles, sin whitespace, escape de
/// strings y formato numérico estables (los de serde_json).
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut tree = BTreeMap::new();
            for (k, v) in map {
                tree.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> = tree
                .into_iter()
                .map(|(k, v)| format!("{}:{}", serde_json::to_string(&k).unwrap(), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// Forma canónica del contenido de un registro: excluye las claves de
/// metadatos de firma si llegan inline en el mapping (layouts de documento
/// que guardan todo en un solo nivel). El mapping vacío canonicaliza a
/// `{}`, determinista y distinto de cualquier otro contenido.
pub fn canonical_content(content: &Value) -> String {
    match content {
        Value::Object(map) => {
            let mut stripped = serde_json::Map::new();
            for (k, v) in map {
                if !RESERVED_KEYS.contains(&k.as_str()) {
                    stripped.insert(k.clone(), v.clone());
                }
            }
            to_canonical_json(&Value::Object(stripped))
        }
        other => to_canonical_json(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_matter() {
        let a = json!({"patient": "X", "dose": 5, "meta": {"b": 1, "a": 2}});
        let b = json!({"meta": {"a": 2, "b": 1}, "dose": 5, "patient": "X"});
        assert_eq!(to_canonical_json(&a), to_canonical_json(&b));
    }

    #[test]
    fn nested_arrays_preserve_element_order() {
        let a = json!({"xs": [{"b": 1, "a": 2}, 3]});
        assert_eq!(to_canonical_json(&a), r#"{"xs":[{"a":2,"b":1},3]}"#);
        // el orden de los elementos del array sí es significativo
        let b = json!({"xs": [3, {"a": 2, "b": 1}]});
        assert_ne!(to_canonical_json(&a), to_canonical_json(&b));
    }

    #[test]
    fn signature_metadata_is_stripped_from_content() {
        let inline = json!({
            "dose": 5,
            "signedAt": "2024-01-01T00:00:00Z",
            "contentDigest": "aa",
            "previousDigest": null,
            "chainSeq": 9
        });
        assert_eq!(canonical_content(&inline), r#"{"dose":5}"#);
        // pero sólo al nivel superior: dentro del payload son contenido normal
        let nested = json!({"dose": 5, "audit": {"signedAt": "x"}});
        assert_eq!(canonical_content(&nested), r#"{"audit":{"signedAt":"x"},"dose":5}"#);
    }

    #[test]
    fn empty_mapping_is_deterministic() {
        assert_eq!(canonical_content(&json!({})), "{}");
        assert_ne!(canonical_content(&json!({})), canonical_content(&json!({"a": null})));
    }
}
