//! Canonical content hash of desired resources.
//!
//! The hash is computed over the JSON form of the object with the hash
//! annotation itself removed, and stored under [`RESOURCE_HASH_ANNOTATION`].
//! Object keys are sorted recursively before encoding, so equal objects hash
//! equally whatever map ordering `serde_json` is built with.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crds::RESOURCE_HASH_ANNOTATION;
use kube::Resource;
use kube::api::ObjectMeta;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// base64(SHA-256(canonical JSON of `obj`)).
pub fn resource_hash<T: Serialize>(obj: &T) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(&canonicalize(serde_json::to_value(obj)?))?;
    Ok(STANDARD.encode(Sha256::digest(&canonical)))
}

/// Rebuilds every object in `value` with its keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(entries.into_iter().map(|(k, v)| (k, canonicalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Recomputes and stores the hash annotation of `obj`.
///
/// Re-stamping an already stamped object yields the same value.
pub fn add_hash_annotation<T: Resource + Serialize>(obj: &mut T) -> Result<(), serde_json::Error> {
    remove_hash_annotation(obj.meta_mut());
    let hash = resource_hash(obj)?;
    obj.meta_mut()
        .annotations
        .get_or_insert_with(Default::default)
        .insert(RESOURCE_HASH_ANNOTATION.to_string(), hash);
    Ok(())
}

/// Stored hash annotation, if any.
#[must_use]
pub fn hash_annotation<T: Resource + Serialize>(obj: &T) -> Option<&str> {
    obj.meta()
        .annotations
        .as_ref()
        .and_then(|a| a.get(RESOURCE_HASH_ANNOTATION))
        .map(String::as_str)
}

/// Whether `observed` carries the same hash as `desired`.
///
/// An observed object without a hash annotation never matches.
#[must_use]
pub fn resources_have_same_hash<T: Resource + Serialize>(observed: &T, desired: &T) -> bool {
    match (hash_annotation(observed), hash_annotation(desired)) {
        (Some(observed), Some(desired)) => observed == desired,
        _ => false,
    }
}

fn remove_hash_annotation(meta: &mut ObjectMeta) {
    if let Some(annotations) = meta.annotations.as_mut() {
        annotations.remove(RESOURCE_HASH_ANNOTATION);
        if annotations.is_empty() {
            meta.annotations = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Service, ServiceSpec};
    use std::collections::BTreeMap;

    fn service(name: &str, cluster_ip: &str) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("cass".to_string()),
                labels: Some(BTreeMap::from([("a".to_string(), "1".to_string())])),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                cluster_ip: Some(cluster_ip.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_is_stable_across_restamping() {
        let mut svc = service("svc", "None");
        add_hash_annotation(&mut svc).expect("hash");
        let first = hash_annotation(&svc).map(str::to_string);
        add_hash_annotation(&mut svc).expect("hash");
        assert_eq!(hash_annotation(&svc).map(str::to_string), first);
    }

    #[test]
    fn test_hash_ignores_existing_annotation_but_not_others() {
        let mut plain = service("svc", "None");
        let mut annotated = service("svc", "None");
        annotated.metadata.annotations = Some(BTreeMap::from([(
            "other".to_string(),
            "value".to_string(),
        )]));
        add_hash_annotation(&mut plain).expect("hash");
        add_hash_annotation(&mut annotated).expect("hash");
        assert!(!resources_have_same_hash(&plain, &annotated));
    }

    #[test]
    fn test_content_change_changes_hash() {
        let mut a = service("svc", "None");
        let mut b = service("svc", "10.0.0.1");
        add_hash_annotation(&mut a).expect("hash");
        add_hash_annotation(&mut b).expect("hash");
        assert!(!resources_have_same_hash(&a, &b));
    }

    #[test]
    fn test_missing_observed_annotation_never_matches() {
        let observed = service("svc", "None");
        let mut desired = service("svc", "None");
        add_hash_annotation(&mut desired).expect("hash");
        assert!(!resources_have_same_hash(&observed, &desired));
    }

    #[test]
    fn test_hash_is_base64_sha256() {
        let hash = resource_hash(&service("svc", "None")).expect("hash");
        // 32 bytes encode to 44 base64 characters
        assert_eq!(hash.len(), 44);
        assert!(hash.ends_with('='));
    }

    #[test]
    fn test_canonical_form_sorts_nested_keys() {
        let mut inner = serde_json::Map::new();
        inner.insert("z".to_string(), Value::from(1));
        inner.insert("m".to_string(), Value::from(2));
        let mut outer = serde_json::Map::new();
        outer.insert("spec".to_string(), Value::Array(vec![Value::Object(inner)]));
        outer.insert("kind".to_string(), Value::from("Service"));

        let encoded = serde_json::to_string(&canonicalize(Value::Object(outer))).expect("encode");
        assert_eq!(encoded, r#"{"kind":"Service","spec":[{"m":2,"z":1}]}"#);
    }

    #[test]
    fn test_hash_ignores_key_insertion_order() {
        let mut first = serde_json::Map::new();
        first.insert("b".to_string(), Value::from("2"));
        first.insert("a".to_string(), Value::from("1"));
        let mut second = serde_json::Map::new();
        second.insert("a".to_string(), Value::from("1"));
        second.insert("b".to_string(), Value::from("2"));

        assert_eq!(
            resource_hash(&Value::Object(first)).expect("hash"),
            resource_hash(&Value::Object(second)).expect("hash")
        );
    }
}
