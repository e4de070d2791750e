//! # Resource Model
//!
//! Bookkeeping metadata of a custom resource instance.
//!
//! Any `kube::Resource` is a valid custom resource for the dispatcher. The
//! dispatcher only touches `ObjectMeta`: finalizers, generation, deletion
//! timestamp and resource version (the conflict token).

use kube::Resource;
use std::fmt;

/// Stable identity of one resource instance across its lifetime
///
/// The uid is part of the key, so a resource deleted and re-created under the
/// same name is a different identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: Option<String>,
    pub name: String,
    pub uid: Option<String>,
}

impl ResourceKey {
    #[must_use]
    pub fn new(namespace: Option<&str>, name: &str, uid: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(ToString::to_string),
            name: name.to_string(),
            uid: uid.map(ToString::to_string),
        }
    }

    /// Build the key of a resource snapshot
    #[must_use]
    pub fn from_resource<K: Resource>(resource: &K) -> Self {
        let meta = resource.meta();
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
            uid: meta.uid.clone(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Whether the API server has set a deletion timestamp on the resource
pub fn is_marked_for_deletion<K: Resource>(resource: &K) -> bool {
    resource.meta().deletion_timestamp.is_some()
}

/// Generation assigned by the API server, if any
pub fn generation<K: Resource>(resource: &K) -> Option<i64> {
    resource.meta().generation
}

pub fn has_finalizer<K: Resource>(resource: &K, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == finalizer))
}

/// Append `finalizer` unless it is already present
///
/// Existing order is preserved. Returns `true` when the finalizer list changed.
pub fn add_finalizer<K: Resource>(resource: &mut K, finalizer: &str) -> bool {
    if has_finalizer(resource, finalizer) {
        return false;
    }
    resource
        .meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    true
}

/// Remove `finalizer`, leaving every other finalizer untouched
///
/// Removing an absent finalizer is a no-op. Returns `true` when the finalizer
/// list changed.
pub fn remove_finalizer<K: Resource>(resource: &mut K, finalizer: &str) -> bool {
    let Some(finalizers) = resource.meta_mut().finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|f| f != finalizer);
    before != finalizers.len()
}

/// Type name of a resource kind: `<plural>.<group>`, or just the plural for core types
pub fn resource_type_name<K: Resource<DynamicType = ()>>() -> String {
    let plural = K::plural(&());
    let group = K::group(&());
    if group.is_empty() {
        plural.into_owned()
    } else {
        format!("{plural}.{group}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Sample, SampleSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn sample(finalizers: Option<Vec<&str>>) -> Sample {
        Sample {
            metadata: ObjectMeta {
                name: Some("test".to_string()),
                namespace: Some("default".to_string()),
                finalizers: finalizers.map(|f| f.into_iter().map(String::from).collect()),
                ..Default::default()
            },
            spec: SampleSpec {
                value: "v".to_string(),
            },
            status: None,
        }
    }

    #[test]
    fn test_add_finalizer_appends_once() {
        let mut resource = sample(Some(vec!["other.io/keep"]));
        assert!(add_finalizer(&mut resource, "samples.dispatch.example.io/finalizer"));
        assert!(!add_finalizer(&mut resource, "samples.dispatch.example.io/finalizer"));
        assert_eq!(
            resource.metadata.finalizers,
            Some(vec![
                "other.io/keep".to_string(),
                "samples.dispatch.example.io/finalizer".to_string()
            ])
        );
    }

    #[test]
    fn test_add_finalizer_creates_list() {
        let mut resource = sample(None);
        assert!(add_finalizer(&mut resource, "f.io/f"));
        assert!(has_finalizer(&resource, "f.io/f"));
    }

    #[test]
    fn test_remove_finalizer_is_idempotent() {
        let mut resource = sample(Some(vec!["a.io/a", "f.io/f", "b.io/b"]));
        assert!(remove_finalizer(&mut resource, "f.io/f"));
        assert!(!remove_finalizer(&mut resource, "f.io/f"));
        assert_eq!(
            resource.metadata.finalizers,
            Some(vec!["a.io/a".to_string(), "b.io/b".to_string()])
        );

        let mut empty = sample(None);
        assert!(!remove_finalizer(&mut empty, "f.io/f"));
    }

    #[test]
    fn test_resource_key_display() {
        let key = ResourceKey::new(Some("ns"), "name", Some("uid-1"));
        assert_eq!(key.to_string(), "ns/name");
        assert_eq!(ResourceKey::new(None, "cluster-wide", None).to_string(), "cluster-wide");
    }

    #[test]
    fn test_resource_key_distinguishes_recreated_objects() {
        let first = ResourceKey::new(Some("ns"), "name", Some("uid-1"));
        let second = ResourceKey::new(Some("ns"), "name", Some("uid-2"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_resource_type_name() {
        assert_eq!(resource_type_name::<Sample>(), "samples.dispatch.example.io");
        assert_eq!(
            resource_type_name::<k8s_openapi::api::core::v1::ConfigMap>(),
            "configmaps"
        );
    }
}
