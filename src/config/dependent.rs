//! # Dependent Resource Configuration
//!
//! Associates each declared dependent resource with its configuration object.

use crate::config::ConfigError;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Declaration of a dependent resource
///
/// Identity is the name: two specs with the same name are the same dependent.
#[derive(Debug, Clone)]
pub struct DependentResourceSpec {
    pub name: String,
    /// Kind of the dependent, e.g. `apps/v1/Deployment`
    pub resource_type: String,
}

impl DependentResourceSpec {
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
        }
    }
}

impl PartialEq for DependentResourceSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DependentResourceSpec {}

impl Hash for DependentResourceSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Resolved dependent configuration, keyed by spec
#[derive(Debug, Clone, Default)]
pub struct DependentResourceConfigurations {
    specs: Vec<DependentResourceSpec>,
    configurations: HashMap<DependentResourceSpec, Value>,
}

impl DependentResourceConfigurations {
    /// Build from declarations in order; a missing configuration becomes an empty object
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateDependent`] when a spec is declared twice.
    pub fn resolve(
        declared: Vec<(DependentResourceSpec, Option<Value>)>,
    ) -> Result<Self, ConfigError> {
        let mut resolved = Self::default();
        for (spec, configuration) in declared {
            if resolved.configurations.contains_key(&spec) {
                return Err(ConfigError::DuplicateDependent(spec.name));
            }
            let configuration =
                configuration.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            resolved.specs.push(spec.clone());
            resolved.configurations.insert(spec, configuration);
        }
        Ok(resolved)
    }

    /// Declared specs in declaration order
    pub fn specs(&self) -> &[DependentResourceSpec] {
        &self.specs
    }

    pub fn configuration_for(&self, spec: &DependentResourceSpec) -> Option<&Value> {
        self.configurations.get(spec)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
