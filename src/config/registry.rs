//! Process-wide registry of controller names.

use crate::config::ConfigError;
use std::collections::BTreeSet;

/// Tracks the names of registered controllers so no two share one
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    names: BTreeSet<String>,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for a controller
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateName`] when `name` is already registered.
    pub fn register(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.names.insert(name.to_string()) {
            Ok(())
        } else {
            Err(ConfigError::DuplicateName(name.to_string()))
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
