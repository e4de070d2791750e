//! # Configuration
//!
//! - `controller`: Resolved, immutable per-controller policy
//! - `dependent`: Configuration of dependent resources
//! - `registry`: Uniqueness of controller names
//! - `operator`: Process-level settings loaded from environment variables

pub mod controller;
pub mod dependent;
pub mod operator;
pub mod registry;

pub use controller::{ControllerConfiguration, ControllerOverrides, FinalizerOverride};
pub use dependent::{DependentResourceConfigurations, DependentResourceSpec};
pub use operator::OperatorConfig;
pub use registry::ControllerRegistry;

use thiserror::Error;

/// Errors raised while resolving configuration; fatal at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("controller name '{0}' is already registered")]
    DuplicateName(String),
    #[error("invalid controller name '{0}': must be a lowercase RFC 1123 subdomain")]
    InvalidName(String),
    #[error("invalid finalizer '{0}': expected '<domain>/<name>'")]
    InvalidFinalizer(String),
    #[error("dependent resource '{0}' is declared more than once")]
    DuplicateDependent(String),
}
