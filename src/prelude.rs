//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use dispatch_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - Resource helpers and the `Sample` CRD types
//! - The reconciler capability and its outcome types
//! - The dispatcher, its outcomes and errors
//! - Configuration types

pub use crate::crd::*;

pub use crate::controller::dispatcher::{
    DispatchError, DispatchOutcome, EventDispatcher, GenerationStore, Persistence, SkipReason,
};
pub use crate::controller::facade::{FacadeError, KubeResourceFacade, ResourceFacade};
pub use crate::controller::filter::EventFilters;
pub use crate::controller::outcome::{DeleteOutcome, UpdateOutcome};
pub use crate::controller::rate_limiter::{LinearRateLimiter, RateLimiter};
pub use crate::controller::reconciler::{Context, Reconciler, RetryInfo};
pub use crate::controller::retry::{FibonacciRetry, Retry, RetryExecution};
pub use crate::controller::scope::{Event, ExecutionScope, WatchAction};

pub use crate::config::{
    ConfigError, ControllerConfiguration, ControllerOverrides, ControllerRegistry,
    DependentResourceSpec, OperatorConfig,
};
