//! Dispatch Controller Library
//!
//! Reconciliation core for Kubernetes operators. Given the watch events of one
//! custom resource, the [`EventDispatcher`](controller::dispatcher::EventDispatcher)
//! decides whether to finalize, skip or reconcile it, invokes the user supplied
//! [`Reconciler`](controller::reconciler::Reconciler) and commits the declared
//! outcome through a [`ResourceFacade`](controller::facade::ResourceFacade).
//!
//! ## Quick Start
//!
//! ```rust
//! use dispatch_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod sample;
