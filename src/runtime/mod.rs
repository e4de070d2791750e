//! # Runtime
//!
//! Drives an [`EventDispatcher`](crate::controller::dispatcher::EventDispatcher)
//! from a `kube_runtime` controller.
//!
//! - `context`: Per-controller state shared across reconcile calls
//! - `watch_loop`: Watch stream setup and the reconcile function
//! - `error_policy`: Requeue decisions for failed dispatches and watch errors
//! - `initialization`: Process setup (TLS, tracing, metrics, server, client)

pub mod context;
pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use context::ControllerRuntime;
pub use watch_loop::{reconcile_resource, run_watch_loop};
