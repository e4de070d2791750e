//! # Controller
//!
//! Core controller modules.
//!
//! - `outcome`: Results a reconciler declares for update and delete handling
//! - `reconciler`: The pluggable reconciliation capability and its context
//! - `facade`: Persistence boundary towards the Kubernetes API
//! - `scope`: Batches of watch events handed to one dispatch call
//! - `filter`: Predicates that may suppress a dispatch
//! - `retry`: Default retry policy (Fibonacci backoff)
//! - `rate_limiter`: Default per-resource rate limiter
//! - `dispatcher`: The event dispatch state machine

pub mod dispatcher;
pub mod facade;
pub mod filter;
pub mod outcome;
pub mod rate_limiter;
pub mod reconciler;
pub mod retry;
pub mod scope;
