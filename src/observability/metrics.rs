//! # Metrics
//!
//! Prometheus metrics for monitoring dispatch.
//!
//! ## Metrics Exposed
//!
//! - `dispatch_controller_dispatches_total` - Dispatch calls by controller and outcome
//! - `dispatch_controller_reconciliations_total` - Reconciler invocations that completed
//! - `dispatch_controller_finalizations_total` - Finalize invocations that completed
//! - `dispatch_controller_generation_skips_total` - Dispatches skipped for an unchanged generation
//! - `dispatch_controller_filtered_dispatches_total` - Dispatches suppressed by event filters
//! - `dispatch_controller_dispatch_errors_total` - Failed dispatches by kind (`conflict`, `logic`, `api`)
//! - `dispatch_controller_requeues_total` - Requeues by reason
//! - `dispatch_controller_dispatch_duration_seconds` - Duration of dispatch calls

use crate::controller::dispatcher::{DispatchError, DispatchOutcome, SkipReason};
use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static DISPATCHES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dispatch_controller_dispatches_total",
            "Total number of dispatch calls by controller and outcome",
        ),
        &["controller", "outcome"],
    )
    .expect("Failed to create DISPATCHES_TOTAL metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dispatch_controller_reconciliations_total",
            "Total number of completed reconciliations",
        ),
        &["controller"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static FINALIZATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dispatch_controller_finalizations_total",
            "Total number of completed finalizations",
        ),
        &["controller"],
    )
    .expect("Failed to create FINALIZATIONS_TOTAL metric - this should never happen")
});

static GENERATION_SKIPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dispatch_controller_generation_skips_total",
            "Total number of dispatches skipped because the generation was already processed",
        ),
        &["controller"],
    )
    .expect("Failed to create GENERATION_SKIPS_TOTAL metric - this should never happen")
});

static FILTERED_DISPATCHES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dispatch_controller_filtered_dispatches_total",
            "Total number of dispatches suppressed by event filters",
        ),
        &["controller"],
    )
    .expect("Failed to create FILTERED_DISPATCHES_TOTAL metric - this should never happen")
});

static DISPATCH_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dispatch_controller_dispatch_errors_total",
            "Total number of failed dispatches by error kind",
        ),
        &["controller", "kind"],
    )
    .expect("Failed to create DISPATCH_ERRORS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dispatch_controller_requeues_total",
            "Total number of requeues by reason",
        ),
        &["controller", "reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static DISPATCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "dispatch_controller_dispatch_duration_seconds",
            "Duration of dispatch calls in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["controller"],
    )
    .expect("Failed to create DISPATCH_DURATION metric - this should never happen")
});

/// Register all metrics with the registry served on `/metrics`
///
/// # Errors
///
/// Fails when called twice, as the collectors are already registered.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(DISPATCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FINALIZATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GENERATION_SKIPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FILTERED_DISPATCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DISPATCH_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DISPATCH_DURATION.clone()))?;
    Ok(())
}

/// Record a successful dispatch and what it did
pub fn record_dispatch(controller: &str, outcome: &DispatchOutcome, duration: f64) {
    DISPATCHES_TOTAL
        .with_label_values(&[controller, outcome.as_str()])
        .inc();
    DISPATCH_DURATION
        .with_label_values(&[controller])
        .observe(duration);

    match outcome {
        DispatchOutcome::Reconciled(_) => RECONCILIATIONS_TOTAL.with_label_values(&[controller]).inc(),
        DispatchOutcome::Finalized { .. } => FINALIZATIONS_TOTAL.with_label_values(&[controller]).inc(),
        DispatchOutcome::Skipped(SkipReason::GenerationUnchanged) => {
            GENERATION_SKIPS_TOTAL.with_label_values(&[controller]).inc();
        }
        DispatchOutcome::Skipped(SkipReason::Filtered) => {
            FILTERED_DISPATCHES_TOTAL.with_label_values(&[controller]).inc();
        }
        DispatchOutcome::DeletionNotOwned => {}
    }
}

pub fn record_dispatch_error(controller: &str, error: &DispatchError, duration: f64) {
    DISPATCHES_TOTAL
        .with_label_values(&[controller, "error"])
        .inc();
    DISPATCH_ERRORS_TOTAL
        .with_label_values(&[controller, error.kind()])
        .inc();
    DISPATCH_DURATION
        .with_label_values(&[controller])
        .observe(duration);
}

pub fn increment_requeues(controller: &str, reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[controller, reason]).inc();
}
