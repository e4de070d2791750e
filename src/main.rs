//! # Dispatch Controller
//!
//! Runs the sample reconciler for `Sample` resources through the event
//! dispatcher.
//!
//! Settings come from environment variables (see
//! [`OperatorConfig`](dispatch_controller::config::OperatorConfig)); command
//! line flags override the controller level ones.

use clap::Parser;
use dispatch_controller::config::{
    ControllerConfiguration, ControllerOverrides, ControllerRegistry, OperatorConfig,
};
use dispatch_controller::controller::reconciler::Reconciler;
use dispatch_controller::crd::Sample;
use dispatch_controller::runtime::initialization::{initialize, start_controller};
use dispatch_controller::sample::SampleReconciler;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "dispatch-controller", version, about = "Reconciles Sample resources")]
struct Args {
    /// Controller name; derived from the reconciler when unset
    #[arg(long, env = "CONTROLLER_NAME")]
    name: Option<String>,

    /// Finalizer to manage; an empty value disables finalizer management
    #[arg(long, env = "CONTROLLER_FINALIZER")]
    finalizer: Option<String>,

    /// Reconcile every event, even when the generation did not change
    #[arg(long, env = "DISABLE_GENERATION_AWARE")]
    disable_generation_aware: bool,

    /// Namespaces to watch; all namespaces when none are given
    #[arg(long = "namespace", env = "WATCH_NAMESPACES", value_delimiter = ',')]
    namespaces: Vec<String>,

    /// Only reconcile resources matching this label selector
    #[arg(long, env = "LABEL_SELECTOR")]
    label_selector: Option<String>,

    /// Re-reconcile at least this often (seconds); 0 disables it
    #[arg(long, env = "MAX_RECONCILIATION_INTERVAL_SECS", default_value_t = 0)]
    max_reconciliation_interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let operator = OperatorConfig::from_env();
    let init = initialize(&operator).await?;

    let mut overrides = ControllerOverrides::<Sample>::new()
        .generation_aware(!args.disable_generation_aware)
        .namespaces(args.namespaces)
        .max_reconciliation_interval(Duration::from_secs(args.max_reconciliation_interval_secs));
    if let Some(name) = args.name {
        overrides = overrides.name(name);
    }
    if let Some(finalizer) = args.finalizer {
        overrides = overrides.finalizer(finalizer);
    }
    if let Some(selector) = args.label_selector {
        overrides = overrides.label_selector(selector);
    }

    let config = ControllerConfiguration::resolve_for::<SampleReconciler>(overrides)?;
    let reconciler: Arc<dyn Reconciler<Sample>> =
        Arc::new(SampleReconciler::new(config.finalizer()));

    let mut registry = ControllerRegistry::new();
    start_controller(&init, reconciler, config, &mut registry, &operator).await
}
