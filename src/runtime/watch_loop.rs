//! # Watch Loop
//!
//! Runs a `kube_runtime` controller for one resource kind and feeds each
//! reconcile request through the dispatcher.
//!
//! `kube_runtime` never runs two reconciles for the same object at once, which
//! is what the dispatcher requires of its caller.

use crate::config::OperatorConfig;
use crate::controller::dispatcher::{DispatchError, DispatchOutcome};
use crate::controller::scope::{ExecutionScope, WatchAction};
use crate::crd::{generation, ResourceKey};
use crate::observability;
use crate::observability::server::ServerState;
use crate::runtime::context::ControllerRuntime;
use crate::runtime::error_policy::{handle_dispatch_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube::Resource;
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Run the controller watch loop until shutdown
///
/// Restarts the watch stream when it ends or fails, and stops once SIGTERM or
/// SIGINT requests shutdown. Readiness is reported only while a stream runs.
///
/// # Errors
///
/// Currently never fails; the signature leaves room for fatal setup errors.
pub async fn run_watch_loop<K>(
    api: Api<K>,
    runtime: Arc<ControllerRuntime<K>>,
    server_state: Arc<ServerState>,
    operator: OperatorConfig,
) -> Result<(), anyhow::Error>
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
{
    let controller_name = runtime.controller_name().to_string();
    info!(controller = %controller_name, "Starting controller watch loop...");

    let backoff_duration_ms = Arc::new(AtomicU64::new(operator.conflict_requeue_ms));

    tokio::spawn(wait_for_shutdown_signal(Arc::clone(&server_state)));

    loop {
        if server_state.is_shutting_down() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let mut watch_config = watcher::Config::default().any_semantic();
        if let Some(selector) = runtime.configuration().label_selector() {
            watch_config = watch_config.labels(selector);
        }

        let backoff = Arc::clone(&backoff_duration_ms);
        let operator_for_filter = operator.clone();
        let controller_future = Controller::new(api.clone(), watch_config)
            .with_config(
                controller::Config::default().concurrency(operator.max_concurrent_reconciliations),
            )
            .shutdown_on_signal()
            .run(
                reconcile_resource,
                |obj, error, ctx| handle_dispatch_error(&obj, error, &ctx),
                Arc::clone(&runtime),
            )
            .filter_map(move |x| {
                let backoff = Arc::clone(&backoff);
                let operator = operator_for_filter.clone();
                async move {
                    match &x {
                        Ok(_) => {
                            backoff.store(operator.conflict_requeue_ms, Ordering::Relaxed);
                            debug!("watch.event.success");
                            Some(x)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &error_string,
                                &backoff,
                                operator.watch_restart_delay_duration(),
                            )
                            .await
                            .map(|()| x)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()));

        server_state.set_ready(true);
        controller_future
            .instrument(info_span!("controller.watch", controller = %controller_name))
            .await;
        server_state.set_ready(false);

        if server_state.is_shutting_down() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = operator.watch_restart_delay_after_end_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!(controller = %controller_name, "Controller stopped gracefully");
    Ok(())
}

/// Request shutdown on the first SIGTERM or SIGINT
///
/// `kube_runtime` stops its own stream on the same signals; the flag keeps
/// the loop above from starting a new one.
async fn wait_for_shutdown_signal(server_state: Arc<ServerState>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGINT handler");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown..."),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            return;
        }
        info!("Received ctrl-c, initiating graceful shutdown...");
    }

    server_state.request_shutdown();
}

/// Reconcile function handed to `kube_runtime`
///
/// Applies namespace scoping and rate limiting, builds the execution scope,
/// dispatches it and turns the outcome into a requeue decision.
///
/// # Errors
///
/// Returns the dispatcher's error unchanged; [`handle_dispatch_error`] decides
/// when to retry.
pub async fn reconcile_resource<K>(
    obj: Arc<K>,
    ctx: Arc<ControllerRuntime<K>>,
) -> Result<Action, DispatchError>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    let key = ResourceKey::from_resource(obj.as_ref());
    let config = Arc::clone(ctx.configuration());
    let span = info_span!(
        "controller.watch.reconcile",
        controller = config.name(),
        resource = %key,
        resource.version = ?obj.meta().resource_version,
        resource.generation = ?generation(obj.as_ref())
    );

    async move {
        if !config.is_watching(obj.meta().namespace.as_deref()) {
            debug!("Resource outside the watched namespaces, ignoring");
            return Ok(Action::await_change());
        }

        if let Some(delay) = config.rate_limiter().acquire(&key) {
            debug!(delay_ms = delay.as_millis(), "Rate limited, requeueing");
            observability::increment_requeues(config.name(), "rate_limited");
            return Ok(Action::requeue(delay));
        }

        let previous = ctx.previous(&key);
        let action = if previous.is_some() {
            WatchAction::Modified
        } else {
            WatchAction::Added
        };
        let scope = ExecutionScope::single(action, obj.as_ref().clone())
            .with_previous(previous)
            .with_retry_info(ctx.retry_info(&key));

        debug!(action = %action, "watch.event.received");
        let start = Instant::now();
        let result = ctx.dispatcher().handle_execution(scope).await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(outcome) => {
                observability::record_dispatch(config.name(), &outcome, elapsed);
                ctx.reset_retry(&key);
                debug!(outcome = %outcome, "watch.event.dispatched");

                match outcome {
                    DispatchOutcome::Finalized { .. } | DispatchOutcome::DeletionNotOwned => {
                        ctx.forget(&key);
                        Ok(Action::await_change())
                    }
                    DispatchOutcome::Skipped(_) | DispatchOutcome::Reconciled(_) => {
                        ctx.remember(key, obj.as_ref().clone());
                        Ok(next_action(config.max_reconciliation_interval(), config.name()))
                    }
                }
            }
            Err(e) => {
                observability::record_dispatch_error(config.name(), &e, elapsed);
                error!(error = %e, kind = e.kind(), "watch.event.dispatch_failed");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

fn next_action(max_interval: Option<Duration>, controller: &str) -> Action {
    match max_interval {
        Some(interval) => {
            observability::increment_requeues(controller, "max_interval");
            Action::requeue(interval)
        }
        None => Action::await_change(),
    }
}
