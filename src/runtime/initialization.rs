//! # Initialization
//!
//! Process setup shared by every controller: rustls, tracing, metrics, the
//! probe server and the Kubernetes client. [`start_controller`] then wires one
//! reconciler into a running watch loop.

use crate::config::{ControllerConfiguration, ControllerRegistry, OperatorConfig};
use crate::controller::dispatcher::{EventDispatcher, GenerationStore};
use crate::controller::facade::KubeResourceFacade;
use crate::controller::reconciler::Reconciler;
use crate::observability;
use crate::observability::server::{start_server, ServerState};
use crate::runtime::context::ControllerRuntime;
use crate::runtime::watch_loop::run_watch_loop;
use anyhow::{bail, Context, Result};
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{error, info};

/// Components created once per process
pub struct InitializationResult {
    pub client: Client,
    pub server_state: Arc<ServerState>,
}

impl Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the process runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
///
/// # Errors
///
/// Fails when the crypto provider, metrics or Kubernetes client cannot be set up.
pub async fn initialize(operator: &OperatorConfig) -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        bail!("Failed to install rustls crypto provider");
    }

    let default_filter = format!("dispatch_controller={}", operator.log_level.to_lowercase());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!("Starting Dispatch Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let port = operator.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    Ok(InitializationResult {
        client,
        server_state,
    })
}

/// Register `config`, build its dispatcher and run the watch loop until shutdown
///
/// # Errors
///
/// Fails when the controller name is already registered.
pub async fn start_controller<K>(
    init: &InitializationResult,
    reconciler: Arc<dyn Reconciler<K>>,
    config: ControllerConfiguration<K>,
    registry: &mut ControllerRegistry,
    operator: &OperatorConfig,
) -> Result<()>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    registry.register(config.name())?;

    let api: Api<K> = match config.namespaces().iter().collect::<Vec<_>>().as_slice() {
        [namespace] => Api::namespaced(init.client.clone(), namespace),
        _ => Api::all(init.client.clone()),
    };

    info!(
        controller = config.name(),
        resource = config.resource_type_name(),
        finalizer = ?config.finalizer(),
        generation_aware = config.is_generation_aware(),
        namespaces = ?config.namespaces(),
        "Registered controller"
    );

    let facade = Arc::new(KubeResourceFacade::<K>::new(
        init.client.clone(),
        config.field_manager(),
    ));
    let dispatcher = EventDispatcher::new(reconciler, facade, Arc::new(config))
        .with_generation_store(GenerationStore::new(operator.generation_store_capacity));
    let runtime = Arc::new(
        ControllerRuntime::new(dispatcher, operator.conflict_requeue_duration())
            .with_snapshot_capacity(operator.generation_store_capacity),
    );

    run_watch_loop(
        api,
        runtime,
        Arc::clone(&init.server_state),
        operator.clone(),
    )
    .await
}
