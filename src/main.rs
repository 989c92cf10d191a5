// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use fleetop::{
    constants::{
        DEFAULT_FLEET_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS, READY_HEALTHY, REQUEUE_ERROR_SECS,
        REQUEUE_NOT_READY_SECS, REQUEUE_READY_SECS,
    },
    context::Context,
    crd::RemoteCluster,
    events::SyntheticEvents,
    fleet::FleetClient,
    metrics,
    reconcilers::reconcile_remotecluster,
};
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Fleet cluster operator for Kubernetes
#[derive(Parser, Debug)]
#[command(name = "fleetop", version, about)]
struct Args {
    /// Base URL of the fleet-management service API
    #[arg(long, env = "FLEET_API_URL")]
    api_url: String,

    /// Bearer token for the fleet-management service
    #[arg(long, env = "FLEET_API_TOKEN")]
    api_token: Option<String>,

    /// Request timeout for fleet API calls, in seconds
    #[arg(long, env = "FLEET_API_TIMEOUT_SECS", default_value_t = DEFAULT_FLEET_TIMEOUT_SECS)]
    api_timeout_secs: u64,

    /// Interval between status poller ticks, in seconds
    #[arg(long, env = "FLEET_POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval_secs: u64,

    /// Listen address for the metrics and health endpoints
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("fleetop-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging with custom format
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug fleetop
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json fleetop
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Fleet Cluster Operator");
    debug!(api_url = %args.api_url, poll_interval_secs = args.poll_interval_secs, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let fleet = FleetClient::new(
        &args.api_url,
        args.api_token.clone(),
        Duration::from_secs(args.api_timeout_secs),
    )?;

    let ctx = Arc::new(Context::new(
        client.clone(),
        fleet,
        Duration::from_secs(args.poll_interval_secs),
    ));

    let (events, synthetic_stream) = SyntheticEvents::channel();

    // Controllers should never exit - if one fails, we log it and exit the main process
    tokio::select! {
        result = run_remotecluster_controller(client, ctx, synthetic_stream) => {
            error!("CRITICAL: RemoteCluster controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("RemoteCluster controller exited unexpectedly without error")
        }
        result = run_metrics_server(&args.metrics_addr, events) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

/// Run the `RemoteCluster` controller.
///
/// The synthetic event stream is merged into the controller's trigger
/// stream, so injected events share the same queue and dedup as watch
/// events.
async fn run_remotecluster_controller(
    client: Client,
    ctx: Arc<Context>,
    synthetic_stream: impl futures::Stream<Item = kube::runtime::reflector::ObjectRef<RemoteCluster>>
        + Send
        + 'static,
) -> Result<()> {
    info!("Starting RemoteCluster controller");

    let api = Api::<RemoteCluster>::all(client);

    Controller::new(api, Config::default())
        .reconcile_on(synthetic_stream)
        .run(reconcile_remotecluster_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `RemoteCluster`
async fn reconcile_remotecluster_wrapper(
    cluster: Arc<RemoteCluster>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    debug!(
        cluster_name = %cluster.name_any(),
        namespace = ?cluster.namespace(),
        "Reconcile wrapper called for RemoteCluster"
    );

    let start = Instant::now();
    match reconcile_remotecluster(ctx, (*cluster).clone()).await {
        Ok(()) => {
            info!(
                "Successfully reconciled RemoteCluster: {}",
                cluster.name_any()
            );
            metrics::record_reconciliation_success(start.elapsed());

            // Check if the remote cluster is healthy to determine requeue interval
            let is_ready = cluster
                .status
                .as_ref()
                .is_some_and(|status| status.cluster_status.ready == READY_HEALTHY);

            if is_ready {
                // Cluster is healthy, check less frequently (5 minutes)
                debug!("Cluster healthy, requeueing in 5 minutes");
                Ok(Action::requeue(Duration::from_secs(REQUEUE_READY_SECS)))
            } else {
                // Cluster is not healthy yet, check more frequently (30 seconds)
                // to pick up provisioning progress
                debug!("Cluster not healthy, requeueing in 30 seconds");
                Ok(Action::requeue(Duration::from_secs(REQUEUE_NOT_READY_SECS)))
            }
        }
        Err(e) => {
            error!("Failed to reconcile RemoteCluster: {}", e);
            metrics::record_reconciliation_error(start.elapsed());
            Err(e.into())
        }
    }
}

/// Error policy for the `RemoteCluster` controller
fn error_policy(
    _resource: Arc<impl std::fmt::Debug>,
    _err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS))
}

/// Serve `/metrics` and `/healthz`.
///
/// The `SyntheticEvents` handle is kept alive here so the bridge's sender
/// side outlives the controller; operational tooling that injects events
/// plugs in at this layer.
async fn run_metrics_server(addr: &str, _events: SyntheticEvents) -> Result<()> {
    info!(addr, "Starting metrics server");

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn metrics_handler() -> Result<String, StatusCode> {
    metrics::gather_metrics().map_err(|e| {
        error!("Failed to gather metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
