//! # Initialization
//!
//! Process startup: rustls provider, tracing, metrics, the probe server,
//! the Kubernetes client and the base AWS configuration.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::server::{start_server, ServerState};
use crate::crd::ProviderConfig;
use crate::observability;
use crate::provider::aws::{auth, AwsSession};
use crate::runtime::watch_loop::Runtime;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Everything `main` needs after startup
#[derive(Debug)]
pub struct InitializationResult {
    /// Handles the controllers are built from
    pub runtime: Runtime,
    /// Probe server state
    pub server_state: Arc<ServerState>,
}

/// Default log filter for the given verbosity
pub fn default_log_filter(debug: bool) -> &'static str {
    if debug {
        "provider_aws=debug"
    } else {
        "provider_aws=info"
    }
}

/// Initialize the provider runtime
///
/// `RUST_LOG` wins over `debug` when set.
pub async fn initialize(
    config: ControllerConfig,
    server: ServerConfig,
    debug: bool,
) -> Result<InitializationResult> {
    // Must happen before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|installed| {
            anyhow::anyhow!("a rustls crypto provider is already installed: {installed:?}")
        })?;

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(debug).into()),
        )
        .try_init()
    {
        warn!("Tracing subscriber init returned error: {}", e);
    }

    info!("Starting AWS provider v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Controller settings: poll={}s, max reconciles={}, aws timeout={}s",
        config.poll_interval.as_secs(),
        config.max_reconcile_rate,
        config.aws_call_timeout.as_secs()
    );

    server.validate().map_err(anyhow::Error::msg)?;
    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let addr = server.bind_addr();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(addr, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server, &server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    check_provider_configs(&client).await;

    let base = auth::base_config(config.aws_call_timeout, &config.default_region).await;
    let session = Arc::new(AwsSession::new(client.clone(), base));

    info!("Provider initialized, starting controllers...");
    Ok(InitializationResult {
        runtime: Runtime {
            client,
            session,
            config,
        },
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server: &ServerConfig,
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = server.startup_timeout;
    let poll_interval = server.readiness_poll;
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }
        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Log which ProviderConfigs exist; a missing CRD is reported but not fatal
async fn check_provider_configs(client: &Client) {
    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.provider_configs",
        operation = "check_provider_configs"
    );
    let _guard = span.enter();

    let configs: Api<ProviderConfig> = Api::all(client.clone());
    match configs.list(&ListParams::default()).await {
        Ok(list) => {
            let mut names: Vec<String> = list
                .items
                .iter()
                .filter_map(|c| c.metadata.name.clone())
                .collect();
            names.sort();
            if names.is_empty() {
                warn!("No ProviderConfig found; managed resources will fail to connect until one exists");
            } else {
                info!("Found {} ProviderConfigs: {}", names.len(), names.join(", "));
            }
        }
        Err(e) => {
            error!("ProviderConfig CRD is not queryable: {:?}. Is the CRD installed?", e);
            error!("Installation: crdgen | kubectl apply -f -");
            warn!(error = %e, "Continuing despite ProviderConfig check failure");
        }
    }
}
