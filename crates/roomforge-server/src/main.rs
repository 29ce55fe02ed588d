//! roomforge-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Build the provider adapters (LLM, mesh) and the key rotator.
//! 4. Wire the pipeline orchestrator, job-result store and job queue.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.
//! 6. Drain the job queue before exiting.

mod config;
mod error;
mod llm_client;
mod mesh_client;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use roomforge_core::{
    ApiKeyRotator, CoreConfig, JobResultStore, MeshTaskDriver, PipelineOrchestrator, QueueManager,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::llm_client::HttpLlmClient;
use crate::mesh_client::HttpMeshClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: ROOMFORGE_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "roomforge-server starting");

    if cfg.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY is not set; scenario/script generation will fail");
    }
    if cfg.mesh_api_keys.is_empty() {
        warn!("no MESHY_API_KEY* configured; model generation will fail for every object");
    }

    // ── 3. Provider adapters ────────────────────────────────────────────────
    let llm = Arc::new(HttpLlmClient::new(
        cfg.llm_base_url.clone(),
        cfg.anthropic_api_key.clone().unwrap_or_default(),
    ));
    let mesh_client = Arc::new(HttpMeshClient::new(cfg.mesh_base_url.clone()));
    let key_rotator = Arc::new(ApiKeyRotator::new(cfg.mesh_api_keys.clone()));
    let mesh_driver = Arc::new(MeshTaskDriver::new(mesh_client, key_rotator));

    // ── 4. Pipeline wiring ──────────────────────────────────────────────────
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        llm,
        mesh_driver,
        cfg.prompts.clone(),
        cfg.mesh_worker_concurrency,
    ));
    let store = JobResultStore::new();
    let core_config = CoreConfig {
        queue_capacity: cfg.queue_capacity,
        n_workers: cfg.n_workers,
    };
    let queue = Arc::new(QueueManager::new(core_config, store.clone(), orchestrator));

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        queue: Arc::clone(&queue),
        store,
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ── 6. Drain the job queue ──────────────────────────────────────────────
    drop(state);
    match Arc::try_unwrap(queue) {
        Ok(queue) => queue.shutdown().await,
        Err(_) => warn!("queue still has outstanding references; skipping graceful drain"),
    }

    info!("roomforge-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c   => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
