//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the deployment orchestrator from configuration
//! - Create Axum Router with the API handlers
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Serve until the shutdown signal fires

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use std::time::Duration;
use arc_swap::ArcSwapOption;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::setup_api_router;
use crate::config::watcher::LiveStatus;
use crate::config::DeployerConfig;
use crate::deploy::{DeploymentOrchestrator, LiveConfigStore, ProcessValidator};
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DeploymentOrchestrator>,
    pub live_status: LiveStatus,
}

impl AppState {
    pub fn new(orchestrator: Arc<DeploymentOrchestrator>) -> Self {
        Self {
            orchestrator,
            live_status: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Wire the live store, external validator and orchestrator from settings.
    pub fn from_config(config: &DeployerConfig) -> Self {
        let store = LiveConfigStore::from_config(&config.store);
        let validator = Arc::new(ProcessValidator::from_config(&config.validator));

        tracing::info!(
            config_dir = %store.config_dir().display(),
            validator = %validator.program().display(),
            "Deployment orchestrator configured"
        );

        let mut orchestrator = DeploymentOrchestrator::new(store, validator);
        if let Some(root) = &config.store.staging_root {
            orchestrator = orchestrator.with_staging_root(root.clone());
        }
        Self::new(Arc::new(orchestrator))
    }
}

/// HTTP server for the deployment API.
pub struct HttpServer {
    router: Router,
    config: DeployerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and state.
    pub fn new(config: DeployerConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &DeployerConfig, state: AppState) -> Router {
        setup_api_router(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }
}
