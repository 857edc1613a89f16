//! HTTP server setup (ServiceA).
//!
//! # Responsibilities
//! - Create Axum Router with the product, health and admin handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Own the product service (and its breaker) for the process lifetime
//! - Apply reloaded configuration without dropping in-flight requests

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request},
    routing::get,
    Json, Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::catalog::Product;
use crate::client::{HttpTransport, ProductService, TransportError};
use crate::config::ServiceConfig;
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::resilience::{LoggingObserver, Pipeline};

/// Name of the single downstream dependency, used in logs and metrics.
pub const DEPENDENCY_NAME: &str = "service-b";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build downstream client: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything a request needs, swapped as a whole on config reload.
pub struct InnerState {
    pub config: ServiceConfig,
    pub products: Arc<ProductService>,
}

impl InnerState {
    pub fn build(config: ServiceConfig) -> Result<Self, ServerError> {
        let transport = Arc::new(HttpTransport::new(&config.downstream)?);
        let observer = Arc::new(LoggingObserver::new(DEPENDENCY_NAME));
        let pipeline = Pipeline::build(DEPENDENCY_NAME, &config.resilience, transport, observer);

        Ok(Self {
            config,
            products: Arc::new(ProductService::new(pipeline)),
        })
    }

    /// Derive the next state. The pipeline, and with it the breaker, is
    /// only rebuilt when the outbound settings changed.
    fn reconfigure(&self, config: ServiceConfig) -> Result<Self, ServerError> {
        if config.resilience == self.config.resilience && config.downstream == self.config.downstream {
            return Ok(Self {
                config,
                products: self.products.clone(),
            });
        }

        tracing::warn!("Outbound settings changed, rebuilding pipeline (breaker state is reset)");
        Self::build(config)
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
}

impl AppState {
    pub fn new(inner: InnerState) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(inner)),
        }
    }

    /// Swap in a reloaded configuration.
    pub fn apply_config(&self, config: ServiceConfig) {
        let current = self.inner.load_full();

        if config.listener != current.config.listener
            || config.timeouts != current.config.timeouts
            || config.admin.enabled != current.config.admin.enabled
        {
            tracing::warn!("Listener, timeout and admin toggles only take effect after a restart");
        }

        match current.reconfigure(config) {
            Ok(next) => {
                self.inner.store(Arc::new(next));
                tracing::info!("Configuration reloaded");
            }
            Err(e) => tracing::error!(error = %e, "Failed to apply configuration, keeping current"),
        }
    }
}

/// HTTP server for ServiceA.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let router_config = config.clone();
        let state = AppState::new(InnerState::build(config)?);
        let router = Self::build_router(&router_config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/api/products/{id}", get(get_product))
            .route("/health", get(health));
        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = request_id(request.headers()).unwrap_or("unknown"),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The fully layered router, for serving elsewhere or driving in tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires, applying config updates.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => state.apply_config(config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<Product>, ApiError> {
    let start = Instant::now();
    let inner = state.inner.load_full();

    match inner.products.fetch_product(id, request_id(&headers)).await {
        Ok(product) => {
            metrics::record_request(200, start);
            Ok(Json(product))
        }
        Err(e) => {
            let err = ApiError::from(e);
            metrics::record_request(err.status().as_u16(), start);
            Err(err)
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
