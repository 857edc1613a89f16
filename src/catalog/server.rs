//! ServiceB: the downstream product endpoint.
//!
//! Answers every id with the sample product. An optional failure ratio
//! makes it answer with an error status instead, which is handy for
//! watching ServiceA's breaker trip.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rand::Rng;
use tower_http::trace::TraceLayer;

use crate::catalog::product::Product;

/// Failure injection settings.
#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions {
    /// Fraction of requests answered with `failure_status`, in [0, 1].
    pub failure_ratio: f64,
    pub failure_status: StatusCode,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            failure_ratio: 0.0,
            failure_status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub fn catalog_router(options: CatalogOptions) -> Router {
    Router::new()
        .route("/api/products/{id}", get(get_product))
        .with_state(Arc::new(options))
        .layer(TraceLayer::new_for_http())
}

async fn get_product(State(options): State<Arc<CatalogOptions>>, Path(id): Path<i32>) -> Response {
    if options.failure_ratio > 0.0 && rand::thread_rng().gen_bool(options.failure_ratio.min(1.0)) {
        tracing::warn!(id, status = %options.failure_status, "Injecting failure");
        return (options.failure_status, "Injected failure").into_response();
    }

    tracing::debug!(id, "Serving product");
    Json(Product::sample(id)).into_response()
}
