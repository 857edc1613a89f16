use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::{BreakerSnapshot, PolicyChoice};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub policy: PolicyChoice,
    pub downstream: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        policy: inner.products.pipeline().choice(),
        downstream: inner.config.downstream.base_url.clone(),
    })
}

pub async fn get_breaker(State(state): State<AppState>) -> Result<Json<BreakerSnapshot>, StatusCode> {
    let inner = state.inner.load();
    let breaker = inner.products.pipeline().breaker().ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(breaker.snapshot()))
}

pub async fn isolate_breaker(State(state): State<AppState>) -> Result<Json<BreakerSnapshot>, StatusCode> {
    let inner = state.inner.load();
    let breaker = inner.products.pipeline().breaker().ok_or(StatusCode::NOT_FOUND)?;
    breaker.isolate();
    tracing::warn!(breaker = %breaker.name(), "Circuit isolated by operator");
    Ok(Json(breaker.snapshot()))
}

pub async fn reset_breaker(State(state): State<AppState>) -> Result<Json<BreakerSnapshot>, StatusCode> {
    let inner = state.inner.load();
    let breaker = inner.products.pipeline().breaker().ok_or(StatusCode::NOT_FOUND)?;
    breaker.reset();
    tracing::info!(breaker = %breaker.name(), "Circuit reset by operator");
    Ok(Json(breaker.snapshot()))
}
