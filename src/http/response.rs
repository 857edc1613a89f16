//! Mapping product failures to HTTP responses.
//!
//! - Handled failures (retries exhausted, circuit open) → 503, with
//!   `Retry-After` while the circuit is open
//! - Bad payloads, unexpected statuses and transport errors → 502

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::client::ProductError;
use crate::resilience::FailureKind;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// A `ProductError` rendered for the client.
#[derive(Debug)]
pub struct ApiError(pub ProductError);

impl From<ProductError> for ApiError {
    fn from(e: ProductError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ProductError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProductError::UnexpectedStatus(_)
            | ProductError::Decode(_)
            | ProductError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn kind(&self) -> &'static str {
        match &self.0 {
            ProductError::Unavailable(failure) => failure.kind.as_str(),
            ProductError::UnexpectedStatus(_) => "unexpected-status",
            ProductError::Decode(_) => "decode",
            ProductError::Transport(_) => "transport",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.kind(),
        };
        let mut response = (status, Json(body)).into_response();

        if let ProductError::Unavailable(failure) = &self.0 {
            if failure.kind == FailureKind::CircuitOpen {
                // Whole seconds, at least one.
                let secs = failure
                    .retry_after
                    .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
                    .unwrap_or(1)
                    .max(1);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
        }
        response
    }
}
