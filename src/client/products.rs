//! Product fetch operation.
//!
//! Runs the resilience pipeline for one product id and turns the outcome
//! into a `Product` or a `ProductError`.

use reqwest::StatusCode;
use thiserror::Error;

use crate::catalog::Product;
use crate::client::transport::TransportError;
use crate::resilience::{HandledFailure, Outcome, Pipeline};

#[derive(Debug, Error)]
pub enum ProductError {
    /// Retries exhausted, circuit open, or the last attempt failed.
    #[error("dependency unavailable ({0})")]
    Unavailable(HandledFailure),

    /// The downstream answered with a status the policies ignore.
    #[error("unexpected downstream status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("failed to decode product payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct ProductService {
    pipeline: Pipeline,
}

impl ProductService {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub async fn fetch_product(&self, id: i32, request_id: Option<&str>) -> Result<Product, ProductError> {
        let path = id.to_string();
        match self.pipeline.execute(&path, request_id).await {
            Outcome::Success(response) => {
                if !response.status.is_success() {
                    return Err(ProductError::UnexpectedStatus(response.status));
                }
                let product = serde_json::from_str(&response.body)?;
                Ok(product)
            }
            Outcome::Handled(failure) => {
                tracing::warn!(id, reason = %failure, "Product fetch failed");
                Err(ProductError::Unavailable(failure))
            }
            Outcome::Unhandled(err) => Err(ProductError::Transport(err)),
        }
    }
}
