//! HTTP protocol handling subsystem (ServiceA).
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, tracing)
//!     → request.rs (assign / propagate X-Request-ID)
//!     → product handler → client::ProductService
//!     → response.rs (map failures to status codes)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer, InnerState, ServerError};
