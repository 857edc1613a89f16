//! Outbound client subsystem.
//!
//! # Data Flow
//! ```text
//! ProductService::fetch_product(id)
//!     → resilience::Pipeline (policy around the call)
//!     → transport.rs (one GET against ServiceB)
//!     → decode Product or map the failure
//! ```

pub mod products;
pub mod transport;

pub use products::{ProductError, ProductService};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
