//! Product gateway: ServiceA fetching products from ServiceB through a
//! retry / circuit breaker policy engine.

pub mod admin;
pub mod catalog;
pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use catalog::Product;
pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
