//! Product catalog: the shared payload and the downstream service.

pub mod product;
pub mod server;

pub use product::Product;
pub use server::{catalog_router, CatalogOptions};
