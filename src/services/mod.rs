//! Service layer: business operations over the stores and the cache.
//!
//! - [`CustomerService`] / [`ProductService`] - read-through cached façades
//! - [`OrderProcessor`] - order aggregation, built on the two above

pub mod customer_service;
pub mod order_processor;
pub mod product_service;

pub use customer_service::CustomerService;
pub use order_processor::OrderProcessor;
pub use product_service::ProductService;
