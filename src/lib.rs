//! # delivery-kit
//!
//! Customers, products and orders behind a read-through cache.
//!
//! ## Features
//!
//! - **Order aggregation:** orders resolve every customer/product reference
//!   before writing, freeze unit prices, persist order + items atomically and
//!   compose responses with exact decimal totals
//! - **Read-through cache:** customer and product projections are cached per
//!   entity and as lists, with a TTL, and writes evict whole namespaces
//! - **Pluggable stores:** in-memory maps or PostgreSQL via SQLx (`postgres`)
//! - **HTTP surface:** actix-web routes under `/api/v1` (`http`, default)
//!
//! ## Quick Start
//!
//! ```ignore
//! use delivery_kit::{
//!     backend::InMemoryBackend, store::InMemoryStore, CacheLayer,
//!     CustomerService, OrderProcessor, ProductService,
//! };
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let cache = CacheLayer::new(InMemoryBackend::new());
//!
//! let customers = CustomerService::new(store.clone(), cache.clone());
//! let products = ProductService::new(store.clone(), cache.clone());
//! let orders = OrderProcessor::new(store, customers.clone(), products.clone());
//!
//! let alice = customers.create(request).await?;
//! let view = orders.create(order_request).await?;
//! println!("total: {}", view.total);
//! ```
//!
//! ## Cache consistency
//!
//! Writers never push values into the cache; they evict the namespaces of
//! the entity type they changed and the next reader recomputes from the
//! store. Order views are composed on every request and never cached.

#[macro_use]
extern crate log;

pub mod backend;
pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod key;
pub mod models;
pub mod observability;
pub mod serialization;
pub mod services;
pub mod store;
pub mod views;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use cache::CacheLayer;
pub use config::AppConfig;
pub use entity::CacheEntity;
pub use error::{Error, ErrorKind, Result};
pub use services::{CustomerService, OrderProcessor, ProductService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
