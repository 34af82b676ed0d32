//! Persistent stores: the system of record behind the cache.
//!
//! The services only talk to these traits, so any storage engine can sit
//! behind them. Two implementations ship with the crate:
//! - [`InMemoryStore`] - lock-protected maps, the default
//! - `PgStore` - SQLx + PostgreSQL (feature `postgres`)
//!
//! Method names are distinct across the three traits so one type can
//! implement all of them without call-site ambiguity.
//!
//! # Errors
//!
//! Implementations return `Err` for:
//! - store unavailability and query failures (`Error::StoreError`)
//! - a duplicate customer email on insert (`Error::Conflict`)
//!
//! An absent row is `Ok(None)`, never an error.

use crate::error::Result;
use crate::models::{Customer, Order, OrderStatus, Product};
use uuid::Uuid;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Message carried by the `Conflict` raised for a duplicate email.
pub const DUPLICATE_EMAIL: &str = "Email already registered";

#[allow(async_fn_in_trait)]
pub trait CustomerStore: Send + Sync {
    /// Persist a new customer.
    ///
    /// # Errors
    /// Returns `Error::Conflict` if the email is already registered. The
    /// check and the insert are atomic.
    async fn insert_customer(&self, customer: &Customer) -> Result<()>;

    async fn customer_by_id(&self, id: Uuid) -> Result<Option<Customer>>;

    /// Every customer, ordered by name then id.
    async fn all_customers(&self) -> Result<Vec<Customer>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;
}

#[allow(async_fn_in_trait)]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<()>;

    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>>;

    /// Every product, ordered by name then id.
    async fn all_products(&self) -> Result<Vec<Product>>;
}

#[allow(async_fn_in_trait)]
pub trait OrderStore: Send + Sync {
    /// Persist an order together with all of its items.
    ///
    /// All-or-nothing: a reader never observes the order without its items.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>>;

    /// Every order, ordered by creation time then id.
    async fn all_orders(&self) -> Result<Vec<Order>>;

    /// Orders whose status equals `status`, same ordering as `all_orders`.
    async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    /// Overwrite an order's status.
    ///
    /// # Returns
    /// - `Ok(true)` - the order existed and was updated
    /// - `Ok(false)` - no order with that id
    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<bool>;
}
