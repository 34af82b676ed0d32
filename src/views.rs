//! External projections returned to callers.
//!
//! Customer and product views are what the cache stores. Order views are
//! assembled on every request and never cached.

use crate::entity::CacheEntity;
use crate::key::Namespace;
use crate::models::{Customer, OrderStatus, Product};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CustomerView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        CustomerView {
            id: customer.id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
        }
    }
}

impl CacheEntity for CustomerView {
    fn namespace() -> Namespace {
        Namespace::CUSTOMERS
    }

    fn list_namespace() -> Namespace {
        Namespace::CUSTOMERS_LIST
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    // Decimal's default Deserialize needs a self-describing format; cache
    // bytes are postcard.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        ProductView {
            id: product.id,
            name: product.name,
            price: product.price,
        }
    }
}

impl CacheEntity for ProductView {
    fn namespace() -> Namespace {
        Namespace::PRODUCTS
    }

    fn list_namespace() -> Namespace {
        Namespace::PRODUCTS_LIST
    }
}

/// One composed order line.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub line_total: Decimal,
}

/// A fully composed order: customer projection, lines and total.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub customer: CustomerView,
    pub items: Vec<OrderLineView>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}
