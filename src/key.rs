//! Cache namespaces and key building.

use std::fmt;

/// A logical group of cache keys that is invalidated as a unit.
///
/// Single-entity projections and list results live in separate namespaces
/// so a write can drop both without touching other entity types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Namespace(&'static str);

impl Namespace {
    /// Single customer projections, keyed by customer id.
    pub const CUSTOMERS: Namespace = Namespace("customers");
    /// The all-customers list, stored under [`LIST_KEY`].
    pub const CUSTOMERS_LIST: Namespace = Namespace("customers:list");
    /// Single product projections, keyed by product id.
    pub const PRODUCTS: Namespace = Namespace("products");
    /// The all-products list, stored under [`LIST_KEY`].
    pub const PRODUCTS_LIST: Namespace = Namespace("products:list");

    pub const fn new(name: &'static str) -> Self {
        Namespace(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Constant key used for list results inside their own namespace.
pub const LIST_KEY: &str = "all";

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build the full backend key: `"{namespace}:{key}"`.
    pub fn build(namespace: Namespace, key: &dyn fmt::Display) -> String {
        format!("{}:{}", namespace, key)
    }
}
