//! Trait implemented by every projection the cache layer stores.

use crate::key::Namespace;
use serde::{Deserialize, Serialize};

/// A value that can be cached as a single entity and as part of a list.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use delivery_kit::{CacheEntity, key::Namespace};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct Warehouse {
///     pub id: String,
///     pub name: String,
/// }
///
/// impl CacheEntity for Warehouse {
///     fn namespace() -> Namespace {
///         Namespace::new("warehouses")
///     }
///
///     fn list_namespace() -> Namespace {
///         Namespace::new("warehouses:list")
///     }
/// }
///
/// assert_eq!(Warehouse::write_namespaces()[1].as_str(), "warehouses:list");
/// ```
pub trait CacheEntity: Send + Sync + Serialize + for<'de> Deserialize<'de> + Clone {
    /// Namespace for single-entity entries.
    fn namespace() -> Namespace;

    /// Namespace for the list entry of this entity type.
    fn list_namespace() -> Namespace;

    /// Both namespaces, in the order a write evicts them.
    fn write_namespaces() -> [Namespace; 2] {
        [Self::namespace(), Self::list_namespace()]
    }
}
