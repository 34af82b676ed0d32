//! In-memory store backed by lock-protected maps.
//!
//! Used by the binary when no database is configured, and by tests.

use super::{CustomerStore, OrderStore, ProductStore, DUPLICATE_EMAIL};
use crate::error::{Error, Result};
use crate::models::{Customer, Order, OrderStatus, Product};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    customers: RwLock<HashMap<Uuid, Customer>>,
    products: RwLock<HashMap<Uuid, Product>>,
    // An order owns its items, so one map entry is one atomic write.
    orders: RwLock<HashMap<Uuid, Order>>,
}

/// Thread-safe in-memory implementation of every store trait.
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_orders<'a>(orders: impl Iterator<Item = &'a Order>) -> Vec<Order> {
    let mut orders: Vec<Order> = orders.cloned().collect();
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    orders
}

impl CustomerStore for InMemoryStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        let mut customers = self.tables.customers.write().await;
        if customers.values().any(|c| c.email == customer.email) {
            return Err(Error::Conflict(DUPLICATE_EMAIL.to_string()));
        }
        customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn customer_by_id(&self, id: Uuid) -> Result<Option<Customer>> {
        Ok(self.tables.customers.read().await.get(&id).cloned())
    }

    async fn all_customers(&self) -> Result<Vec<Customer>> {
        let mut customers: Vec<Customer> =
            self.tables.customers.read().await.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(customers)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self
            .tables
            .customers
            .read()
            .await
            .values()
            .any(|c| c.email == email))
    }
}

impl ProductStore for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.tables
            .products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.products.read().await.get(&id).cloned())
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> =
            self.tables.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }
}

impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.tables
            .orders
            .write()
            .await
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables.orders.read().await.get(&id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        Ok(sorted_orders(self.tables.orders.read().await.values()))
    }

    async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        Ok(sorted_orders(
            self.tables
                .orders
                .read()
                .await
                .values()
                .filter(|o| o.status == status),
        ))
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<bool> {
        match self.tables.orders.write().await.get_mut(&id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderItem;
    use rust_decimal::Decimal;

    fn customer(name: &str, email: &str) -> Customer {
        Customer::new(name.to_string(), email.to_string(), None)
    }

    #[tokio::test]
    async fn test_customer_insert_and_lookup() {
        let store = InMemoryStore::new();
        let alice = customer("Alice", "alice@example.com");

        store.insert_customer(&alice).await.expect("insert");

        let found = store.customer_by_id(alice.id).await.expect("lookup");
        assert_eq!(found, Some(alice));
        assert!(store.email_exists("alice@example.com").await.expect("exists"));
        assert!(!store.email_exists("bob@example.com").await.expect("exists"));
        assert!(store
            .customer_by_id(Uuid::now_v7())
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict_and_not_stored() {
        let store = InMemoryStore::new();
        store
            .insert_customer(&customer("Alice", "alice@example.com"))
            .await
            .expect("insert");

        let result = store
            .insert_customer(&customer("Alias", "alice@example.com"))
            .await;

        assert!(matches!(result, Err(Error::Conflict(ref m)) if m == DUPLICATE_EMAIL));
        assert_eq!(store.all_customers().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts_admit_one() {
        let store = InMemoryStore::new();
        let mut handles = vec![];

        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_customer(&customer(&format!("C{}", i), "same@example.com"))
                    .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.expect("task").is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_lists_are_ordered_by_name() {
        let store = InMemoryStore::new();
        for name in ["Carol", "Alice", "Bob"] {
            store
                .insert_product(&Product::new(name.to_string(), Decimal::ONE))
                .await
                .expect("insert");
        }

        let names: Vec<String> = store
            .all_products()
            .await
            .expect("list")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[tokio::test]
    async fn test_order_round_trip_and_status_filter() {
        let store = InMemoryStore::new();
        let product = Product::new("Widget".to_string(), Decimal::new(2999, 2));
        let order = Order::new(Uuid::now_v7(), vec![OrderItem::new(&product, 2)]);

        store.insert_order(&order).await.expect("insert");

        let loaded = store
            .order_by_id(order.id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(loaded.items.len(), 1);

        assert!(store
            .update_order_status(order.id, OrderStatus::Shipped)
            .await
            .expect("update"));
        assert!(store
            .orders_by_status(OrderStatus::Created)
            .await
            .expect("filter")
            .is_empty());
        assert_eq!(
            store
                .orders_by_status(OrderStatus::Shipped)
                .await
                .expect("filter")
                .len(),
            1
        );
        assert!(!store
            .update_order_status(Uuid::now_v7(), OrderStatus::Shipped)
            .await
            .expect("update"));
    }
}
