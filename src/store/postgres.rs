//! PostgreSQL store using SQLx.
//!
//! Schema lives in `migrations/` and is applied by [`PgStore::connect`].

use super::{CustomerStore, OrderStore, ProductStore, DUPLICATE_EMAIL};
use crate::error::{Error, Result};
use crate::models::{Customer, Order, OrderItem, OrderStatus, Product};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = Error;

    fn try_from(row: OrderItemRow) -> Result<Self> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| Error::StoreError(format!("negative quantity on item {}", row.id)))?;
        Ok(OrderItem {
            id: row.id,
            product_id: row.product_id,
            quantity,
            unit_price: row.unit_price,
        })
    }
}

/// SQLx-backed implementation of every store trait.
///
/// `PgPool` is reference-counted internally, so cloning is cheap.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url` and apply pending migrations.
    ///
    /// # Errors
    /// Returns `Error::StoreError` if the database is unreachable or a
    /// migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::StoreError(format!("migration failed: {}", e)))?;

        info!("✓ PgStore connected, migrations applied");
        Ok(Self::new(pool))
    }

    /// Attach items to order rows, preserving row order.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, quantity, unit_price FROM order_items \
             WHERE order_id = ANY($1) ORDER BY order_id, line_no",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items.entry(order_id).or_default().push(row.try_into()?);
        }

        rows.into_iter()
            .map(|row| -> Result<Order> {
                Ok(Order {
                    id: row.id,
                    customer_id: row.customer_id,
                    status: row.status.parse()?,
                    created_at: row.created_at,
                    items: items.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

impl CustomerStore for PgStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query("INSERT INTO customers (id, name, email, phone) VALUES ($1, $2, $3, $4)")
            .bind(customer.id)
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| match Error::from(e) {
                Error::Conflict(_) => Error::Conflict(DUPLICATE_EMAIL.to_string()),
                other => other,
            })
    }

    async fn customer_by_id(&self, id: Uuid) -> Result<Option<Customer>> {
        Ok(sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, phone FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn all_customers(&self) -> Result<Vec<Customer>> {
        Ok(sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, phone FROM customers ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

impl ProductStore for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query("INSERT INTO products (id, name, price) VALUES ($1, $2, $3)")
            .bind(product.id)
            .bind(&product.name)
            .bind(product.price)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(
            sqlx::query_as::<_, Product>("SELECT id, name, price FROM products WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        Ok(
            sqlx::query_as::<_, Product>("SELECT id, name, price FROM products ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?,
        )
    }
}

impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO orders (id, customer_id, status, created_at) VALUES ($1, $2, $3, $4)")
            .bind(order.id)
            .bind(order.customer_id)
            .bind(order.status.as_str())
            .bind(order.created_at)
            .execute(&mut *tx)
            .await?;

        for (line_no, item) in order.items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| Error::StoreError(format!("quantity {} out of range", item.quantity)))?;
            let line_no = i32::try_from(line_no)
                .map_err(|_| Error::StoreError("too many order lines".to_string()))?;

            sqlx::query(
                "INSERT INTO order_items (id, order_id, line_no, product_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(order.id)
            .bind(line_no)
            .bind(item.product_id)
            .bind(quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping `tx` on any early return above rolls back.
        tx.commit().await?;
        debug!("✓ PgStore inserted order {} ({} items)", order.id, order.items.len());
        Ok(())
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, status, created_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, status, created_at FROM orders ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, status, created_at FROM orders \
             WHERE status = $1 ORDER BY created_at, id",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
