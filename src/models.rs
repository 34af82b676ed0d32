//! Stored entities and the request records that create or change them.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: Uuid, // UUIDv7 generated in Rust
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Customer {
    pub fn new(name: String, email: String, phone: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            email,
            phone,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl Product {
    pub fn new(name: String, price: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            price,
        }
    }
}

/// Order lifecycle status.
///
/// There is no transition graph: any status may replace any other.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    Processing,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Created,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::ValidationError(format!("Unknown order status: {}", s)))
    }
}

/// One line of an order. Owned by exactly one [`Order`].
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    /// Copy of the product price when the order was created.
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id: product.id,
            quantity,
            unit_price: product.price,
        }
    }

    /// `unit_price × quantity`, exact.
    ///
    /// # Errors
    /// Returns `Error::ValidationError` if the product does not fit a
    /// `Decimal`.
    pub fn line_total(&self) -> Result<Decimal> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| {
                Error::ValidationError(format!(
                    "line total for product {} is out of range",
                    self.product_id
                ))
            })
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// New order in `CREATED` status, stamped with the current time.
    pub fn new(customer_id: Uuid, items: Vec<OrderItem>) -> Self {
        Self {
            id: Uuid::now_v7(),
            customer_id,
            status: OrderStatus::default(),
            created_at: Utc::now(),
            items,
        }
    }

    /// Exact sum of every line total.
    ///
    /// # Errors
    /// Returns `Error::ValidationError` if a line or the sum overflows.
    pub fn total(&self) -> Result<Decimal> {
        sum_line_totals(self.items.iter().map(OrderItem::line_total))
    }
}

/// Add up line totals, failing instead of overflowing.
pub fn sum_line_totals<I>(totals: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Result<Decimal>>,
{
    totals.into_iter().try_fold(Decimal::ZERO, |sum, line| {
        sum.checked_add(line?)
            .ok_or_else(|| Error::ValidationError("order total is out of range".to_string()))
    })
}

// ============================================================================
// Request records
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Decimal,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// Shape checks. Only the HTTP layer runs these; the services trust their
// input.

/// Largest accepted quantity; the stores keep quantities as 32-bit integers.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Decimal places a price may carry (`NUMERIC(19, 2)`).
pub const PRICE_SCALE: u32 = 2;

/// Integer digits a price may carry (`NUMERIC(19, 2)`).
const PRICE_INTEGER_DIGITS: u32 = 17;

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ValidationError(format!("{} must not be blank", field)));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<()> {
    require_non_blank("email", value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(Error::ValidationError(format!(
            "email must be a well-formed address: {}",
            value
        ))),
    }
}

impl CreateCustomerRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)?;
        require_email(&self.email)
    }
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)?;
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(Error::ValidationError(
                "price must be zero or positive".to_string(),
            ));
        }
        if self.price.normalize().scale() > PRICE_SCALE {
            return Err(Error::ValidationError(format!(
                "price must have at most {} decimal places",
                PRICE_SCALE
            )));
        }
        if self.price.trunc() >= Decimal::from(10i64.pow(PRICE_INTEGER_DIGITS)) {
            return Err(Error::ValidationError(format!(
                "price must have at most {} integer digits",
                PRICE_INTEGER_DIGITS
            )));
        }
        Ok(())
    }
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::ValidationError(
                "items must contain at least one line".to_string(),
            ));
        }
        if let Some(line) = self.items.iter().find(|line| line.quantity < 1) {
            return Err(Error::ValidationError(format!(
                "quantity for product {} must be at least 1",
                line.product_id
            )));
        }
        if let Some(line) = self.items.iter().find(|line| line.quantity > MAX_QUANTITY) {
            return Err(Error::ValidationError(format!(
                "quantity for product {} must be at most {}",
                line.product_id, MAX_QUANTITY
            )));
        }
        Ok(())
    }
}
