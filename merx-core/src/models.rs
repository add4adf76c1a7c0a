use chrono::{DateTime, Utc};
use merx_shared::{line_total, Masked};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    /// Soft-deleted; hidden from listings but still readable by id.
    Deleted,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
        OrderStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Refunded
                | OrderStatus::Deleted
        )
    }

    /// Statuses that listings show unless asked otherwise.
    pub fn is_visible(&self) -> bool {
        *self != OrderStatus::Deleted
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Copy of the catalog entry at the time of sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
}

/// A sale (or a bare debt entry when `items` is empty)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Update order status
    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    /// Sum of line totals; equals `subtotal` for orders built from a cart.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(|item| item.total_price).sum()
    }

    /// Append an audit marker to the free-text notes.
    pub fn append_note(&mut self, marker: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, marker),
            _ => marker.to_string(),
        });
        self.updated_at = Utc::now();
    }

    pub fn is_debt_entry(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// One line of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub product_snapshot: ProductSnapshot,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn new(order_id: Uuid, product: &StockRecord, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id: product.product_id,
            quantity,
            unit_price: product.unit_price,
            total_price: line_total(product.unit_price, quantity),
            product_snapshot: product.snapshot(),
            created_at: Utc::now(),
        }
    }
}

/// Catalog product row as seen by the ledger: only `stock_quantity` is written here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub stock_quantity: i32,
    pub is_active: bool,
}

impl StockRecord {
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            description: self.description.clone(),
            unit_price: self.unit_price,
        }
    }
}

/// Customer as published by the shop directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub email: Option<Masked<String>>,
    pub phone: Option<Masked<String>>,
}
