use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub const ORDERS_TOPIC: &str = "merx.orders";
pub const PAYMENTS_TOPIC: &str = "merx.payments";

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub shop_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub grand_total: Decimal,
    pub currency: String,
    pub item_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub shop_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub restocked: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderDeletedEvent {
    pub order_id: Uuid,
    /// `None` when the row was hard-deleted, otherwise the fallback status it now carries.
    pub fallback_status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SettledOrderLine {
    pub order_id: Uuid,
    pub previous_total: Decimal,
    pub new_total: Decimal,
    pub fully_settled: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentAppliedEvent {
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub applied: Decimal,
    pub excess_discarded: Decimal,
    pub orders: Vec<SettledOrderLine>,
    pub timestamp: DateTime<Utc>,
}
