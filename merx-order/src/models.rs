use merx_core::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One requested cart line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Input of order creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub shop_id: Uuid,
    /// `None` for walk-in sales
    pub customer_id: Option<Uuid>,
    pub items: Vec<CartLine>,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// What a payment did to one pending order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettledOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub previous_total: Decimal,
    pub new_total: Decimal,
    pub amount_applied: Decimal,
    pub status: OrderStatus,
    pub fully_settled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResult {
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub applied: Decimal,
    /// Overpayment is dropped, not carried forward.
    pub excess_discarded: Decimal,
    pub orders: Vec<SettledOrder>,
    pub remaining_balance: Decimal,
}

/// Read-time projection over a customer's orders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerSummary {
    pub customer_id: Uuid,
    pub debt_balance: Decimal,
    pub pending_orders: usize,
    pub total_spent: Decimal,
    pub order_count: usize,
}
