pub mod events;
pub mod models;
pub mod repository;

use rust_decimal::Decimal;
use uuid::Uuid;

pub use models::{
    CustomerRecord, Order, OrderItem, OrderStatus, ProductSnapshot, StockRecord, UnknownStatus,
};
pub use events::{EventPublisher, LedgerEvent, LogPublisher};
pub use repository::{LedgerStore, LedgerTransaction, OrderFilter};

/// Every failure the ledger engine can report.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Insufficient stock for {product_name} ({product_id}): requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        product_name: String,
        requested: i32,
        available: i32,
    },

    /// Guarded by the stock check in the order builder; seeing it means an invariant broke.
    #[error("Stock underflow for product {product_id}: current {current}, delta {delta}")]
    StockUnderflow {
        product_id: Uuid,
        current: i32,
        delta: i32,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("Deletion of order {order_id} restricted: {reason}")]
    DeletionRestricted {
        order_id: Uuid,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidOrder(_) => "invalid_order",
            CoreError::InvalidAmount(_) => "invalid_amount",
            CoreError::InsufficientStock { .. } => "insufficient_stock",
            CoreError::StockUnderflow { .. } => "stock_underflow",
            CoreError::InvalidTransition { .. } => "invalid_transition",
            CoreError::NotFound { .. } => "not_found",
            CoreError::DeletionRestricted { .. } => "deletion_restricted",
            CoreError::Storage(_) => "storage",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
