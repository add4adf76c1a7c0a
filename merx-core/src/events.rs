use async_trait::async_trait;
use merx_shared::models::events::{
    OrderCreatedEvent, OrderDeletedEvent, OrderStatusChangedEvent, PaymentAppliedEvent,
    ORDERS_TOPIC, PAYMENTS_TOPIC,
};
use serde::Serialize;

use crate::CoreResult;

/// Integration events emitted after a mutation commits
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    OrderCreated(OrderCreatedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    OrderDeleted(OrderDeletedEvent),
    PaymentApplied(PaymentAppliedEvent),
}

impl LedgerEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            LedgerEvent::PaymentApplied(_) => PAYMENTS_TOPIC,
            _ => ORDERS_TOPIC,
        }
    }

    /// Partition key: the order id, or the customer id for payments.
    pub fn key(&self) -> String {
        match self {
            LedgerEvent::OrderCreated(e) => e.order_id.to_string(),
            LedgerEvent::OrderStatusChanged(e) => e.order_id.to_string(),
            LedgerEvent::OrderDeleted(e) => e.order_id.to_string(),
            LedgerEvent::PaymentApplied(e) => e.customer_id.to_string(),
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &LedgerEvent) -> CoreResult<()>;
}

/// Publisher for deployments without a broker
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &LedgerEvent) -> CoreResult<()> {
        tracing::info!(topic = event.topic(), key = %event.key(), "ledger event: {:?}", event);
        Ok(())
    }
}
