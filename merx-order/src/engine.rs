use chrono::Utc;
use merx_catalog::{PricingConfig, PricingEngine};
use merx_core::{
    CoreError, CoreResult, CustomerRecord, EventPublisher, LedgerEvent, LedgerStore, Order,
    OrderFilter, OrderStatus, StockRecord,
};
use merx_shared::models::events::{
    OrderCreatedEvent, OrderDeletedEvent, OrderStatusChangedEvent, PaymentAppliedEvent,
    SettledOrderLine,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::builder::OrderBuilder;
use crate::deletion::{DeletionGuard, DeletionOutcome, DeletionTier};
use crate::models::{CreateOrderRequest, CustomerSummary, SettlementResult};
use crate::settlement::DebtLedger;
use crate::status::StatusMachine;

/// Entry point for every ledger operation.
///
/// Each mutation runs in exactly one store transaction (deletion runs one per
/// tier) and publishes its event only after commit.
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    events: Arc<dyn EventPublisher>,
    builder: OrderBuilder,
    deletion: DeletionGuard,
}

impl LedgerEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        events: Arc<dyn EventPublisher>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            store,
            events,
            builder: OrderBuilder::new(PricingEngine::new(pricing)),
            deletion: DeletionGuard::default(),
        }
    }

    pub fn with_deletion_tiers(mut self, tiers: Vec<DeletionTier>) -> Self {
        self.deletion = DeletionGuard::new(tiers);
        self
    }

    pub fn currency(&self) -> &str {
        self.builder.pricing().currency()
    }

    pub async fn create_order(&self, request: CreateOrderRequest) -> CoreResult<Order> {
        // customer lookup happens outside the transaction
        let customer = match request.customer_id {
            Some(id) => self.store.get_customer(id).await?,
            None => None,
        };
        OrderBuilder::check_customer(&request, customer.as_ref())?;

        let mut tx = self.store.begin().await?;
        let order = self
            .builder
            .build(tx.as_mut(), &request)
            .await
            .map_err(log_invariant_violation)?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            shop_id = %order.shop_id,
            grand_total = %order.grand_total,
            "order created"
        );

        self.publish(LedgerEvent::OrderCreated(created_event(&order))).await;
        Ok(order)
    }

    pub async fn transition_order(&self, order_id: Uuid, target: OrderStatus) -> CoreResult<Order> {
        let mut tx = self.store.begin().await?;
        let outcome = StatusMachine::transition(tx.as_mut(), order_id, target)
            .await
            .map_err(log_invariant_violation)?;
        tx.commit().await?;

        info!(
            %order_id,
            from = %outcome.from,
            to = %target,
            restocked = outcome.restocked,
            "order status changed"
        );

        self.publish(LedgerEvent::OrderStatusChanged(OrderStatusChangedEvent {
            order_id,
            shop_id: outcome.order.shop_id,
            from_status: outcome.from.to_string(),
            to_status: target.to_string(),
            restocked: outcome.restocked,
            timestamp: Utc::now(),
        }))
        .await;

        Ok(outcome.order)
    }

    pub async fn delete_order(&self, order_id: Uuid) -> CoreResult<DeletionOutcome> {
        let outcome = self.deletion.delete(self.store.as_ref(), order_id).await?;

        self.publish(LedgerEvent::OrderDeleted(OrderDeletedEvent {
            order_id,
            fallback_status: outcome.fallback_status().map(|s| s.to_string()),
            timestamp: Utc::now(),
        }))
        .await;

        Ok(outcome)
    }

    pub async fn get_debt_balance(&self, customer_id: Uuid) -> CoreResult<Decimal> {
        self.customer(customer_id).await?;
        let pending = self
            .store
            .list_customer_orders(customer_id, OrderFilter::status(OrderStatus::Pending))
            .await?;
        Ok(DebtLedger::balance(&pending))
    }

    /// Record money owed as a zero-item pending order.
    pub async fn apply_credit(
        &self,
        customer_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> CoreResult<Order> {
        DebtLedger::ensure_positive(amount)?;
        let customer = self.customer(customer_id).await?;
        let order = DebtLedger::credit_order(&customer, amount, description, self.currency())?;

        let mut tx = self.store.begin().await?;
        tx.insert_order(&order).await?;
        tx.commit().await?;

        info!(%customer_id, order_id = %order.id, amount = %order.grand_total, "credit recorded");

        self.publish(LedgerEvent::OrderCreated(created_event(&order))).await;
        Ok(order)
    }

    pub async fn apply_payment(&self, customer_id: Uuid, amount: Decimal) -> CoreResult<SettlementResult> {
        DebtLedger::ensure_positive(amount)?;
        self.customer(customer_id).await?;

        let mut tx = self.store.begin().await?;
        let result = DebtLedger::settle(tx.as_mut(), customer_id, amount).await?;
        tx.commit().await?;

        info!(
            %customer_id,
            amount = %result.amount,
            applied = %result.applied,
            orders = result.orders.len(),
            remaining_balance = %result.remaining_balance,
            "payment applied"
        );

        self.publish(LedgerEvent::PaymentApplied(PaymentAppliedEvent {
            customer_id,
            amount: result.amount,
            applied: result.applied,
            excess_discarded: result.excess_discarded,
            orders: result
                .orders
                .iter()
                .map(|o| SettledOrderLine {
                    order_id: o.order_id,
                    previous_total: o.previous_total,
                    new_total: o.new_total,
                    fully_settled: o.fully_settled,
                })
                .collect(),
            timestamp: Utc::now(),
        }))
        .await;

        Ok(result)
    }

    pub async fn get_order(&self, order_id: Uuid) -> CoreResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))
    }

    pub async fn list_shop_orders(&self, shop_id: Uuid, filter: OrderFilter) -> CoreResult<Vec<Order>> {
        self.store.list_shop_orders(shop_id, filter).await
    }

    pub async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> CoreResult<Vec<Order>> {
        self.customer(customer_id).await?;
        self.store.list_customer_orders(customer_id, filter).await
    }

    pub async fn customer_summary(&self, customer_id: Uuid) -> CoreResult<CustomerSummary> {
        self.customer(customer_id).await?;
        let orders = self
            .store
            .list_customer_orders(customer_id, OrderFilter::default())
            .await?;
        Ok(DebtLedger::summarize(customer_id, &orders))
    }

    pub async fn get_stock(&self, product_id: Uuid) -> CoreResult<StockRecord> {
        self.store
            .get_stock(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))
    }

    async fn customer(&self, customer_id: Uuid) -> CoreResult<CustomerRecord> {
        self.store
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", customer_id))
    }

    /// Events are best effort: the mutation is already committed.
    async fn publish(&self, event: LedgerEvent) {
        if let Err(e) = self.events.publish(&event).await {
            error!(topic = event.topic(), key = %event.key(), "failed to publish event: {}", e);
        }
    }
}

fn created_event(order: &Order) -> OrderCreatedEvent {
    OrderCreatedEvent {
        order_id: order.id,
        order_number: order.order_number.clone(),
        shop_id: order.shop_id,
        customer_id: order.customer_id,
        grand_total: order.grand_total,
        currency: order.currency.clone(),
        item_count: order.items.len(),
        timestamp: order.created_at,
    }
}

fn log_invariant_violation(e: CoreError) -> CoreError {
    if let CoreError::StockUnderflow { product_id, current, delta } = &e {
        error!(%product_id, current, delta, "stock invariant violated, transaction aborted");
    }
    e
}
