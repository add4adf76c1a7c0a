use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{CustomerRecord, Order, OrderStatus, StockRecord};
use crate::CoreResult;

/// Status filter for order listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn status(status: OrderStatus) -> Self {
        Self { status: Some(status) }
    }

    /// Without an explicit status, soft-deleted orders are left out.
    pub fn matches(&self, status: OrderStatus) -> bool {
        match self.status {
            Some(wanted) => wanted == status,
            None => status.is_visible(),
        }
    }
}

/// Durable home of orders, order items and product stock.
///
/// Plain reads each observe one consistent snapshot. Every mutation goes
/// through a [`LedgerTransaction`] obtained from [`LedgerStore::begin`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> CoreResult<Box<dyn LedgerTransaction>>;

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>>;

    /// Newest first.
    async fn list_shop_orders(&self, shop_id: Uuid, filter: OrderFilter) -> CoreResult<Vec<Order>>;

    /// Newest first.
    async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> CoreResult<Vec<Order>>;

    async fn get_customer(&self, id: Uuid) -> CoreResult<Option<CustomerRecord>>;

    async fn get_stock(&self, product_id: Uuid) -> CoreResult<Option<StockRecord>>;
}

/// One atomic unit of work. Rows returned by the `lock_*` methods stay locked
/// until the transaction ends. Dropping without [`commit`](Self::commit) rolls back.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// `None` when the product does not exist in that shop.
    async fn lock_product(
        &mut self,
        product_id: Uuid,
        shop_id: Uuid,
    ) -> CoreResult<Option<StockRecord>>;

    async fn set_stock_quantity(&mut self, product_id: Uuid, quantity: i32) -> CoreResult<()>;

    /// Insert the order row and all of its items.
    async fn insert_order(&mut self, order: &Order) -> CoreResult<()>;

    async fn lock_order(&mut self, id: Uuid) -> CoreResult<Option<Order>>;

    /// Pending orders of a customer, oldest first.
    async fn lock_pending_orders(&mut self, customer_id: Uuid) -> CoreResult<Vec<Order>>;

    /// Persist status, grand total, notes and `updated_at`.
    async fn update_order(&mut self, order: &Order) -> CoreResult<()>;

    /// Remove the order and its items. A store-side restriction is reported as
    /// [`CoreError::DeletionRestricted`](crate::CoreError::DeletionRestricted).
    async fn delete_order(&mut self, id: Uuid) -> CoreResult<()>;

    /// Persist a fallback status chosen by the deletion guard. A rejected status
    /// is reported as [`CoreError::DeletionRestricted`](crate::CoreError::DeletionRestricted).
    async fn reclassify_order(&mut self, order: &Order) -> CoreResult<()>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;
}
