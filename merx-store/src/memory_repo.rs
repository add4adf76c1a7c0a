use async_trait::async_trait;
use merx_core::{
    CoreError, CoreResult, CustomerRecord, LedgerStore, LedgerTransaction, Order, OrderFilter,
    OrderStatus, StockRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, StockRecord>,
    customers: HashMap<Uuid, CustomerRecord>,
    /// Insertion order doubles as the FIFO tie-breaker for equal timestamps.
    orders: Vec<Order>,
    restricted_deletes: HashSet<Uuid>,
    rejected_statuses: HashSet<OrderStatus>,
}

impl MemoryState {
    fn order_index(&self, id: Uuid) -> Option<usize> {
        self.orders.iter().position(|o| o.id == id)
    }

    fn newest_first(&self, mut keep: impl FnMut(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().filter(|o| keep(o)).cloned().collect();
        orders.reverse();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

/// Process-local ledger store.
///
/// A transaction holds the store's single lock from `begin` until it is
/// committed or dropped and works on a private copy of the state, so
/// transactions are fully serialised and an uncommitted one leaves no trace.
/// Restriction knobs emulate database policies that refuse a deletion.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: StockRecord) {
        self.state.lock().await.products.insert(product.product_id, product);
    }

    /// Drop a product from the catalog; historical order items keep their snapshot.
    pub async fn remove_product(&self, product_id: Uuid) {
        self.state.lock().await.products.remove(&product_id);
    }

    pub async fn add_customer(&self, customer: CustomerRecord) {
        self.state.lock().await.customers.insert(customer.id, customer);
    }

    /// Make hard deletes of this order fail as a referential restriction would.
    pub async fn restrict_hard_delete(&self, order_id: Uuid) {
        self.state.lock().await.restricted_deletes.insert(order_id);
    }

    /// Make reclassification into `status` fail as a check constraint would.
    pub async fn reject_status(&self, status: OrderStatus) {
        self.state.lock().await.rejected_statuses.insert(status);
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn item_count(&self) -> usize {
        self.state.lock().await.orders.iter().map(|o| o.items.len()).sum()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> CoreResult<Box<dyn LedgerTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_shop_orders(&self, shop_id: Uuid, filter: OrderFilter) -> CoreResult<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state.newest_first(|o| o.shop_id == shop_id && filter.matches(o.status)))
    }

    async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> CoreResult<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state.newest_first(|o| o.customer_id == Some(customer_id) && filter.matches(o.status)))
    }

    async fn get_customer(&self, id: Uuid) -> CoreResult<Option<CustomerRecord>> {
        Ok(self.state.lock().await.customers.get(&id).cloned())
    }

    async fn get_stock(&self, product_id: Uuid) -> CoreResult<Option<StockRecord>> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn lock_product(
        &mut self,
        product_id: Uuid,
        shop_id: Uuid,
    ) -> CoreResult<Option<StockRecord>> {
        Ok(self
            .working
            .products
            .get(&product_id)
            .filter(|p| p.shop_id == shop_id)
            .cloned())
    }

    async fn set_stock_quantity(&mut self, product_id: Uuid, quantity: i32) -> CoreResult<()> {
        let product = self
            .working
            .products
            .get_mut(&product_id)
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        product.stock_quantity = quantity;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> CoreResult<()> {
        if self
            .working
            .orders
            .iter()
            .any(|o| o.id == order.id || o.order_number == order.order_number)
        {
            return Err(CoreError::Storage(format!(
                "duplicate order {} ({})",
                order.id, order.order_number
            )));
        }
        self.working.orders.push(order.clone());
        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> CoreResult<Option<Order>> {
        Ok(self.working.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn lock_pending_orders(&mut self, customer_id: Uuid) -> CoreResult<Vec<Order>> {
        let mut pending: Vec<Order> = self
            .working
            .orders
            .iter()
            .filter(|o| o.customer_id == Some(customer_id) && o.status == OrderStatus::Pending)
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    async fn update_order(&mut self, order: &Order) -> CoreResult<()> {
        let idx = self
            .working
            .order_index(order.id)
            .ok_or_else(|| CoreError::not_found("Order", order.id))?;
        let existing = &mut self.working.orders[idx];
        existing.status = order.status;
        existing.grand_total = order.grand_total;
        existing.notes = order.notes.clone();
        existing.updated_at = order.updated_at;
        Ok(())
    }

    async fn delete_order(&mut self, id: Uuid) -> CoreResult<()> {
        let idx = self
            .working
            .order_index(id)
            .ok_or_else(|| CoreError::not_found("Order", id))?;
        if self.working.restricted_deletes.contains(&id) {
            return Err(CoreError::DeletionRestricted {
                order_id: id,
                reason: "order is still referenced by other records".to_string(),
            });
        }
        self.working.orders.remove(idx);
        Ok(())
    }

    async fn reclassify_order(&mut self, order: &Order) -> CoreResult<()> {
        if self.working.rejected_statuses.contains(&order.status) {
            return Err(CoreError::DeletionRestricted {
                order_id: order.id,
                reason: format!("status {} rejected by store policy", order.status),
            });
        }
        self.update_order(order).await
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
