use merx_core::{CoreError, CoreResult, LedgerTransaction, StockRecord};
use tracing::debug;
use uuid::Uuid;

/// Applies signed stock deltas inside the caller's transaction.
///
/// Not idempotent: every call is one committed change, so callers must never
/// retry a successful adjustment. Positive deltas that undo a sale are issued
/// only by the order status machine.
pub struct InventoryAdjuster;

impl InventoryAdjuster {
    /// Lock the stock row, apply `delta` and persist the result.
    pub async fn adjust(
        tx: &mut dyn LedgerTransaction,
        product_id: Uuid,
        shop_id: Uuid,
        delta: i32,
    ) -> CoreResult<StockRecord> {
        let mut record = tx
            .lock_product(product_id, shop_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        let new_quantity = apply_delta(product_id, record.stock_quantity, delta)?;
        tx.set_stock_quantity(product_id, new_quantity).await?;

        debug!(
            %product_id,
            %shop_id,
            delta,
            from = record.stock_quantity,
            to = new_quantity,
            "stock adjusted"
        );

        record.stock_quantity = new_quantity;
        Ok(record)
    }

    /// Take `quantity` units out of stock for a sale.
    pub async fn decrement(
        tx: &mut dyn LedgerTransaction,
        product_id: Uuid,
        shop_id: Uuid,
        quantity: i32,
    ) -> CoreResult<StockRecord> {
        Self::adjust(tx, product_id, shop_id, -quantity).await
    }

    /// Put `quantity` units back after a sale is reversed.
    pub async fn restore(
        tx: &mut dyn LedgerTransaction,
        product_id: Uuid,
        shop_id: Uuid,
        quantity: i32,
    ) -> CoreResult<StockRecord> {
        Self::adjust(tx, product_id, shop_id, quantity).await
    }
}

/// `current + delta`, refusing to go below zero.
pub fn apply_delta(product_id: Uuid, current: i32, delta: i32) -> CoreResult<i32> {
    match current.checked_add(delta) {
        Some(next) if next >= 0 => Ok(next),
        Some(_) => Err(CoreError::StockUnderflow {
            product_id,
            current,
            delta,
        }),
        None => Err(CoreError::InvalidOrder(format!(
            "Stock quantity overflow for product {}",
            product_id
        ))),
    }
}
