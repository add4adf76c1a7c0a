use merx_catalog::InventoryAdjuster;
use merx_core::{CoreError, CoreResult, LedgerTransaction, Order, OrderStatus};
use tracing::warn;
use uuid::Uuid;

/// Who is driving a transition. Settlement may close a pending order
/// directly; everyone else walks the fulfilment graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    Request,
    Settlement,
}

/// Statuses reachable from `from`
pub fn allowed_targets(from: OrderStatus, cause: TransitionCause) -> &'static [OrderStatus] {
    use OrderStatus::*;

    match (from, cause) {
        (Pending, TransitionCause::Request) => &[Confirmed, Cancelled, Refunded],
        (Pending, TransitionCause::Settlement) => &[Delivered],
        (Confirmed, TransitionCause::Request) => &[Processing, Cancelled, Refunded],
        (Processing, TransitionCause::Request) => &[Shipped, Cancelled, Refunded],
        (Shipped, TransitionCause::Request) => &[Delivered, Refunded],
        _ => &[],
    }
}

pub fn can_transition(from: OrderStatus, to: OrderStatus, cause: TransitionCause) -> bool {
    allowed_targets(from, cause).contains(&to)
}

/// Entering these statuses gives the sold units back to stock.
pub(crate) fn restocks(target: OrderStatus) -> bool {
    matches!(target, OrderStatus::Cancelled | OrderStatus::Refunded)
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub order: Order,
    pub from: OrderStatus,
    pub restocked: bool,
}

/// Validates and applies status changes and their inventory side effects.
pub struct StatusMachine;

impl StatusMachine {
    /// Lock the order and move it to `target`.
    pub async fn transition(
        tx: &mut dyn LedgerTransaction,
        order_id: Uuid,
        target: OrderStatus,
    ) -> CoreResult<TransitionOutcome> {
        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        let from = order.status;
        let restocked = Self::apply(tx, &mut order, target, TransitionCause::Request).await?;

        Ok(TransitionOutcome {
            order,
            from,
            restocked,
        })
    }

    /// Apply a transition to an order already locked by this transaction.
    /// Returns whether stock was restored.
    pub async fn apply(
        tx: &mut dyn LedgerTransaction,
        order: &mut Order,
        target: OrderStatus,
        cause: TransitionCause,
    ) -> CoreResult<bool> {
        if !can_transition(order.status, target, cause) {
            return Err(CoreError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        let restocked = restocks(target) && !order.items.is_empty();
        if restocked {
            Self::restore_items(tx, order).await?;
        }

        order.update_status(target);
        tx.update_order(order).await?;

        Ok(restocked)
    }

    /// Give every item of `order` back to stock; products gone from the catalog are skipped.
    pub(crate) async fn restore_items(
        tx: &mut dyn LedgerTransaction,
        order: &Order,
    ) -> CoreResult<()> {
        for item in &order.items {
            match InventoryAdjuster::restore(tx, item.product_id, order.shop_id, item.quantity).await {
                Ok(_) => {}
                Err(CoreError::NotFound { entity: "Product", .. }) => {
                    warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        "product no longer in catalog, skipping restock"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_happy_path() {
        let path = [Pending, Confirmed, Processing, Shipped, Delivered];
        for pair in path.windows(2) {
            assert!(can_transition(pair[0], pair[1], TransitionCause::Request), "{:?}", pair);
        }
    }

    #[test]
    fn test_cannot_skip_steps() {
        assert!(!can_transition(Pending, Shipped, TransitionCause::Request));
        assert!(!can_transition(Pending, Processing, TransitionCause::Request));
        assert!(!can_transition(Confirmed, Delivered, TransitionCause::Request));
        assert!(!can_transition(Pending, Delivered, TransitionCause::Request));
    }

    #[test]
    fn test_cancellation_window() {
        assert!(can_transition(Pending, Cancelled, TransitionCause::Request));
        assert!(can_transition(Confirmed, Cancelled, TransitionCause::Request));
        assert!(can_transition(Processing, Cancelled, TransitionCause::Request));
        assert!(!can_transition(Shipped, Cancelled, TransitionCause::Request));
    }

    #[test]
    fn test_refund_from_every_active_state() {
        for from in [Pending, Confirmed, Processing, Shipped] {
            assert!(can_transition(from, Refunded, TransitionCause::Request));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!can_transition(from, to, TransitionCause::Request));
                assert!(!can_transition(from, to, TransitionCause::Settlement));
            }
        }
    }

    #[test]
    fn test_settlement_only_closes_pending() {
        assert!(can_transition(Pending, Delivered, TransitionCause::Settlement));
        assert!(!can_transition(Confirmed, Delivered, TransitionCause::Settlement));
        assert!(!can_transition(Pending, Cancelled, TransitionCause::Settlement));
    }

    #[test]
    fn test_nothing_enters_deleted() {
        for from in OrderStatus::ALL {
            assert!(!can_transition(from, Deleted, TransitionCause::Request));
        }
    }
}
