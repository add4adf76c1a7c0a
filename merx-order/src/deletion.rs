use merx_core::{CoreError, CoreResult, LedgerStore, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::status::{restocks, StatusMachine};

pub const DELETED_MARKER: &str = "[DELETED]";

/// One way of making an order go away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTier {
    /// Remove the order and its items.
    HardDelete,
    /// Keep the row, move it to the given status and mark its notes.
    Reclassify(OrderStatus),
}

/// Hard delete first, then soft delete, then cancellation as the last resort.
pub fn default_tiers() -> Vec<DeletionTier> {
    vec![
        DeletionTier::HardDelete,
        DeletionTier::Reclassify(OrderStatus::Deleted),
        DeletionTier::Reclassify(OrderStatus::Cancelled),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeletionOutcome {
    HardDeleted { order_id: Uuid },
    Reclassified { status: OrderStatus, order: Order },
}

impl DeletionOutcome {
    pub fn order_id(&self) -> Uuid {
        match self {
            DeletionOutcome::HardDeleted { order_id } => *order_id,
            DeletionOutcome::Reclassified { order, .. } => order.id,
        }
    }

    pub fn fallback_status(&self) -> Option<OrderStatus> {
        match self {
            DeletionOutcome::HardDeleted { .. } => None,
            DeletionOutcome::Reclassified { status, .. } => Some(*status),
        }
    }
}

/// Removes orders while making sure a record never silently vanishes: when
/// the store refuses one tier the next is tried, each in a fresh transaction.
pub struct DeletionGuard {
    tiers: Vec<DeletionTier>,
}

impl Default for DeletionGuard {
    fn default() -> Self {
        Self::new(default_tiers())
    }
}

impl DeletionGuard {
    pub fn new(tiers: Vec<DeletionTier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[DeletionTier] {
        &self.tiers
    }

    pub async fn delete(&self, store: &dyn LedgerStore, order_id: Uuid) -> CoreResult<DeletionOutcome> {
        let mut last_reason = String::from("no deletion tier configured");

        for tier in &self.tiers {
            match Self::attempt(store, order_id, *tier).await {
                Ok(outcome) => {
                    info!(%order_id, ?tier, "order deleted");
                    return Ok(outcome);
                }
                Err(CoreError::DeletionRestricted { reason, .. }) => {
                    warn!(%order_id, ?tier, %reason, "deletion tier rejected, trying next");
                    last_reason = reason;
                }
                Err(e) => return Err(e),
            }
        }

        Err(CoreError::DeletionRestricted {
            order_id,
            reason: last_reason,
        })
    }

    /// Runs one tier in its own transaction; dropping it on error rolls back.
    async fn attempt(
        store: &dyn LedgerStore,
        order_id: Uuid,
        tier: DeletionTier,
    ) -> CoreResult<DeletionOutcome> {
        let mut tx = store.begin().await?;
        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        let outcome = match tier {
            DeletionTier::HardDelete => {
                tx.delete_order(order_id).await?;
                DeletionOutcome::HardDeleted { order_id }
            }
            DeletionTier::Reclassify(status) => {
                // a cancelled or refunded order holds no stock
                if restocks(status) && !restocks(order.status) && !order.items.is_empty() {
                    StatusMachine::restore_items(tx.as_mut(), &order).await?;
                }
                order.update_status(status);
                order.append_note(DELETED_MARKER);
                tx.reclassify_order(&order).await?;
                DeletionOutcome::Reclassified { status, order }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}
