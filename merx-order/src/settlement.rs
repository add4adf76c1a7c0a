use chrono::Utc;
use merx_core::{CoreError, CoreResult, CustomerRecord, LedgerTransaction, Order, OrderStatus};
use merx_shared::round_money;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::builder::generate_order_number;
use crate::models::{CustomerSummary, SettledOrder, SettlementResult};
use crate::status::{StatusMachine, TransitionCause};

pub const CREDIT_PAYMENT_METHOD: &str = "credit";

/// Customer debt kept as pending orders; payments settle them oldest first.
pub struct DebtLedger;

impl DebtLedger {
    /// Sum of grand totals over orders that are exactly `pending`.
    pub fn balance(orders: &[Order]) -> Decimal {
        orders
            .iter()
            .filter(|o| o.is_debt_entry())
            .map(|o| o.grand_total)
            .sum()
    }

    /// Round to cents, then refuse anything that is not at least one cent.
    pub fn ensure_positive(amount: Decimal) -> CoreResult<Decimal> {
        let rounded = round_money(amount);
        if rounded <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(amount));
        }
        Ok(rounded)
    }

    /// A zero-item pending order standing for money the customer owes.
    pub fn credit_order(
        customer: &CustomerRecord,
        amount: Decimal,
        description: Option<String>,
        currency: &str,
    ) -> CoreResult<Order> {
        let amount = Self::ensure_positive(amount)?;
        let now = Utc::now();

        Ok(Order {
            id: Uuid::new_v4(),
            shop_id: customer.shop_id,
            customer_id: Some(customer.id),
            order_number: generate_order_number(now),
            status: OrderStatus::Pending,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            grand_total: amount,
            currency: currency.to_string(),
            payment_method: CREDIT_PAYMENT_METHOD.to_string(),
            notes: description,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Allocate `amount` across the customer's pending orders, oldest first.
    ///
    /// Orders fully covered move to `delivered`; the first one that is not is
    /// reduced in place and the walk stops. Anything left after the last
    /// pending order is discarded and reported.
    pub async fn settle(
        tx: &mut dyn LedgerTransaction,
        customer_id: Uuid,
        amount: Decimal,
    ) -> CoreResult<SettlementResult> {
        let amount = Self::ensure_positive(amount)?;
        let pending = tx.lock_pending_orders(customer_id).await?;

        let mut remaining = amount;
        let mut settled = Vec::new();
        let mut untouched = Decimal::ZERO;

        for mut order in pending {
            if remaining.is_zero() {
                untouched += order.grand_total;
                continue;
            }

            let previous_total = order.grand_total;
            if remaining >= previous_total {
                StatusMachine::apply(tx, &mut order, OrderStatus::Delivered, TransitionCause::Settlement)
                    .await?;
                remaining -= previous_total;

                settled.push(SettledOrder {
                    order_id: order.id,
                    order_number: order.order_number,
                    previous_total,
                    new_total: previous_total,
                    amount_applied: previous_total,
                    status: order.status,
                    fully_settled: true,
                });
            } else {
                order.grand_total = round_money(previous_total - remaining);
                order.updated_at = Utc::now();
                tx.update_order(&order).await?;

                settled.push(SettledOrder {
                    order_id: order.id,
                    order_number: order.order_number,
                    previous_total,
                    new_total: order.grand_total,
                    amount_applied: remaining,
                    status: order.status,
                    fully_settled: false,
                });
                untouched += order.grand_total;
                remaining = Decimal::ZERO;
            }

            debug!(%customer_id, order_id = %order.id, %remaining, "payment allocated");
        }

        if remaining > Decimal::ZERO {
            warn!(%customer_id, %amount, excess = %remaining, "overpayment discarded");
        }

        Ok(SettlementResult {
            customer_id,
            amount,
            applied: amount - remaining,
            excess_discarded: remaining,
            orders: settled,
            remaining_balance: untouched,
        })
    }

    pub fn summarize(customer_id: Uuid, orders: &[Order]) -> CustomerSummary {
        let delivered: Vec<&Order> = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .collect();

        CustomerSummary {
            customer_id,
            debt_balance: Self::balance(orders),
            pending_orders: orders.iter().filter(|o| o.is_debt_entry()).count(),
            total_spent: delivered.iter().map(|o| o.grand_total).sum(),
            order_count: delivered.len(),
        }
    }
}
