use chrono::{DateTime, Utc};
use merx_catalog::{ensure_sellable, InventoryAdjuster, PricingEngine};
use merx_core::{CoreError, CoreResult, CustomerRecord, LedgerTransaction, Order, OrderItem, OrderStatus, StockRecord};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::models::CreateOrderRequest;

/// Turns a cart into a persisted pending order
pub struct OrderBuilder {
    pricing: PricingEngine,
}

impl OrderBuilder {
    pub fn new(pricing: PricingEngine) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Reject malformed carts and fold duplicate lines into one requested
    /// quantity per product, keyed in lock order.
    pub fn validate(request: &CreateOrderRequest) -> CoreResult<BTreeMap<Uuid, i32>> {
        if request.items.is_empty() {
            return Err(CoreError::InvalidOrder("Order must contain at least one item".to_string()));
        }

        if request.payment_method.trim().is_empty() {
            return Err(CoreError::InvalidOrder("Payment method is required".to_string()));
        }

        let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
        for line in &request.items {
            if line.quantity <= 0 {
                return Err(CoreError::InvalidOrder(format!(
                    "Quantity for product {} must be positive, got {}",
                    line.product_id, line.quantity
                )));
            }

            let total = requested.entry(line.product_id).or_insert(0);
            *total = total.checked_add(line.quantity).ok_or_else(|| {
                CoreError::InvalidOrder(format!("Quantity overflow for product {}", line.product_id))
            })?;
        }

        Ok(requested)
    }

    /// Walk-in sales have no customer; otherwise the customer must belong to the shop.
    pub fn check_customer(
        request: &CreateOrderRequest,
        customer: Option<&CustomerRecord>,
    ) -> CoreResult<()> {
        match (request.customer_id, customer) {
            (None, _) => Ok(()),
            (Some(id), None) => Err(CoreError::not_found("Customer", id)),
            (Some(_), Some(customer)) if customer.shop_id != request.shop_id => {
                Err(CoreError::InvalidOrder(format!(
                    "Customer {} does not belong to shop {}",
                    customer.id, request.shop_id
                )))
            }
            (Some(_), Some(_)) => Ok(()),
        }
    }

    /// Lock stock, write the order with its items and take the units out of
    /// stock, all inside `tx`. Any error leaves `tx` to be rolled back.
    pub async fn build(
        &self,
        tx: &mut dyn LedgerTransaction,
        request: &CreateOrderRequest,
    ) -> CoreResult<Order> {
        let requested = Self::validate(request)?;

        let mut products: HashMap<Uuid, StockRecord> = HashMap::with_capacity(requested.len());
        for (&product_id, &quantity) in &requested {
            let product = tx
                .lock_product(product_id, request.shop_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", product_id))?;
            ensure_sellable(&product, quantity)?;
            products.insert(product_id, product);
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let items: Vec<OrderItem> = request
            .items
            .iter()
            .map(|line| OrderItem::new(order_id, &products[&line.product_id], line.quantity))
            .collect();
        let totals = self.pricing.totals(&items);

        let order = Order {
            id: order_id,
            shop_id: request.shop_id,
            customer_id: request.customer_id,
            order_number: generate_order_number(now),
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            grand_total: totals.grand_total,
            currency: self.pricing.currency().to_string(),
            payment_method: request.payment_method.trim().to_string(),
            notes: request.notes.clone(),
            items,
            created_at: now,
            updated_at: now,
        };

        tx.insert_order(&order).await?;

        for (&product_id, &quantity) in &requested {
            InventoryAdjuster::decrement(tx, product_id, request.shop_id, quantity).await?;
        }

        Ok(order)
    }
}

/// `ORD-<UTC timestamp>-<8 random hex>`; the store's unique index backs it up.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartLine;
    use merx_catalog::PricingConfig;
    use merx_core::LedgerStore;
    use merx_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn request(shop_id: Uuid, items: Vec<CartLine>) -> CreateOrderRequest {
        CreateOrderRequest {
            shop_id,
            customer_id: None,
            items,
            payment_method: "cash".to_string(),
            notes: None,
        }
    }

    async fn shop_with(stock: &[(&str, rust_decimal::Decimal, i32)]) -> (MemoryStore, Uuid, Vec<Uuid>) {
        let store = MemoryStore::new();
        let shop_id = Uuid::new_v4();
        let mut ids = Vec::new();
        for (name, price, qty) in stock {
            let product_id = Uuid::new_v4();
            store
                .add_product(StockRecord {
                    product_id,
                    shop_id,
                    name: name.to_string(),
                    description: None,
                    unit_price: *price,
                    stock_quantity: *qty,
                    is_active: true,
                })
                .await;
            ids.push(product_id);
        }
        (store, shop_id, ids)
    }

    #[test]
    fn test_validate_rejects_empty_and_non_positive() {
        let shop = Uuid::new_v4();
        assert!(matches!(
            OrderBuilder::validate(&request(shop, vec![])),
            Err(CoreError::InvalidOrder(_))
        ));

        let zero = request(shop, vec![CartLine { product_id: Uuid::new_v4(), quantity: 0 }]);
        assert!(matches!(OrderBuilder::validate(&zero), Err(CoreError::InvalidOrder(_))));

        let negative = request(shop, vec![CartLine { product_id: Uuid::new_v4(), quantity: -2 }]);
        assert!(matches!(OrderBuilder::validate(&negative), Err(CoreError::InvalidOrder(_))));

        let mut blank = request(shop, vec![CartLine { product_id: Uuid::new_v4(), quantity: 1 }]);
        blank.payment_method = "  ".to_string();
        assert!(matches!(OrderBuilder::validate(&blank), Err(CoreError::InvalidOrder(_))));
    }

    #[test]
    fn test_validate_merges_duplicate_lines() {
        let product = Uuid::new_v4();
        let req = request(
            Uuid::new_v4(),
            vec![
                CartLine { product_id: product, quantity: 2 },
                CartLine { product_id: product, quantity: 3 },
            ],
        );
        let requested = OrderBuilder::validate(&req).unwrap();
        assert_eq!(requested[&product], 5);
    }

    #[test]
    fn test_check_customer() {
        let shop = Uuid::new_v4();
        let customer = CustomerRecord {
            id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            name: "Dana".to_string(),
            email: None,
            phone: None,
        };
        let mut req = request(shop, vec![]);
        assert!(OrderBuilder::check_customer(&req, None).is_ok());

        req.customer_id = Some(customer.id);
        assert!(matches!(
            OrderBuilder::check_customer(&req, None),
            Err(CoreError::NotFound { entity: "Customer", .. })
        ));
        assert!(matches!(
            OrderBuilder::check_customer(&req, Some(&customer)),
            Err(CoreError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_order_number_shape() {
        let number = generate_order_number(Utc::now());
        assert!(number.starts_with("ORD-"));
        assert_eq!(number.len(), "ORD-".len() + 14 + 1 + 8);
        assert_ne!(number, generate_order_number(Utc::now()));
    }

    #[tokio::test]
    async fn test_build_prices_snapshots_and_decrements() {
        let (store, shop_id, ids) =
            shop_with(&[("Flat white", dec!(4.50), 10), ("Muffin", dec!(3.00), 4)]).await;
        let builder = OrderBuilder::new(PricingEngine::new(PricingConfig::default()));
        let req = request(
            shop_id,
            vec![
                CartLine { product_id: ids[0], quantity: 2 },
                CartLine { product_id: ids[1], quantity: 4 },
            ],
        );

        let mut tx = store.begin().await.unwrap();
        let order = builder.build(tx.as_mut(), &req).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.subtotal, dec!(21.00));
        assert_eq!(order.tax_amount, dec!(1.68));
        assert_eq!(order.grand_total, dec!(22.68));
        assert_eq!(order.items_total(), order.subtotal);
        assert_eq!(order.items[0].product_snapshot.name, "Flat white");

        assert_eq!(store.get_stock(ids[0]).await.unwrap().unwrap().stock_quantity, 8);
        assert_eq!(store.get_stock(ids[1]).await.unwrap().unwrap().stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_items_read_back_in_cart_order() {
        let (store, shop_id, ids) = shop_with(&[
            ("Croissant", dec!(2.20), 5),
            ("Latte", dec!(4.00), 5),
            ("Tea", dec!(2.50), 5),
        ])
        .await;
        let builder = OrderBuilder::new(PricingEngine::default());
        let req = request(
            shop_id,
            vec![
                CartLine { product_id: ids[2], quantity: 1 },
                CartLine { product_id: ids[0], quantity: 1 },
                CartLine { product_id: ids[1], quantity: 1 },
            ],
        );

        let mut tx = store.begin().await.unwrap();
        let order = builder.build(tx.as_mut(), &req).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        let names: Vec<&str> = stored
            .items
            .iter()
            .map(|i| i.product_snapshot.name.as_str())
            .collect();
        assert_eq!(names, vec!["Tea", "Croissant", "Latte"]);
    }

    #[tokio::test]
    async fn test_duplicate_lines_cannot_oversell() {
        let (store, shop_id, ids) = shop_with(&[("Bagel", dec!(2.00), 3)]).await;
        let builder = OrderBuilder::new(PricingEngine::default());
        let req = request(
            shop_id,
            vec![
                CartLine { product_id: ids[0], quantity: 2 },
                CartLine { product_id: ids[0], quantity: 2 },
            ],
        );

        let mut tx = store.begin().await.unwrap();
        let result = builder.build(tx.as_mut(), &req).await;
        assert!(matches!(
            result,
            Err(CoreError::InsufficientStock { requested: 4, available: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_product_from_other_shop_not_found() {
        let (store, _shop_id, ids) = shop_with(&[("Scone", dec!(2.75), 3)]).await;
        let builder = OrderBuilder::new(PricingEngine::default());
        let req = request(Uuid::new_v4(), vec![CartLine { product_id: ids[0], quantity: 1 }]);

        let mut tx = store.begin().await.unwrap();
        let result = builder.build(tx.as_mut(), &req).await;
        assert!(matches!(result, Err(CoreError::NotFound { entity: "Product", .. })));
    }
}
