use merx_core::OrderItem;
use merx_shared::{tax_for, DEFAULT_CURRENCY};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-deployment pricing rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// Single flat tax rate (0.08 = 8%)
    pub tax_rate: Decimal,

    /// Currency stamped on every order
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Subtotal, tax and grand total of a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
}

pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Totals for priced order lines
    pub fn totals(&self, items: &[OrderItem]) -> CartTotals {
        let subtotal: Decimal = items.iter().map(|item| item.total_price).sum();
        let tax_amount = tax_for(subtotal, self.config.tax_rate);

        CartTotals {
            subtotal,
            tax_amount,
            grand_total: subtotal + tax_amount,
        }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merx_core::StockRecord;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn item(price: Decimal, quantity: i32) -> OrderItem {
        let product = StockRecord {
            product_id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            name: "Item".to_string(),
            description: None,
            unit_price: price,
            stock_quantity: 100,
            is_active: true,
        };
        OrderItem::new(Uuid::new_v4(), &product, quantity)
    }

    #[test]
    fn test_default_rate_is_eight_percent() {
        let engine = PricingEngine::default();
        assert_eq!(engine.config().tax_rate, dec!(0.08));
        assert_eq!(engine.currency(), "USD");
    }

    #[test]
    fn test_cart_totals() {
        let engine = PricingEngine::default();
        let totals = engine.totals(&[item(dec!(10.00), 3), item(dec!(4.99), 2)]);

        assert_eq!(totals.subtotal, dec!(39.98));
        assert_eq!(totals.tax_amount, dec!(3.20));
        assert_eq!(totals.grand_total, dec!(43.18));
    }

    #[test]
    fn test_custom_rate() {
        let engine = PricingEngine::new(PricingConfig {
            tax_rate: dec!(0.10),
            currency: "EUR".to_string(),
        });
        let totals = engine.totals(&[item(dec!(20.00), 1)]);

        assert_eq!(totals.tax_amount, dec!(2.00));
        assert_eq!(totals.grand_total, dec!(22.00));
    }
}
