use merx_core::{CoreError, CoreResult, StockRecord};

/// Check that a locked catalog row can cover `requested` units.
pub fn ensure_sellable(product: &StockRecord, requested: i32) -> CoreResult<()> {
    if !product.is_active {
        return Err(CoreError::InvalidOrder(format!(
            "Product {} ({}) is not available for sale",
            product.name, product.product_id
        )));
    }

    if product.stock_quantity < requested {
        return Err(CoreError::InsufficientStock {
            product_id: product.product_id,
            product_name: product.name.clone(),
            requested,
            available: product.stock_quantity,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn record(stock: i32, active: bool) -> StockRecord {
        StockRecord {
            product_id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            name: "Croissant".to_string(),
            description: None,
            unit_price: dec!(2.20),
            stock_quantity: stock,
            is_active: active,
        }
    }

    #[test]
    fn test_exact_stock_is_sellable() {
        assert!(ensure_sellable(&record(3, true), 3).is_ok());
    }

    #[test]
    fn test_short_stock_reports_context() {
        let product = record(2, true);
        match ensure_sellable(&product, 3) {
            Err(CoreError::InsufficientStock { product_id, requested, available, .. }) => {
                assert_eq!(product_id, product.product_id);
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_inactive_product_rejected() {
        let result = ensure_sellable(&record(10, false), 1);
        assert!(matches!(result, Err(CoreError::InvalidOrder(_))));
    }
}
