use merx_core::{CustomerRecord, StockRecord};
use merx_shared::Masked;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    shop_id: Uuid,
    name: String,
    description: Option<String>,
    unit_price: Decimal,
    stock_quantity: i32,
    is_active: bool,
}

impl From<ProductRow> for StockRecord {
    fn from(row: ProductRow) -> Self {
        StockRecord {
            product_id: row.id,
            shop_id: row.shop_id,
            name: row.name,
            description: row.description,
            unit_price: row.unit_price,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    shop_id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
}

impl From<CustomerRow> for CustomerRecord {
    fn from(row: CustomerRow) -> Self {
        CustomerRecord {
            id: row.id,
            shop_id: row.shop_id,
            name: row.name,
            email: row.email.map(Masked),
            phone: row.phone.map(Masked),
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, shop_id, name, description, unit_price, stock_quantity, is_active";

/// Read access to the catalog and the customer directory, plus the stock
/// column this engine owns.
pub struct StoreCatalogRepository;

impl StoreCatalogRepository {
    /// Lock a product row of `shop_id` for the rest of the transaction.
    pub async fn lock_product(
        conn: &mut PgConnection,
        product_id: Uuid,
        shop_id: Uuid,
    ) -> Result<Option<StockRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = $1 AND shop_id = $2 FOR UPDATE",
            PRODUCT_COLUMNS
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(product_id)
            .bind(shop_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(StockRecord::from))
    }

    /// Returns the number of rows written (0 when the product is gone).
    pub async fn set_stock_quantity(
        conn: &mut PgConnection,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn get_stock(pool: &PgPool, product_id: Uuid) -> Result<Option<StockRecord>, sqlx::Error> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(product_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(StockRecord::from))
    }

    pub async fn get_customer(pool: &PgPool, id: Uuid) -> Result<Option<CustomerRecord>, sqlx::Error> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, shop_id, name, email, phone FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(CustomerRecord::from))
    }
}
