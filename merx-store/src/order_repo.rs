use async_trait::async_trait;
use chrono::{DateTime, Utc};
use merx_core::{
    CoreError, CoreResult, CustomerRecord, LedgerStore, LedgerTransaction, Order, OrderFilter,
    OrderItem, OrderStatus, ProductSnapshot, StockRecord,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog_repo::StoreCatalogRepository;

/// SQLSTATEs a deployment uses to refuse removing an order: foreign key,
/// check constraint, row-level security, and trigger-raised policy errors.
const RESTRICTION_CODES: [&str; 4] = ["23503", "23514", "42501", "P0001"];

const ORDER_COLUMNS: &str = "id, shop_id, customer_id, order_number, status, subtotal, tax_amount, \
     grand_total, currency, payment_method, notes, created_at, updated_at";

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    shop_id: Uuid,
    customer_id: Option<Uuid>,
    order_number: String,
    status: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    currency: String,
    payment_method: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    product_snapshot: Json<ProductSnapshot>,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            product_snapshot: row.product_snapshot.0,
            created_at: row.created_at,
        }
    }
}

fn storage(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.to_string())
}

fn restricted_or_storage(order_id: Uuid, err: sqlx::Error) -> CoreError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());

    match code {
        Some(code) if RESTRICTION_CODES.contains(&code.as_str()) => CoreError::DeletionRestricted {
            order_id,
            reason: format!("{} (SQLSTATE {})", err, code),
        },
        _ => storage(err),
    }
}

// item_seq is assigned in insert order, which is cart order
const SELECT_ITEMS: &str = "SELECT id, order_id, product_id, quantity, unit_price, total_price, product_snapshot, created_at \
     FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, item_seq";

async fn load_items(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItem>>, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<OrderItemRow> = sqlx::query_as(SELECT_ITEMS)
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        by_order.entry(row.order_id).or_default().push(row.into());
    }
    Ok(by_order)
}

/// Attach items to order rows, preserving row order.
async fn hydrate(conn: &mut PgConnection, rows: Vec<OrderRow>) -> CoreResult<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = load_items(conn, &ids).await.map_err(storage)?;

    rows.into_iter()
        .map(|row| -> CoreResult<Order> {
            let status: OrderStatus = row
                .status
                .parse()
                .map_err(|e: merx_core::UnknownStatus| CoreError::Storage(e.to_string()))?;

            Ok(Order {
                items: items.remove(&row.id).unwrap_or_default(),
                id: row.id,
                shop_id: row.shop_id,
                customer_id: row.customer_id,
                order_number: row.order_number,
                status,
                subtotal: row.subtotal,
                tax_amount: row.tax_amount,
                grand_total: row.grand_total,
                currency: row.currency,
                payment_method: row.payment_method,
                notes: row.notes,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
        })
        .collect()
}

/// PostgreSQL-backed ledger store
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a read against one REPEATABLE READ snapshot.
    async fn snapshot(&self) -> CoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        Ok(tx)
    }

    async fn list_where(
        &self,
        column: &str,
        key: Uuid,
        filter: OrderFilter,
    ) -> CoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE {} = $1 \
             AND (($2::text IS NULL AND status <> 'deleted') OR status = $2) \
             ORDER BY created_at DESC, created_seq DESC",
            ORDER_COLUMNS, column
        );

        let mut tx = self.snapshot().await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(key)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&mut *tx)
            .await
            .map_err(storage)?;
        let orders = hydrate(&mut tx, rows).await?;
        tx.commit().await.map_err(storage)?;
        Ok(orders)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> CoreResult<Box<dyn LedgerTransaction>> {
        let tx = self.pool.begin().await.map_err(storage)?;
        Ok(Box::new(PgLedgerTransaction { tx }))
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);

        let mut tx = self.snapshot().await?;
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        let order = hydrate(&mut tx, row.into_iter().collect()).await?.pop();
        tx.commit().await.map_err(storage)?;
        Ok(order)
    }

    async fn list_shop_orders(&self, shop_id: Uuid, filter: OrderFilter) -> CoreResult<Vec<Order>> {
        self.list_where("shop_id", shop_id, filter).await
    }

    async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> CoreResult<Vec<Order>> {
        self.list_where("customer_id", customer_id, filter).await
    }

    async fn get_customer(&self, id: Uuid) -> CoreResult<Option<CustomerRecord>> {
        StoreCatalogRepository::get_customer(&self.pool, id)
            .await
            .map_err(storage)
    }

    async fn get_stock(&self, product_id: Uuid) -> CoreResult<Option<StockRecord>> {
        StoreCatalogRepository::get_stock(&self.pool, product_id)
            .await
            .map_err(storage)
    }
}

pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTransaction {
    async fn write_order(&mut self, order: &Order) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1, grand_total = $2, notes = $3, updated_at = $4 WHERE id = $5",
        )
        .bind(order.status.as_str())
        .bind(order.grand_total)
        .bind(order.notes.as_deref())
        .bind(order.updated_at)
        .bind(order.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn lock_product(
        &mut self,
        product_id: Uuid,
        shop_id: Uuid,
    ) -> CoreResult<Option<StockRecord>> {
        StoreCatalogRepository::lock_product(&mut self.tx, product_id, shop_id)
            .await
            .map_err(storage)
    }

    async fn set_stock_quantity(&mut self, product_id: Uuid, quantity: i32) -> CoreResult<()> {
        let updated = StoreCatalogRepository::set_stock_quantity(&mut self.tx, product_id, quantity)
            .await
            .map_err(storage)?;
        if updated == 0 {
            return Err(CoreError::not_found("Product", product_id));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, shop_id, customer_id, order_number, status, subtotal, tax_amount, grand_total, currency, payment_method, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id)
        .bind(order.shop_id)
        .bind(order.customer_id)
        .bind(&order.order_number)
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.grand_total)
        .bind(&order.currency)
        .bind(&order.payment_method)
        .bind(order.notes.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, total_price, product_snapshot, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .bind(Json(&item.product_snapshot))
            .bind(item.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        }

        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> CoreResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage)?;

        Ok(hydrate(&mut self.tx, row.into_iter().collect()).await?.pop())
    }

    async fn lock_pending_orders(&mut self, customer_id: Uuid) -> CoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE customer_id = $1 AND status = 'pending' \
             ORDER BY created_at ASC, created_seq ASC FOR UPDATE",
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)?;

        hydrate(&mut self.tx, rows).await
    }

    async fn update_order(&mut self, order: &Order) -> CoreResult<()> {
        let updated = self.write_order(order).await.map_err(storage)?;
        if updated == 0 {
            return Err(CoreError::not_found("Order", order.id));
        }
        Ok(())
    }

    async fn delete_order(&mut self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| restricted_or_storage(id, e))?;

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| restricted_or_storage(id, e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Order", id));
        }
        Ok(())
    }

    async fn reclassify_order(&mut self, order: &Order) -> CoreResult<()> {
        let updated = self
            .write_order(order)
            .await
            .map_err(|e| restricted_or_storage(order.id, e))?;
        if updated == 0 {
            return Err(CoreError::not_found("Order", order.id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit().await.map_err(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_load_in_insert_order() {
        assert!(SELECT_ITEMS.ends_with("ORDER BY order_id, item_seq"));
        assert!(!SELECT_ITEMS.contains("created_at, id"));
    }
}
