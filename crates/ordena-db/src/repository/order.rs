//! # Order Repository
//!
//! Database operations for orders and order lines.
//!
//! ## Two Kinds of Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  TRANSACTION-SCOPED (associated fns taking &mut Transaction)           │
//! │  ├── insert_order      - order header row                              │
//! │  ├── insert_line       - one line with its frozen price                │
//! │  ├── try_decrement_stock - conditional `stock = stock - ?` guard       │
//! │  └── stock_of          - re-read under the transaction                 │
//! │                                                                         │
//! │  These only exist inside the commit transaction owned by               │
//! │  OrderService::place_order. They are never reachable without one,      │
//! │  so a partial order can never be observed.                             │
//! │                                                                         │
//! │  POOL-SCOPED (methods on OrderRepository)                              │
//! │  ├── get_header / update_status                                        │
//! │  ├── get_detail        - read-back join (client, seller, products)     │
//! │  └── list_details / list_by_client / list_by_product                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ordena_core::{Order, OrderDetail, OrderLine, OrderLineDetail, OrderStatus, PartyRef, ProductRef};

// =============================================================================
// Row Shapes
// =============================================================================

/// id/name/email projection of a client or user row.
#[derive(Debug, sqlx::FromRow)]
struct PartyRow {
    id: String,
    name: String,
    email: String,
}

impl From<PartyRow> for PartyRef {
    fn from(row: PartyRow) -> Self {
        PartyRef {
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}

/// One order line joined with its product's display data.
#[derive(Debug, sqlx::FromRow)]
struct LineDetailRow {
    id: String,
    product_id: String,
    code: String,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
}

impl From<LineDetailRow> for OrderLineDetail {
    fn from(row: LineDetailRow) -> Self {
        OrderLineDetail {
            id: row.id,
            product: ProductRef {
                id: row.product_id,
                code: row.code,
                name: row.name,
            },
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            subtotal_cents: row.subtotal_cents,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    /// Inserts the order header row inside the commit transaction.
    pub async fn insert_order(tx: &mut Transaction<'_, Sqlite>, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, total = %order.total_cents, "Inserting order header");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, client_id, seller_id, total_cents, status,
                placed_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&order.id)
        .bind(&order.client_id)
        .bind(&order.seller_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(order.placed_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Inserts one order line inside the commit transaction.
    ///
    /// ## Snapshot Pattern
    /// The line carries the unit price and subtotal frozen at assembly;
    /// they are inserted verbatim, never recomputed from the product row.
    pub async fn insert_line(tx: &mut Transaction<'_, Sqlite>, line: &OrderLine) -> DbResult<()> {
        debug!(order_id = %line.order_id, product_id = %line.product_id, "Inserting order line");

        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, product_id, quantity,
                unit_price_cents, subtotal_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.subtotal_cents)
        .bind(line.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Conditionally decrements product stock inside the commit transaction.
    ///
    /// This is the stock re-validation: the `stock >= ?` predicate re-reads
    /// current stock under the transaction's isolation, so a concurrent
    /// commit that already took the units makes this a no-op.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock was decremented
    /// * `Ok(false)` - product missing or insufficient stock; nothing written
    pub async fn try_decrement_stock(
        tx: &mut Transaction<'_, Sqlite>,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reads a product's current stock under the transaction.
    ///
    /// Used to populate the available/requested error payload after a
    /// failed decrement, before the transaction is rolled back.
    pub async fn stock_of(
        tx: &mut Transaction<'_, Sqlite>,
        product_id: &str,
    ) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(stock)
    }

    // -------------------------------------------------------------------------
    // Pool-scoped operations
    // -------------------------------------------------------------------------

    /// Gets an order header by ID.
    pub async fn get_header(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, client_id, seller_id, total_cents, status,
                   placed_at, created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets the raw lines of an order, in insertion order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT id, order_id, product_id, quantity,
                   unit_price_cents, subtotal_cents, created_at
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Updates an order's status.
    ///
    /// Does NOT touch stock: cancelling an order does not restock.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating order status");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Gets a fully resolved order: header + client + seller + lines with
    /// product display data. This is a read-back join, not a recomputation.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<OrderDetail>> {
        let Some(order) = self.get_header(id).await? else {
            return Ok(None);
        };

        let client: PartyRow = sqlx::query_as(
            "SELECT id, name, email FROM clients WHERE id = ?1",
        )
        .bind(&order.client_id)
        .fetch_one(&self.pool)
        .await?;

        let seller: PartyRow = sqlx::query_as(
            "SELECT id, name, email FROM users WHERE id = ?1",
        )
        .bind(&order.seller_id)
        .fetch_one(&self.pool)
        .await?;

        let lines: Vec<LineDetailRow> = sqlx::query_as(
            r#"
            SELECT ol.id, ol.product_id, p.code, p.name,
                   ol.quantity, ol.unit_price_cents, ol.subtotal_cents
            FROM order_lines ol
            INNER JOIN products p ON p.id = ol.product_id
            WHERE ol.order_id = ?1
            ORDER BY ol.rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderDetail {
            id: order.id,
            client: client.into(),
            seller: seller.into(),
            total_cents: order.total_cents,
            status: order.status,
            placed_at: order.placed_at,
            lines: lines.into_iter().map(Into::into).collect(),
        }))
    }

    /// Lists all orders, most recent first.
    pub async fn list_details(&self) -> DbResult<Vec<OrderDetail>> {
        let ids = self.order_ids("SELECT id FROM orders ORDER BY placed_at DESC", None).await?;
        self.details_for(ids).await
    }

    /// Lists a client's orders, most recent first.
    pub async fn list_by_client(&self, client_id: &str) -> DbResult<Vec<OrderDetail>> {
        let ids = self
            .order_ids(
                "SELECT id FROM orders WHERE client_id = ?1 ORDER BY placed_at DESC",
                Some(client_id),
            )
            .await?;
        self.details_for(ids).await
    }

    /// Lists orders containing a given product, most recent first.
    pub async fn list_by_product(&self, product_id: &str) -> DbResult<Vec<OrderDetail>> {
        let ids = self
            .order_ids(
                r#"
                SELECT DISTINCT o.id
                FROM orders o
                INNER JOIN order_lines ol ON ol.order_id = o.id
                WHERE ol.product_id = ?1
                ORDER BY o.placed_at DESC
                "#,
                Some(product_id),
            )
            .await?;
        self.details_for(ids).await
    }

    async fn order_ids(&self, sql: &str, bind: Option<&str>) -> DbResult<Vec<String>> {
        let query = sqlx::query_scalar::<_, String>(sql);
        let query = match bind {
            Some(value) => query.bind(value),
            None => query,
        };
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn details_for(&self, ids: Vec<String>) -> DbResult<Vec<OrderDetail>> {
        let mut details = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(detail) = self.get_detail(&id).await? {
                details.push(detail);
            }
        }
        Ok(details)
    }
}

/// Generates a new order ID.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new order line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds the header row for a freshly assembled order.
pub(crate) fn new_pending_order(
    client_id: &str,
    seller_id: &str,
    total_cents: i64,
    placed_at: DateTime<Utc>,
) -> Order {
    Order {
        id: generate_order_id(),
        client_id: client_id.to_string(),
        seller_id: seller_id.to_string(),
        total_cents,
        status: OrderStatus::Pending,
        placed_at,
        created_at: placed_at,
        updated_at: placed_at,
    }
}
