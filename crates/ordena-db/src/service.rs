//! # Order Service
//!
//! Order placement and status updates. This is the transactional side of
//! order handling: the pure assembly lives in ordena-core, this module
//! owns the commit transaction.
//!
//! ## Placement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      place_order(client, lines, seller)                 │
//! │                                                                         │
//! │  1. client exists? ───────────── no ──► ClientNotFound                 │
//! │  2. fetch requested products (snapshot, outside any transaction)       │
//! │  3. AssembledOrder::assemble ── fail ──► assembly error, nothing done  │
//! │  4. BEGIN TRANSACTION                                                   │
//! │     ├── insert order header (status = pending, precomputed total)      │
//! │     ├── for each line, in request order:                               │
//! │     │     UPDATE products SET stock = stock - qty                      │
//! │     │       WHERE id = ? AND stock >= qty                              │
//! │     │     0 rows? ──► re-read stock, ROLLBACK, InsufficientStock       │
//! │     │     insert line with its frozen unit price                       │
//! │     └── COMMIT                                                          │
//! │  5. read back the full order detail                                     │
//! │                                                                         │
//! │  Any failure inside step 4 rolls back EVERYTHING: no order rows, no    │
//! │  line rows, no stock change. There is no partially placed order.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Re-Check Stock Inside the Transaction
//! Assembly checks stock against a snapshot, which can go stale the moment
//! it is read. The conditional decrement is the authoritative check: under
//! SQLite's serialized writes, two orders competing for the last units
//! commit in some order, and the loser's decrement affects zero rows.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::repository::client::ClientRepository;
use crate::repository::order::{generate_line_id, new_pending_order, OrderRepository};
use crate::repository::product::ProductRepository;
use ordena_core::{
    AssembledOrder, LineRequest, OrderDetail, OrderError, OrderLine, OrderResult, OrderStatus,
    Product,
};

// =============================================================================
// Service
// =============================================================================

/// Order placement and status updates over a SQLite pool.
#[derive(Debug, Clone)]
pub struct OrderService {
    pool: SqlitePool,
}

impl OrderService {
    /// Creates a new OrderService.
    pub fn new(pool: SqlitePool) -> Self {
        OrderService { pool }
    }

    fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    // -------------------------------------------------------------------------
    // Placement
    // -------------------------------------------------------------------------

    /// Places an order: assembles it against current product state, then
    /// commits the header, lines, and stock decrements atomically.
    ///
    /// On success, returns the order as read back from the database.
    ///
    /// ## Errors
    /// - [`OrderError::ClientNotFound`] - unknown client id
    /// - [`OrderError::InvalidLineItem`] - empty lines or bad quantity
    /// - [`OrderError::ProductNotFound`] - a product id does not resolve
    /// - [`OrderError::InsufficientStock`] - at assembly, or at commit when
    ///   a concurrent order took the units first (fully rolled back)
    /// - [`OrderError::PersistenceConflict`] - write conflict, safe to retry
    /// - [`OrderError::StorageUnavailable`] - database failure
    pub async fn place_order(
        &self,
        client_id: &str,
        requests: &[LineRequest],
        seller_id: &str,
    ) -> OrderResult<OrderDetail> {
        debug!(client_id = %client_id, lines = requests.len(), "Placing order");

        if self
            .clients()
            .get_by_id(client_id)
            .await
            .map_err(map_db_err)?
            .is_none()
        {
            return Err(OrderError::ClientNotFound(client_id.to_string()));
        }

        // Snapshot of the requested products. Prices are frozen from this
        // snapshot; stock is re-validated inside the transaction.
        let catalog = self.fetch_catalog(requests).await?;

        let assembled = AssembledOrder::assemble(client_id, seller_id, requests, |id| {
            catalog.get(id)
        })?;

        let order = new_pending_order(
            assembled.client_id(),
            assembled.seller_id(),
            assembled.total_cents(),
            Utc::now(),
        );

        let mut tx = self.pool.begin().await.map_err(db_then_order)?;

        OrderRepository::insert_order(&mut tx, &order)
            .await
            .map_err(map_db_err)?;

        for line in assembled.lines() {
            let decremented =
                OrderRepository::try_decrement_stock(&mut tx, &line.product_id, line.quantity)
                    .await
                    .map_err(map_db_err)?;

            if !decremented {
                let available = OrderRepository::stock_of(&mut tx, &line.product_id)
                    .await
                    .map_err(map_db_err)?;

                warn!(
                    order_id = %order.id,
                    product_id = %line.product_id,
                    "Stock re-check failed, rolling back order"
                );

                // Already failing; a rollback error would only mask the
                // real cause, and dropping the handle rolls back anyway.
                let _ = tx.rollback().await;

                return Err(match available {
                    None => OrderError::ProductNotFound(line.product_id.clone()),
                    Some(available) => OrderError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        available,
                        requested: line.quantity,
                    },
                });
            }

            let row = OrderLine {
                id: generate_line_id(),
                order_id: order.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                subtotal_cents: line.subtotal_cents,
                created_at: order.created_at,
            };

            OrderRepository::insert_line(&mut tx, &row)
                .await
                .map_err(map_db_err)?;
        }

        tx.commit().await.map_err(db_then_order)?;

        info!(
            order_id = %order.id,
            total_cents = order.total_cents,
            lines = assembled.lines().len(),
            "Order placed"
        );

        self.read_back(&order.id).await
    }

    /// Fetches the requested products into an id-keyed snapshot.
    ///
    /// Missing ids are simply absent; assembly reports them as
    /// ProductNotFound so the error names the offending line.
    async fn fetch_catalog(
        &self,
        requests: &[LineRequest],
    ) -> OrderResult<HashMap<String, Product>> {
        let products = self.products();
        let mut catalog = HashMap::with_capacity(requests.len());

        for request in requests {
            if catalog.contains_key(&request.product_id) {
                continue;
            }
            if let Some(product) = products
                .get_by_id(&request.product_id)
                .await
                .map_err(map_db_err)?
            {
                catalog.insert(product.id.clone(), product);
            }
        }

        Ok(catalog)
    }

    async fn read_back(&self, order_id: &str) -> OrderResult<OrderDetail> {
        self.orders()
            .get_detail(order_id)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    // -------------------------------------------------------------------------
    // Status Updates
    // -------------------------------------------------------------------------

    /// Sets an order's status to one of the five recognized values.
    ///
    /// Rejecting an unknown status leaves the stored status untouched.
    /// Cancelling does NOT restock: reserved units stay decremented.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
    ) -> OrderResult<OrderDetail> {
        let status: OrderStatus = status.parse()?;

        match self.orders().update_status(order_id, status).await {
            Ok(()) => {}
            Err(DbError::NotFound { .. }) => {
                return Err(OrderError::OrderNotFound(order_id.to_string()));
            }
            Err(e) => return Err(map_db_err(e)),
        }

        info!(order_id = %order_id, status = %status, "Order status updated");

        self.read_back(order_id).await
    }

    // -------------------------------------------------------------------------
    // Read Surface
    // -------------------------------------------------------------------------

    /// Gets one order with client, seller, and product details resolved.
    pub async fn get_order(&self, order_id: &str) -> OrderResult<OrderDetail> {
        self.read_back(order_id).await
    }

    /// Lists all orders, most recent first.
    pub async fn list_orders(&self) -> OrderResult<Vec<OrderDetail>> {
        self.orders().list_details().await.map_err(map_db_err)
    }

    /// Lists a client's orders, most recent first.
    pub async fn orders_for_client(&self, client_id: &str) -> OrderResult<Vec<OrderDetail>> {
        if self
            .clients()
            .get_by_id(client_id)
            .await
            .map_err(map_db_err)?
            .is_none()
        {
            return Err(OrderError::ClientNotFound(client_id.to_string()));
        }

        self.orders()
            .list_by_client(client_id)
            .await
            .map_err(map_db_err)
    }

    /// Lists orders containing a given product, most recent first.
    pub async fn orders_for_product(&self, product_id: &str) -> OrderResult<Vec<OrderDetail>> {
        if self
            .products()
            .get_by_id(product_id)
            .await
            .map_err(map_db_err)?
            .is_none()
        {
            return Err(OrderError::ProductNotFound(product_id.to_string()));
        }

        self.orders()
            .list_by_product(product_id)
            .await
            .map_err(map_db_err)
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Maps storage errors onto the order error taxonomy.
///
/// A busy/locked database is the one retryable case; everything else is
/// surfaced as the storage being unavailable for this request.
fn map_db_err(err: DbError) -> OrderError {
    match err {
        DbError::Busy(msg) => OrderError::PersistenceConflict(msg),
        other => OrderError::StorageUnavailable(other.to_string()),
    }
}

fn db_then_order(err: sqlx::Error) -> OrderError {
    map_db_err(DbError::from(err))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::client::generate_client_id;
    use crate::repository::product::generate_product_id;
    use ordena_core::Client;

    struct Fixture {
        db: Database,
        client_id: String,
        seller_id: String,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();

            let now = Utc::now();
            let client_id = generate_client_id();
            db.clients()
                .insert(&Client {
                    id: client_id.clone(),
                    name: "Ana Gómez".to_string(),
                    email: "ana@example.com".to_string(),
                    phone: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();

            let seller_id = generate_client_id();
            sqlx::query(
                r#"
                INSERT INTO users (id, name, email, role, created_at, updated_at)
                VALUES (?1, 'Seller One', 'seller@example.com', 'seller', ?2, ?2)
                "#,
            )
            .bind(&seller_id)
            .bind(now)
            .execute(db.pool())
            .await
            .unwrap();

            Fixture {
                db,
                client_id,
                seller_id,
            }
        }

        async fn add_product(&self, code: &str, price_cents: i64, stock: i64) -> String {
            let now = Utc::now();
            let product = Product {
                id: generate_product_id(),
                code: code.to_string(),
                name: format!("Product {}", code),
                price_cents,
                stock,
                created_at: now,
                updated_at: now,
            };
            self.db.products().insert(&product).await.unwrap();
            product.id
        }

        fn service(&self) -> OrderService {
            self.db.orders_service()
        }

        async fn stock_of(&self, product_id: &str) -> i64 {
            self.db
                .products()
                .get_by_id(product_id)
                .await
                .unwrap()
                .unwrap()
                .stock
        }

        async fn order_count(&self) -> i64 {
            sqlx::query_scalar("SELECT COUNT(*) FROM orders")
                .fetch_one(self.db.pool())
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_place_order_commits_header_lines_and_stock() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 100).await;
        let p2 = fx.add_product("P002", 8999, 50).await;

        let detail = fx
            .service()
            .place_order(
                &fx.client_id,
                &[LineRequest::new(&p1, 3), LineRequest::new(&p2, 2)],
                &fx.seller_id,
            )
            .await
            .unwrap();

        assert_eq!(detail.status, OrderStatus::Pending);
        assert_eq!(detail.client.id, fx.client_id);
        assert_eq!(detail.seller.id, fx.seller_id);
        assert_eq!(detail.lines.len(), 2);

        // Total is the sum of stored subtotals, not a recomputation.
        let sum: i64 = detail.lines.iter().map(|l| l.subtotal_cents).sum();
        assert_eq!(detail.total_cents, sum);
        assert_eq!(detail.total_cents, 3 * 2550 + 2 * 8999);

        // Stock decremented by exactly the ordered quantities.
        assert_eq!(fx.stock_of(&p1).await, 97);
        assert_eq!(fx.stock_of(&p2).await, 48);
    }

    #[tokio::test]
    async fn test_unknown_client_rejected() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 10).await;

        let err = fx
            .service()
            .place_order("ghost", &[LineRequest::new(&p1, 1)], &fx.seller_id)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ClientNotFound(_)));
        assert_eq!(fx.stock_of(&p1).await, 10);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_everything_unchanged() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 3).await;

        let err = fx
            .service()
            .place_order(&fx.client_id, &[LineRequest::new(&p1, 5)], &fx.seller_id)
            .await
            .unwrap_err();

        match err {
            OrderError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(fx.stock_of(&p1).await, 3);
        assert_eq!(fx.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_causes_no_partial_decrement() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 10).await;

        let err = fx
            .service()
            .place_order(
                &fx.client_id,
                &[LineRequest::new(&p1, 2), LineRequest::new("ghost", 1)],
                &fx.seller_id,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ProductNotFound(id) if id == "ghost"));
        assert_eq!(fx.stock_of(&p1).await, 10);
        assert_eq!(fx.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_combined_demand_enforced_at_commit() {
        // Each line alone fits the stock, together they don't. Assembly
        // passes; the second conditional decrement must fail and roll
        // everything back.
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 1000, 10).await;

        let err = fx
            .service()
            .place_order(
                &fx.client_id,
                &[LineRequest::new(&p1, 6), LineRequest::new(&p1, 6)],
                &fx.seller_id,
            )
            .await
            .unwrap_err();

        match err {
            OrderError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                // Re-read under the transaction, after the first decrement.
                assert_eq!(available, 4);
                assert_eq!(requested, 6);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Rollback undid the first line's decrement too.
        assert_eq!(fx.stock_of(&p1).await, 10);
        assert_eq!(fx.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_prices_frozen_against_later_catalog_changes() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 10).await;

        let detail = fx
            .service()
            .place_order(&fx.client_id, &[LineRequest::new(&p1, 2)], &fx.seller_id)
            .await
            .unwrap();

        let mut product = fx.db.products().get_by_id(&p1).await.unwrap().unwrap();
        product.price_cents = 9999;
        fx.db.products().update(&product).await.unwrap();

        let reread = fx.service().get_order(&detail.id).await.unwrap();
        assert_eq!(reread.lines[0].unit_price_cents, 2550);
        assert_eq!(reread.total_cents, 5100);
    }

    #[tokio::test]
    async fn test_status_update_roundtrip() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 10).await;

        let detail = fx
            .service()
            .place_order(&fx.client_id, &[LineRequest::new(&p1, 1)], &fx.seller_id)
            .await
            .unwrap();

        let updated = fx
            .service()
            .update_order_status(&detail.id, "shipped")
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_unknown_status_rejected_and_stored_status_unchanged() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 10).await;

        let detail = fx
            .service()
            .place_order(&fx.client_id, &[LineRequest::new(&p1, 1)], &fx.seller_id)
            .await
            .unwrap();

        let err = fx
            .service()
            .update_order_status(&detail.id, "refunded")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidStatusTransition(_)));

        let reread = fx.service().get_order(&detail.id).await.unwrap();
        assert_eq!(reread.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancelling_does_not_restock() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 10).await;

        let detail = fx
            .service()
            .place_order(&fx.client_id, &[LineRequest::new(&p1, 4)], &fx.seller_id)
            .await
            .unwrap();
        assert_eq!(fx.stock_of(&p1).await, 6);

        fx.service()
            .update_order_status(&detail.id, "cancelled")
            .await
            .unwrap();
        assert_eq!(fx.stock_of(&p1).await, 6);
    }

    #[tokio::test]
    async fn test_status_update_for_missing_order() {
        let fx = Fixture::new().await;
        let err = fx
            .service()
            .update_order_status("ghost", "shipped")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_orders_for_last_units() {
        // Stock of 5, two concurrent 5-unit orders: exactly one commits.
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 5).await;

        let service_a = fx.service();
        let service_b = fx.service();
        let (client, seller, product) =
            (fx.client_id.clone(), fx.seller_id.clone(), p1.clone());

        let a = tokio::spawn({
            let (client, seller, product) = (client.clone(), seller.clone(), product.clone());
            async move {
                service_a
                    .place_order(&client, &[LineRequest::new(&product, 5)], &seller)
                    .await
            }
        });
        let b = tokio::spawn(async move {
            service_b
                .place_order(&client, &[LineRequest::new(&product, 5)], &seller)
                .await
        });

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        for result in [a, b] {
            if let Err(err) = result {
                assert!(matches!(err, OrderError::InsufficientStock { .. }));
            }
        }

        assert_eq!(fx.stock_of(&p1).await, 0);
        assert_eq!(fx.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_many_concurrent_orders_never_oversell() {
        // 8 tasks each wanting 2 units of a stock of 10: at most 5 succeed
        // and stock lands exactly at 10 - 2 × successes.
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 1000, 10).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = fx.service();
            let (client, seller, product) =
                (fx.client_id.clone(), fx.seller_id.clone(), p1.clone());
            handles.push(tokio::spawn(async move {
                service
                    .place_order(&client, &[LineRequest::new(&product, 2)], &seller)
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert!(successes <= 5);
        assert_eq!(fx.stock_of(&p1).await, 10 - 2 * successes);
        assert_eq!(fx.order_count().await, successes);
    }

    #[test]
    fn test_busy_maps_to_retryable_conflict() {
        let err = map_db_err(DbError::Busy("database is locked".to_string()));
        assert!(matches!(err, OrderError::PersistenceConflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_db_errors_map_to_storage_unavailable() {
        for db_err in [
            DbError::PoolExhausted,
            DbError::ConnectionFailed("refused".to_string()),
            DbError::QueryFailed("syntax".to_string()),
        ] {
            let err = map_db_err(db_err);
            assert!(matches!(err, OrderError::StorageUnavailable(_)));
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_raw_sqlx_error_goes_through_db_classification() {
        let err = db_then_order(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, OrderError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_order_listings() {
        let fx = Fixture::new().await;
        let p1 = fx.add_product("P001", 2550, 100).await;
        let p2 = fx.add_product("P002", 8999, 50).await;

        let first = fx
            .service()
            .place_order(&fx.client_id, &[LineRequest::new(&p1, 1)], &fx.seller_id)
            .await
            .unwrap();
        let second = fx
            .service()
            .place_order(
                &fx.client_id,
                &[LineRequest::new(&p1, 1), LineRequest::new(&p2, 1)],
                &fx.seller_id,
            )
            .await
            .unwrap();

        assert_eq!(fx.service().list_orders().await.unwrap().len(), 2);

        let by_client = fx
            .service()
            .orders_for_client(&fx.client_id)
            .await
            .unwrap();
        assert_eq!(by_client.len(), 2);

        let by_p2 = fx.service().orders_for_product(&p2).await.unwrap();
        assert_eq!(by_p2.len(), 1);
        assert_eq!(by_p2[0].id, second.id);

        let by_p1 = fx.service().orders_for_product(&p1).await.unwrap();
        assert_eq!(by_p1.len(), 2);

        let err = fx
            .service()
            .orders_for_client("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ClientNotFound(_)));

        // first is still retrievable on its own
        let reread = fx.service().get_order(&first.id).await.unwrap();
        assert_eq!(reread.lines.len(), 1);
    }
}
