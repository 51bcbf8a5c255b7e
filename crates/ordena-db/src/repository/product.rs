//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Mutates products.stock                           │
//! │                                                                         │
//! │  1. The order-commit transaction (service.rs)                          │
//! │     └── conditional decrement, all-or-nothing with the order rows      │
//! │                                                                         │
//! │  2. Administrative adjustments (THIS FILE, adjust_stock)               │
//! │     └── restocking deliveries, inventory corrections                   │
//! │                                                                         │
//! │  Nothing else. Both paths refuse to take stock below zero.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ordena_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, price_cents, stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its business code (e.g., "P001").
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, price_cents, stock, created_at, updated_at
            FROM products
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products ordered by code.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, price_cents, stock, created_at, updated_at
            FROM products
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(code = %product.code, "Inserting product");

        // Pre-check gives a friendlier error than parsing the constraint
        // message; the UNIQUE index still backs it up.
        if self.get_by_code(&product.code).await?.is_some() {
            return Err(DbError::duplicate("code", &product.code));
        }

        sqlx::query(
            r#"
            INSERT INTO products (id, code, name, price_cents, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates an existing product's code, name, and price.
    ///
    /// Stock is deliberately NOT written here: use [`adjust_stock`] or the
    /// order-commit transaction, so no absolute write can clobber a
    /// concurrent decrement.
    ///
    /// [`adjust_stock`]: ProductRepository::adjust_stock
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                name = ?3,
                price_cents = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Adjusts product stock by a delta (administrative path).
    ///
    /// ## Delta Updates
    /// ```text
    /// ❌ WRONG: absolute update (clobbers concurrent commits)
    ///    UPDATE products SET stock = 7 WHERE id = ?
    ///
    /// ✅ CORRECT: delta update
    ///    UPDATE products SET stock = stock + ?  (guarded >= 0)
    /// ```
    ///
    /// ## Arguments
    /// * `id` - Product ID
    /// * `delta` - Change in stock (positive for restocking, negative for
    ///   corrections)
    ///
    /// ## Errors
    /// * `DbError::NotFound` - Product doesn't exist
    /// * `DbError::CheckViolation` - Adjustment would take stock negative
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                None => Err(DbError::not_found("Product", id)),
                Some(product) => Err(DbError::CheckViolation {
                    message: format!(
                        "stock adjustment of {} on product {} would go below zero (current {})",
                        delta, id, product.stock
                    ),
                }),
            };
        }

        Ok(())
    }

    /// Deletes a product.
    ///
    /// Fails with a foreign key violation if order lines reference it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn sample_product(code: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            code: code.to_string(),
            name: format!("Product {}", code),
            price_cents,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let product = sample_product("P001", 2550, 100);
        repo.insert(&product).await.unwrap();

        let by_id = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "P001");
        assert_eq!(by_id.price_cents, 2550);
        assert_eq!(by_id.stock, 100);

        let by_code = repo.get_by_code("P001").await.unwrap().unwrap();
        assert_eq!(by_code.id, product.id);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        let repo = db.products();

        repo.insert(&sample_product("P001", 2550, 100)).await.unwrap();
        let err = repo.insert(&sample_product("P001", 999, 5)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let db = test_db().await;
        let repo = db.products();

        let product = sample_product("P001", 2550, 10);
        repo.insert(&product).await.unwrap();

        repo.adjust_stock(&product.id, 5).await.unwrap();
        assert_eq!(repo.get_by_id(&product.id).await.unwrap().unwrap().stock, 15);

        repo.adjust_stock(&product.id, -15).await.unwrap();
        assert_eq!(repo.get_by_id(&product.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let db = test_db().await;
        let repo = db.products();

        let product = sample_product("P001", 2550, 3);
        repo.insert(&product).await.unwrap();

        let err = repo.adjust_stock(&product.id, -4).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        // Stock unchanged
        assert_eq!(repo.get_by_id(&product.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_adjust_stock_missing_product() {
        let db = test_db().await;
        let err = db.products().adjust_stock("ghost", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_does_not_touch_stock() {
        let db = test_db().await;
        let repo = db.products();

        let mut product = sample_product("P001", 2550, 10);
        repo.insert(&product).await.unwrap();

        product.name = "Renamed".to_string();
        product.price_cents = 3000;
        product.stock = 999; // must be ignored
        repo.update(&product).await.unwrap();

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.price_cents, 3000);
        assert_eq!(stored.stock, 10);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let db = test_db().await;
        let repo = db.products();

        let product = sample_product("P001", 2550, 10);
        repo.insert(&product).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.delete(&product.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);

        let err = repo.delete(&product.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
