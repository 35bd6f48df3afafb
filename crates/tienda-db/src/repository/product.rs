//! # Product Repository
//!
//! Product lookup plus the inventory ledger over `products.stock`.
//!
//! ## Stock Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  reserve_stock(qty)   UPDATE ... SET stock = stock - qty            │
//! │                       WHERE id = ? AND stock >= qty                 │
//! │                       0 rows affected → insufficient stock          │
//! │                                                                     │
//! │  release_stock(qty)   UPDATE ... SET stock = stock + qty            │
//! │                       unconditional: mirrors exactly what was       │
//! │                       reserved, so it cannot overshoot              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! Both are delta updates, never absolute writes, so concurrent sales on
//! the same product compose correctly.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tienda_core::Product;

const PRODUCT_COLUMNS: &str =
    "id, code, name, price_cents, stock, min_stock, is_active, created_at, updated_at";

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
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            "INSERT INTO products (id, code, name, price_cents, stock, min_stock, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reserves stock for a sale line inside the caller's transaction.
    ///
    /// Conditional delta update: succeeds only when enough stock is
    /// available, which makes it the authoritative guard against
    /// overselling even under concurrent sales.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock decremented
    /// * `Ok(false)` - not enough stock (caller aborts the transaction)
    pub async fn reserve_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(product_id = %product_id, quantity = %quantity, "Reserving stock");

        let result = sqlx::query(
            "UPDATE products SET stock = stock - ?2, updated_at = ?3 \
             WHERE id = ?1 AND is_active = 1 AND stock >= ?2",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Releases previously reserved stock (cancellation path).
    ///
    /// Unconditional increment: the quantity mirrors exactly what the sale
    /// line reserved, so stock can only return to its pre-sale level.
    pub async fn release_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity = %quantity, "Releasing stock");

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical sale lines keep referencing it; it just stops being
    /// sellable.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
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

    fn product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            code: format!("CODE-{id}"),
            name: format!("Product {id}"),
            price_cents: 1000,
            stock,
            min_stock: 0,
            is_active: true,
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

        repo.insert(&product("p1", 10)).await.unwrap();

        let found = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(found.code, "CODE-p1");
        assert_eq!(found.stock, 10);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserve_stock_respects_available() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("p1", 5)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(repo.reserve_stock(&mut tx, "p1", 5).await.unwrap());
        // Already at zero: any further reservation fails
        assert!(!repo.reserve_stock(&mut tx, "p1", 1).await.unwrap());
        tx.commit().await.unwrap();

        let p = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(p.stock, 0);
    }

    #[tokio::test]
    async fn test_reserve_stock_rejects_inactive() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("p1", 5)).await.unwrap();
        repo.soft_delete("p1").await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(!repo.reserve_stock(&mut tx, "p1", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_stock_round_trip() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("p1", 10)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(repo.reserve_stock(&mut tx, "p1", 4).await.unwrap());
        repo.release_stock(&mut tx, "p1", 4).await.unwrap();
        tx.commit().await.unwrap();

        let p = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(p.stock, 10);
    }
}
