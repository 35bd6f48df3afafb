//! # Sale Repository
//!
//! Database operations for sales and sale lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE (one transaction, driven by the settlement engine)       │
//! │     next_order_number() → insert() → insert_line()×N                │
//! │     (+ stock reservation and the initial payment, same tx)          │
//! │                                                                     │
//! │  2. SETTLE                                                          │
//! │     set_status(Paid) once completed payments cover the total        │
//! │                                                                     │
//! │  3. (OPTIONAL) CANCEL                                               │
//! │     set_status(Cancelled) + stock release, same tx                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tienda_core::{Sale, SaleLine, SaleStatus};

const SALE_COLUMNS: &str = "id, order_number, customer_id, seller_id, kind, subtotal_cents, \
     discount_cents, total_cents, status, notes, created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, sale_id, product_id, quantity, unit_price_cents, discount_cents, subtotal_cents, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by its order number (callback lookup path).
    pub async fn get_by_order_number(&self, order_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE order_number = ?1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by ID inside the caller's transaction.
    ///
    /// Used when the subsequent status decision must see a consistent
    /// snapshot (payment completion, cancellation).
    pub async fn get_by_id_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Generates the next date-scoped order number, e.g. `V-20260830-0007`.
    ///
    /// Counts today's sales inside the creation transaction; SQLite's
    /// single-writer rule plus the UNIQUE index on order_number make the
    /// counter safe under concurrent sale creation.
    pub async fn next_order_number(
        &self,
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let date_part = now.format("%Y%m%d").to_string();
        let prefix = format!("V-{date_part}-%");

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE order_number LIKE ?1")
                .bind(&prefix)
                .fetch_one(&mut *conn)
                .await?;

        Ok(format!("V-{}-{:04}", date_part, count + 1))
    }

    /// Inserts a sale inside the caller's transaction.
    pub async fn insert(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, order_number = %sale.order_number, "Inserting sale");

        sqlx::query(
            "INSERT INTO sales (id, order_number, customer_id, seller_id, kind, subtotal_cents, \
             discount_cents, total_cents, status, notes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&sale.id)
        .bind(&sale.order_number)
        .bind(&sale.customer_id)
        .bind(&sale.seller_id)
        .bind(sale.kind)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a sale line inside the caller's transaction.
    ///
    /// Unit price is the snapshot the engine already took; lines are
    /// immutable after this.
    pub async fn insert_line(&self, conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
        debug!(sale_id = %line.sale_id, product_id = %line.product_id, "Inserting sale line");

        sqlx::query(
            "INSERT INTO sale_lines (id, sale_id, product_id, quantity, unit_price_cents, \
             discount_cents, subtotal_cents, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.discount_cents)
        .bind(line.subtotal_cents)
        .bind(line.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets all lines for a sale, in creation order.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY created_at, id"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets all lines for a sale inside the caller's transaction.
    pub async fn get_lines_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY created_at, id"
        ))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(lines)
    }

    /// Sets the settlement status of a sale inside the caller's transaction.
    pub async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        status: SaleStatus,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(sale_id)
            .bind(status)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
