//! # Payment Repository
//!
//! Payment rows and the settlement queries the engine runs over them.
//!
//! The balance-sensitive queries (`completed_total_in`,
//! `find_oldest_pending_in`, `mark_completed`) take the caller's
//! transaction: the engine computes the outstanding balance and decides
//! the PAID transition against the same consistent snapshot it mutates.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tienda_core::{Payment, PaymentMethod};

const PAYMENT_COLUMNS: &str =
    "id, sale_id, amount_cents, method, reference, status, paid_at, created_at";

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts a payment inside the caller's transaction.
    pub async fn insert(&self, conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            sale_id = %payment.sale_id,
            amount_cents = %payment.amount_cents,
            method = ?payment.method,
            "Inserting payment"
        );

        sqlx::query(
            "INSERT INTO payments (id, sale_id, amount_cents, method, reference, status, paid_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&payment.id)
        .bind(&payment.sale_id)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(payment.status)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets all payments for a sale, oldest first.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE sale_id = ?1 ORDER BY created_at, id"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Sums the completed payments of a sale inside the caller's transaction.
    ///
    /// Only `completed` rows count toward settlement.
    pub async fn completed_total_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM payments \
             WHERE sale_id = ?1 AND status = 'completed'",
        )
        .bind(sale_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(total)
    }

    /// Finds the oldest pending payment of the given method on a sale.
    ///
    /// FIFO by creation order: when several QR attempts are open on one
    /// sale, a provider confirmation settles the earliest one. Explicit
    /// query contract for the callback matching rule.
    pub async fn find_oldest_pending_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        method: PaymentMethod,
    ) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE sale_id = ?1 AND method = ?2 AND status = 'pending' \
             ORDER BY created_at, id LIMIT 1"
        ))
        .bind(sale_id)
        .bind(method)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(payment)
    }

    /// Marks a pending payment as completed.
    ///
    /// Guarded on `status = 'pending'`, so completing an already-completed
    /// payment is a no-op — the idempotency anchor for duplicate callbacks.
    ///
    /// ## Returns
    /// * `Ok(true)` - payment transitioned to completed
    /// * `Ok(false)` - payment was not pending (duplicate delivery)
    pub async fn mark_completed(
        &self,
        conn: &mut SqliteConnection,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'completed', paid_at = ?2 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(payment_id)
        .bind(paid_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Generates a new payment ID.
pub fn generate_payment_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
