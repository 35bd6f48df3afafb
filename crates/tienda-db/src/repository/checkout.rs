//! # QR Checkout Repository
//!
//! Standalone QR checkouts: payment collected without a Sale row.
//! Single-row aggregate, so mutations are individual guarded updates
//! rather than multi-entity transactions.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tienda_core::QrCheckout;

const CHECKOUT_COLUMNS: &str = "id, order_number, customer_name, email, phone, amount_cents, \
     status, provider_tx_id, qr_image, checkout_url, order_detail, expires_at, paid_at, \
     created_at, updated_at";

/// Repository for standalone QR checkout operations.
#[derive(Debug, Clone)]
pub struct CheckoutRepository {
    pool: SqlitePool,
}

impl CheckoutRepository {
    /// Creates a new CheckoutRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutRepository { pool }
    }

    /// Inserts a new checkout (status `pending`, no provider fields yet).
    pub async fn insert(&self, checkout: &QrCheckout) -> DbResult<()> {
        debug!(order_number = %checkout.order_number, "Inserting QR checkout");

        sqlx::query(
            "INSERT INTO qr_checkouts (id, order_number, customer_name, email, phone, \
             amount_cents, status, provider_tx_id, qr_image, checkout_url, order_detail, \
             expires_at, paid_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&checkout.id)
        .bind(&checkout.order_number)
        .bind(&checkout.customer_name)
        .bind(&checkout.email)
        .bind(&checkout.phone)
        .bind(checkout.amount_cents)
        .bind(checkout.status)
        .bind(&checkout.provider_tx_id)
        .bind(&checkout.qr_image)
        .bind(&checkout.checkout_url)
        .bind(&checkout.order_detail)
        .bind(checkout.expires_at)
        .bind(checkout.paid_at)
        .bind(checkout.created_at)
        .bind(checkout.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a checkout by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<QrCheckout>> {
        let checkout = sqlx::query_as::<_, QrCheckout>(&format!(
            "SELECT {CHECKOUT_COLUMNS} FROM qr_checkouts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(checkout)
    }

    /// Gets a checkout by its provider-facing order number.
    pub async fn get_by_order_number(&self, order_number: &str) -> DbResult<Option<QrCheckout>> {
        let checkout = sqlx::query_as::<_, QrCheckout>(&format!(
            "SELECT {CHECKOUT_COLUMNS} FROM qr_checkouts WHERE order_number = ?1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(checkout)
    }

    /// Stores the provider response after a successful QR generation.
    pub async fn set_provider_details(
        &self,
        id: &str,
        provider_tx_id: &str,
        qr_image: &str,
        checkout_url: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE qr_checkouts SET provider_tx_id = ?2, qr_image = ?3, checkout_url = ?4, \
             expires_at = ?5, updated_at = ?6 WHERE id = ?1",
        )
        .bind(id)
        .bind(provider_tx_id)
        .bind(qr_image)
        .bind(checkout_url)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QrCheckout", id));
        }

        Ok(())
    }

    /// Marks a pending checkout as paid.
    ///
    /// Guarded on `status = 'pending'`: duplicate callbacks and
    /// callback-vs-poll races collapse into a single transition.
    ///
    /// ## Returns
    /// * `Ok(true)` - checkout transitioned to paid
    /// * `Ok(false)` - checkout was not pending (already paid/expired)
    pub async fn mark_paid(&self, id: &str, paid_at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE qr_checkouts SET status = 'paid', paid_at = ?2, updated_at = ?3 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .bind(paid_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a checkout as failed (QR generation error).
    pub async fn mark_error(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE qr_checkouts SET status = 'error', updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QrCheckout", id));
        }

        Ok(())
    }
}

/// Generates a new checkout ID.
pub fn generate_checkout_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
