//! # Domain Types
//!
//! Core domain types for the sale/payment settlement workflow.
//!
//! ## Aggregates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Sale ──owns──► SaleLine*  (cascade delete, immutable once created) │
//! │   │                │                                                │
//! │   │                └──refs──► Product (stock counter, restrict)     │
//! │   └──owns──► Payment*      (cascade delete, FIFO QR matching)       │
//! │                                                                     │
//! │  QrCheckout  (standalone aggregate, no Sale attached)               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id` for relations plus a business identifier
//! (product `code`, sale `order_number`) shown to humans and the provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// The stock counter is the inventory ledger: sale-line creation decrements
/// it (never below zero), cancellation increments it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code shown on labels and receipts.
    pub code: String,

    /// Display name.
    pub name: String,

    /// Sale price in cents.
    pub price_cents: i64,

    /// Current stock level. Invariant: never negative.
    pub stock: i64,

    /// Reorder threshold (reporting only, not enforced here).
    pub min_stock: i64,

    /// Whether the product can be sold (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the requested quantity can be reserved.
    pub fn can_reserve(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }

    /// Whether stock has fallen to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Sale Status / Kind
// =============================================================================

/// Settlement state of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Created, not yet fully paid.
    Pending,
    /// Completed payments cover the total.
    Paid,
    /// Cancelled; stock restored, payments untouched.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

/// Commercial kind of a sale (cash-and-carry vs on credit).
///
/// Credit sales start pending and are settled over multiple payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleKind {
    Cash,
    Credit,
}

// =============================================================================
// Payment Method / Status
// =============================================================================

/// How a payment is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; completes immediately.
    Cash,
    /// Provider QR; pending until the callback (or a poll) confirms it.
    Qr,
    /// Bank transfer; pending until confirmed manually.
    Transfer,
}

impl PaymentMethod {
    /// Cash completes on the spot; everything else needs confirmation.
    #[inline]
    pub fn settles_immediately(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

/// Lifecycle state of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Rejected,
}

// =============================================================================
// Sale
// =============================================================================

/// A customer transaction aggregating line items and payments.
///
/// Created once; mutated only by the settlement engine (status transitions)
/// — line attachment happens in the same transaction as creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Date-scoped sequential number, e.g. `V-20260830-0001`.
    pub order_number: String,
    /// Optional buyer reference (walk-in customers have none).
    pub customer_id: Option<String>,
    /// Seller (cashier) reference.
    pub seller_id: String,
    pub kind: SaleKind,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line item in a sale.
///
/// Unit price is a snapshot at sale time, so later product price changes
/// never rewrite history. Immutable once created; cancellation only touches
/// inventory, not the line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Discount applied to this line.
    pub discount_cents: i64,
    /// quantity × unit_price − discount.
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment attempt towards a sale.
///
/// A sale can carry several payments (partial payments on credit sales,
/// retried QR attempts). Only `Completed` payments count toward settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Provider transaction id for QR payments, bank reference for
    /// transfers, absent for cash.
    pub reference: Option<String>,
    pub status: PaymentStatus,
    /// When the payment was confirmed (set on completion).
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

// =============================================================================
// Standalone QR Checkout
// =============================================================================

/// Lifecycle state of a standalone QR checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Pending,
    Paid,
    Expired,
    Error,
}

/// A QR payment collected without an associated Sale row.
///
/// Used for the direct checkout flow (customer pays before any sale is
/// registered). Standalone aggregate; deliberately not unified with the
/// sale-linked Payment model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QrCheckout {
    pub id: String,
    /// Provider-facing order reference, e.g. `ORD-1724980000-4821`.
    pub order_number: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub amount_cents: i64,
    pub status: CheckoutStatus,
    /// Provider transaction id, set once the QR is generated.
    pub provider_tx_id: Option<String>,
    /// Base64-encoded QR image returned by the provider.
    pub qr_image: Option<String>,
    pub checkout_url: Option<String>,
    /// Line manifest sent to the provider (JSON).
    pub order_detail: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QrCheckout {
    #[inline]
    pub fn is_paid(&self) -> bool {
        self.status == CheckoutStatus::Paid
    }
}

/// A request to open a standalone QR checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub amount_cents: i64,
    /// Free-form line manifest forwarded to the provider.
    pub order_detail: serde_json::Value,
}

// =============================================================================
// Unit Tests
// =============================================================================
