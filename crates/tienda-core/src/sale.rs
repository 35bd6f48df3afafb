//! # Sale Arithmetic
//!
//! Pure computation for sale totals and settlement balances. The database
//! stores the results; this module is the single source of the formulas.
//!
//! ## Formulas
//! ```text
//! line.subtotal = quantity × unit_price − line.discount
//! sale.subtotal = Σ line.subtotal
//! sale.total    = sale.subtotal − sale.discount
//! outstanding   = sale.total − Σ completed payment amounts
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Payment, PaymentMethod, SaleKind};

// =============================================================================
// Request Types
// =============================================================================

/// One requested line item of a new sale.
///
/// The unit price is sent by the caller (the POS screen shows and may
/// override the list price) and snapshotted into the sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// A request to create a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSaleRequest {
    pub customer_id: Option<String>,
    pub seller_id: String,
    pub kind: SaleKind,
    pub method: PaymentMethod,
    #[serde(default)]
    pub discount_cents: i64,
    pub notes: Option<String>,
    pub lines: Vec<SaleLineRequest>,
}

// =============================================================================
// Totals
// =============================================================================

/// Computed totals for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

/// Computes a line subtotal: `quantity × unit_price − discount`.
#[inline]
pub fn line_subtotal(quantity: i64, unit_price: Money, discount: Money) -> Money {
    unit_price * quantity - discount
}

/// Computes sale totals from the requested lines and sale-level discount.
///
/// Deterministic: the settlement engine persists exactly these numbers and
/// tests recompute them independently.
pub fn compute_totals(lines: &[SaleLineRequest], discount: Money) -> SaleTotals {
    let subtotal = lines
        .iter()
        .map(|l| {
            line_subtotal(
                l.quantity,
                Money::from_cents(l.unit_price_cents),
                Money::from_cents(l.discount_cents),
            )
        })
        .fold(Money::zero(), |acc, m| acc + m);

    SaleTotals {
        subtotal,
        discount,
        total: subtotal - discount,
    }
}

// =============================================================================
// Settlement Balances
// =============================================================================

/// Sums the completed payments of a sale.
pub fn completed_total(payments: &[Payment]) -> Money {
    payments
        .iter()
        .filter(|p| p.is_completed())
        .map(|p| p.amount())
        .fold(Money::zero(), |acc, m| acc + m)
}

/// Outstanding balance in cents: `total − completed`, floored at zero.
///
/// The floor matters only for reporting; the record-payment guard compares
/// against the unfloored difference before any payment is accepted, so the
/// sum of completed payments can never exceed the total in the first place.
#[inline]
pub fn outstanding_cents(total_cents: i64, completed_cents: i64) -> i64 {
    Money::from_cents(total_cents)
        .saturating_sub_floor(Money::from_cents(completed_cents))
        .cents()
}

/// Whether completed payments fully cover the total.
#[inline]
pub fn is_settled(total_cents: i64, completed_cents: i64) -> bool {
    completed_cents >= total_cents
}

// =============================================================================
// Unit Tests
// =============================================================================
