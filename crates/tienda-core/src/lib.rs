//! # tienda-core: Pure Business Logic for Tienda POS
//!
//! This crate is the heart of Tienda POS. It contains the sale/payment
//! domain as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Tienda POS Architecture                         │
//! │                                                                     │
//! │  HTTP API (apps/api)                                                │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  tienda-settlement ──► tienda-gateway (provider HTTP)               │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ★ tienda-core (THIS CRATE) ★                                       │
//! │                                                                     │
//! │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌────────────┐          │
//! │   │  types   │  │  money   │  │   sale   │  │ validation │          │
//! │   │ Product  │  │  Money   │  │  totals  │  │   rules    │          │
//! │   │ Payment  │  │  cents   │  │ balances │  │   checks   │          │
//! │   └──────────┘  └──────────┘  └──────────┘  └────────────┘          │
//! │                                                                     │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS                │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  tienda-db (SQLite repositories)                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleLine, Payment, QrCheckout)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`sale`] - Sale totals and settlement arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation for inbound requests
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: deterministic, same input = same output
//! 2. **Integer money**: all monetary values are cents (i64), never floats
//! 3. **Explicit errors**: typed errors, never strings or panics

pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use sale::{
    completed_total, compute_totals, is_settled, line_subtotal, outstanding_cents,
    CreateSaleRequest, SaleLineRequest, SaleTotals,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single sale.
///
/// Prevents runaway requests; reasonable retail transactions stay well
/// below this.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single line item.
///
/// Guards against fat-finger quantities (1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum caller-supplied amount, in cents (one billion in major units).
///
/// Upper bound for unit prices, discounts and checkout amounts. With
/// quantity capped at [`MAX_LINE_QUANTITY`] and lines at
/// [`MAX_SALE_LINES`], the totals arithmetic stays around 10^16 in the
/// worst case, far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
