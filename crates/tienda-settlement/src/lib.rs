//! # tienda-settlement: Sale/Payment Settlement Engine
//!
//! The core state machine of Tienda POS: it drives a sale from creation
//! through stock reservation, multi-method payment collection and
//! provider callback reconciliation, up to the PAID or CANCELLED state.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Sale Settlement Flow                         │
//! │                                                                     │
//! │  create_sale ──┬── CASH ────► Payment COMPLETED ───► Sale PAID      │
//! │  (one tx:      │                                                    │
//! │   sale+lines   ├── TRANSFER ► Payment PENDING  ──┐                  │
//! │   +stock)      │                                 │                  │
//! │                └── QR ──► gateway (post-commit)  │                  │
//! │                           Payment PENDING ───────┤                  │
//! │                                                  ▼                  │
//! │                              record_payment / handle_callback /     │
//! │                              poll_sale_qr                           │
//! │                                │                                    │
//! │                                ▼  Σ completed ≥ total               │
//! │                            Sale PAID                                │
//! │                                                                     │
//! │  cancel_sale: release stock per line + Sale CANCELLED (one tx)      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Discipline
//! - Every multi-entity mutation runs inside one SQLite write transaction;
//!   any failure rolls the whole operation back.
//! - The outstanding-balance computation and the PAID decision share that
//!   transaction, so concurrent completions for one sale serialize.
//! - Gateway round trips never run inside a transaction. The QR path
//!   commits the sale first and reports a gateway failure on the receipt
//!   instead of rolling back.

pub mod engine;
pub mod error;
pub mod receipt;

pub use engine::{EngineConfig, SettlementEngine};
pub use error::{SettlementError, SettlementResult};
pub use receipt::{CallbackAck, PaymentOutcome, QrOutcome, SaleDetail, SaleReceipt};
