//! # tienda-gateway: QR Payment Provider Client
//!
//! HTTP client for the QR payment provider. Everything that leaves the
//! process over the network lives here; the rest of the system only sees
//! the [`QrGateway`] trait.
//!
//! ## Provider Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Provider Interaction                         │
//! │                                                                     │
//! │  1. LOGIN        POST /login                                        │
//! │                  headers: tcTokenService / tcTokenSecret            │
//! │                  → accessToken (cached with expiry margin)          │
//! │                                                                     │
//! │  2. GENERATE QR  POST /generate-qr   (Bearer accessToken)           │
//! │                  amount, order number, customer, callback URL       │
//! │                  → transactionId + base64 QR image                  │
//! │                                                                     │
//! │  3. QUERY        POST /query-transaction  (Bearer accessToken)      │
//! │                  → paymentStatus (2 = paid)                         │
//! │                                                                     │
//! │  (4. CALLBACK    provider → our HTTP API; handled in apps/api,      │
//! │                  not in this crate)                                 │
//! │                                                                     │
//! │  Every response uses the same envelope:                             │
//! │  { "error": 0|1, "message": "...", "values": { ... } }              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Handling
//! The access token is cached in memory and reused until it approaches
//! its expiry. On a 401 (token invalidated server-side early) the client
//! re-authenticates once and retries the request once.

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

pub use client::{HttpQrGateway, QrGateway};
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use session::Session;
pub use types::{QrCreated, QrRequest, TransactionStatus, PROVIDER_STATUS_PAID};
