//! # Provider Wire Types
//!
//! Request/response shapes for the QR provider plus the crate's
//! domain-facing types. The provider speaks camelCase JSON inside a
//! fixed `{ error, message, values }` envelope; amounts on the wire are
//! decimal currency units while everything internal stays in cents.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider payment status code meaning "paid".
///
/// The provider reports payment state as a numeric code in both the
/// asynchronous callback and the status query; `2` is the only value
/// that settles a payment.
pub const PROVIDER_STATUS_PAID: i64 = 2;

/// Provider code for QR payments in the generation request.
pub(crate) const PAYMENT_METHOD_QR: i64 = 4;

/// Provider currency code (local currency).
pub(crate) const CURRENCY_LOCAL: i64 = 2;

// =============================================================================
// Domain-Facing Types
// =============================================================================

/// A request to generate a payment QR.
#[derive(Debug, Clone)]
pub struct QrRequest {
    /// Our order number; the provider echoes it back in the callback.
    pub order_number: String,
    /// Amount to collect, in cents.
    pub amount_cents: i64,
    /// Customer display name.
    pub customer_name: String,
    /// Customer email (provider sends the receipt there).
    pub email: String,
    /// Customer phone number.
    pub phone: String,
    /// Line-item manifest forwarded to the provider verbatim.
    pub order_detail: serde_json::Value,
}

/// A successfully generated QR.
#[derive(Debug, Clone, Serialize)]
pub struct QrCreated {
    /// Provider-side transaction identifier.
    pub transaction_id: String,
    /// Base64-encoded QR image.
    pub qr_image: String,
    /// Hosted checkout page, when the provider offers one.
    pub checkout_url: Option<String>,
    /// When the QR stops being payable.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a transaction status query.
#[derive(Debug, Clone, Copy)]
pub struct TransactionStatus {
    /// Raw provider status code.
    pub payment_status: i64,
}

impl TransactionStatus {
    /// True when the provider reports the transaction as paid.
    pub fn is_paid(&self) -> bool {
        self.payment_status == PROVIDER_STATUS_PAID
    }
}

// =============================================================================
// Wire Envelope
// =============================================================================

/// The provider's uniform response envelope.
///
/// `error` is 0 on success; anything else carries a human-readable
/// `message` and no usable `values`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub error: i64,
    #[serde(default)]
    pub message: String,
    pub values: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginValues {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateQrBody {
    pub payment_method: i64,
    pub client_name: String,
    pub phone_number: String,
    pub email: String,
    pub payment_number: String,
    pub amount: f64,
    pub currency: i64,
    pub client_code: String,
    pub callback_url: String,
    pub order_detail: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateQrValues {
    pub transaction_id: String,
    pub qr_base64: String,
    #[serde(default)]
    pub checkout_url: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryTransactionBody {
    pub pagofacil_transaction_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryTransactionValues {
    pub payment_status: i64,
}

/// Converts cents to the decimal amount the provider expects.
pub(crate) fn cents_to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Parses the provider's expiration timestamp.
///
/// The provider is inconsistent between RFC 3339 and a bare
/// `YYYY-MM-DD HH:MM:SS`; an unparseable value degrades to `None`
/// rather than failing the whole QR generation.
pub(crate) fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
