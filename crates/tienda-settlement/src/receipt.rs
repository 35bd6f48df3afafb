//! Outcome types returned by the settlement engine.

use serde::Serialize;

use tienda_core::{Payment, Sale, SaleLine};
use tienda_gateway::QrCreated;

/// Result of creating a sale.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
    /// Initial payment, when the chosen method produced one.
    pub payments: Vec<Payment>,
    /// Generated QR, for QR sales where the provider call succeeded.
    pub qr: Option<QrCreated>,
    /// Why no QR is attached, when the provider call failed. The sale is
    /// committed either way; the seller can retry QR generation later.
    pub qr_error: Option<String>,
}

/// Result of recording a payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub payment: Payment,
    /// The sale after the PAID re-check.
    pub sale: Sale,
}

/// Result of generating a QR for an existing sale.
#[derive(Debug, Clone, Serialize)]
pub struct QrOutcome {
    pub payment: Payment,
    pub qr: QrCreated,
}

/// A sale with its lines and payments.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
    pub payments: Vec<Payment>,
}

/// Acknowledgment returned to the provider for a callback.
///
/// Always serialized with HTTP 200, whatever happened internally: the
/// provider retries anything else and the callback was already consumed.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackAck {
    pub error: i64,
    pub status: i64,
    pub message: String,
    pub values: bool,
}

impl CallbackAck {
    /// A payment was completed by this callback.
    pub fn applied() -> Self {
        CallbackAck {
            error: 0,
            status: 1,
            message: "payment registered".to_string(),
            values: true,
        }
    }

    /// Duplicate delivery: nothing left to complete, still a success.
    pub fn duplicate() -> Self {
        CallbackAck {
            error: 0,
            status: 1,
            message: "already processed".to_string(),
            values: true,
        }
    }

    /// The status code does not signal payment; acknowledged, not applied.
    pub fn ignored(status_code: i64) -> Self {
        CallbackAck {
            error: 0,
            status: 1,
            message: format!("status {status_code} acknowledged"),
            values: false,
        }
    }

    /// Unknown order reference. Still told as a success so the provider
    /// stops retrying garbage.
    pub fn unknown(order_ref: &str) -> Self {
        CallbackAck {
            error: 0,
            status: 1,
            message: format!("order {order_ref} not found"),
            values: false,
        }
    }

    /// Internal fault, logged and swallowed.
    pub fn internal_fault() -> Self {
        CallbackAck {
            error: 1,
            status: 0,
            message: "internal error".to_string(),
            values: false,
        }
    }
}
