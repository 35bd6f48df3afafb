//! Settlement error type.
//!
//! Wraps the three lower layers. The HTTP layer maps these onto status
//! codes; within the engine they just flow through `?`.

use thiserror::Error;

use tienda_core::CoreError;
use tienda_db::DbError;
use tienda_gateway::GatewayError;

/// Errors from settlement engine operations.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Business rule violation (insufficient stock, overpayment, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database failure.
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    /// Payment provider failure. Surfaced to the caller but never rolls
    /// back an already-committed sale.
    #[error("Gateway failure: {0}")]
    Gateway(#[from] GatewayError),
}

/// Result type alias for settlement operations.
pub type SettlementResult<T> = Result<T, SettlementError>;
