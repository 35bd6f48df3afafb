//! HTTP error mapping.
//!
//! Settlement errors become status codes here; the callback route never
//! goes through this mapping (it always answers 200 with an ack body).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use tienda_core::CoreError;
use tienda_db::DbError;
use tienda_settlement::SettlementError;

/// Wrapper so settlement errors implement `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub SettlementError);

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError(err)
    }
}

/// Status code mapping:
/// validation → 400; unknown references → 404; business rule conflicts
/// (stock, cancelled, balance) → 422; gateway → 502; the rest → 500.
fn status_for(err: &SettlementError) -> StatusCode {
    match err {
        SettlementError::Core(core) => match core {
            CoreError::Validation(_)
            | CoreError::NonPositivePayment { .. }
            | CoreError::NonPositiveTotal { .. } => StatusCode::BAD_REQUEST,
            CoreError::ProductNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::CheckoutNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::ProductInactive { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::AlreadyCancelled { .. }
            | CoreError::PaymentExceedsBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        },
        SettlementError::Db(DbError::NotFound { .. }) => StatusCode::NOT_FOUND,
        SettlementError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SettlementError::Gateway(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(err = %self.0, "Internal error");
        }
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tienda_core::Money;

    #[test]
    fn test_status_mapping() {
        let err = SettlementError::Core(CoreError::SaleNotFound("x".into()));
        assert_eq!(status_for(&err), StatusCode::NOT_FOUND);

        let err = SettlementError::Core(CoreError::InsufficientStock {
            name: "Coca Cola 2L".into(),
            available: 1,
            requested: 2,
        });
        assert_eq!(status_for(&err), StatusCode::UNPROCESSABLE_ENTITY);

        let err = SettlementError::Core(CoreError::NonPositivePayment {
            amount: Money::from_cents(0),
        });
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);

        let err = SettlementError::Gateway(tienda_gateway::GatewayError::Timeout);
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);
    }
}
