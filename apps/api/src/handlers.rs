//! # HTTP Handlers
//!
//! Thin adapters between axum and the settlement engine: extract, call,
//! map. No business logic lives here.
//!
//! ## Routes
//! ```text
//! POST /sales                  create sale (stock + initial payment + QR)
//! GET  /sales/:id              sale with lines and payments
//! POST /sales/:id/payments     record payment
//! POST /sales/:id/qr           generate QR for the outstanding balance
//! POST /sales/:id/cancel       cancel + restore stock
//! POST /checkouts              standalone QR checkout
//! GET  /checkouts/:id/status   poll checkout state
//! POST /callbacks/pagofacil    provider callback (always HTTP 200)
//! GET  /health                 liveness (db ping)
//! ```

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tienda_core::{CheckoutRequest, CreateSaleRequest, PaymentMethod};
use tienda_settlement::CallbackAck;

use crate::error::ApiResult;
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sales", post(create_sale))
        .route("/sales/:id", get(get_sale))
        .route("/sales/:id/payments", post(record_payment))
        .route("/sales/:id/qr", post(generate_qr))
        .route("/sales/:id/cancel", post(cancel_sale))
        .route("/checkouts", post(create_checkout))
        .route("/checkouts/:id/status", get(checkout_status))
        .route("/callbacks/pagofacil", post(provider_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Sales
// =============================================================================

async fn create_sale(
    State(state): State<AppState>,
    Json(req): Json<CreateSaleRequest>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state.engine.create_sale(req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let detail = state.engine.get_sale(&sale_id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
struct RecordPaymentBody {
    amount_cents: i64,
    method: PaymentMethod,
    #[serde(default)]
    reference: Option<String>,
}

async fn record_payment(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
    Json(body): Json<RecordPaymentBody>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .engine
        .record_payment(&sale_id, body.amount_cents, body.method, body.reference)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Default, Deserialize)]
struct GenerateQrBody {
    /// Defaults to the sale's outstanding balance.
    amount_cents: Option<i64>,
}

async fn generate_qr(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
    body: Option<Json<GenerateQrBody>>,
) -> ApiResult<impl IntoResponse> {
    let amount = body.and_then(|Json(b)| b.amount_cents);
    let outcome = state.engine.generate_qr(&sale_id, amount).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn cancel_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let sale = state.engine.cancel_sale(&sale_id).await?;
    Ok(Json(sale))
}

// =============================================================================
// Standalone Checkouts
// =============================================================================

async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    let checkout = state.engine.create_checkout(req).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

async fn checkout_status(
    State(state): State<AppState>,
    Path(checkout_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let checkout = state.engine.poll_checkout(&checkout_id).await?;
    Ok(Json(checkout))
}

// =============================================================================
// Provider Callback
// =============================================================================

/// Callback body as the provider sends it.
///
/// Lenient on purpose: `Estado` arrives as a number, a numeric string
/// or not at all depending on the provider's mood. Anything that is not
/// a readable status code becomes `None` and is treated as not-paid.
#[derive(Debug, Deserialize)]
struct CallbackPayload {
    #[serde(rename = "PedidoID")]
    order_ref: String,
    #[serde(rename = "Estado", default, deserialize_with = "lenient_status")]
    status: Option<i64>,
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// The one route outside the error mapping: whatever happens, the
/// provider gets HTTP 200 with the acknowledgment shape, so it never
/// retries a callback we already consumed. The body is read raw and
/// parsed by hand; a strict `Json` extractor would answer 4xx for a
/// malformed payload before this handler ran.
async fn provider_callback(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload: CallbackPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(%err, "Malformed provider callback body");
            return (StatusCode::OK, Json(CallbackAck::internal_fault()));
        }
    };

    info!(
        order_ref = %payload.order_ref,
        status = ?payload.status,
        "Provider callback received"
    );
    let ack = state
        .engine
        .handle_callback(&payload.order_ref, payload.status.unwrap_or(0))
        .await;
    (StatusCode::OK, Json(ack))
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
