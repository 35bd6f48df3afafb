//! Settlement engine integration tests.
//!
//! Run against an in-memory SQLite database and a scripted gateway, so
//! every test exercises the real transaction boundaries without touching
//! the network.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use tienda_core::{
    CheckoutRequest, CheckoutStatus, CoreError, CreateSaleRequest, PaymentMethod, PaymentStatus,
    Product, SaleKind, SaleLineRequest, SaleStatus,
};
use tienda_db::{Database, DbConfig};
use tienda_gateway::{GatewayError, GatewayResult, QrCreated, QrGateway, QrRequest, TransactionStatus};
use tienda_settlement::{EngineConfig, SettlementEngine, SettlementError};

// =============================================================================
// Scripted Gateway
// =============================================================================

/// Gateway double: QR creation can be scripted to fail, and the reported
/// payment status is settable per test.
struct ScriptedGateway {
    fail_qr: bool,
    payment_status: AtomicI64,
    counter: AtomicU64,
}

impl ScriptedGateway {
    fn new() -> Self {
        ScriptedGateway {
            fail_qr: false,
            payment_status: AtomicI64::new(1),
            counter: AtomicU64::new(0),
        }
    }

    fn failing() -> Self {
        ScriptedGateway {
            fail_qr: true,
            ..ScriptedGateway::new()
        }
    }

    fn set_paid(&self) {
        self.payment_status.store(2, Ordering::SeqCst);
    }
}

#[async_trait]
impl QrGateway for ScriptedGateway {
    async fn create_qr(&self, _request: &QrRequest) -> GatewayResult<QrCreated> {
        if self.fail_qr {
            return Err(GatewayError::Timeout);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(QrCreated {
            transaction_id: format!("PF-{n}"),
            qr_image: "aW1hZ2VuLXFy".to_string(),
            checkout_url: Some("https://pay.example/checkout".to_string()),
            expires_at: None,
        })
    }

    async fn query_transaction(&self, _provider_tx_id: &str) -> GatewayResult<TransactionStatus> {
        Ok(TransactionStatus {
            payment_status: self.payment_status.load(Ordering::SeqCst),
        })
    }
}

// =============================================================================
// Fixtures
// =============================================================================

async fn setup(gateway: Arc<ScriptedGateway>) -> (SettlementEngine, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let engine = SettlementEngine::new(db.clone(), gateway, EngineConfig::default());
    (engine, db)
}

async fn seed_product(db: &Database, id: &str, price_cents: i64, stock: i64) {
    let now = Utc::now();
    db.products()
        .insert(&Product {
            id: id.to_string(),
            code: format!("CODE-{id}"),
            name: format!("Product {id}"),
            price_cents,
            stock,
            min_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

fn sale_request(method: PaymentMethod, lines: Vec<SaleLineRequest>, discount: i64) -> CreateSaleRequest {
    CreateSaleRequest {
        customer_id: None,
        seller_id: "seller-1".to_string(),
        kind: SaleKind::Cash,
        method,
        discount_cents: discount,
        notes: None,
        lines,
    }
}

fn line(product_id: &str, quantity: i64, unit_price_cents: i64, discount_cents: i64) -> SaleLineRequest {
    SaleLineRequest {
        product_id: product_id.to_string(),
        quantity,
        unit_price_cents,
        discount_cents,
    }
}

// =============================================================================
// Sale Creation
// =============================================================================

/// Reference scenario: 2 lines (qty 3 @ 10.00, qty 1 @ 20.00 disc 5.00),
/// sale discount 2.00, paid cash → subtotal 45.00, total 43.00, PAID.
#[tokio::test]
async fn cash_sale_settles_immediately() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;
    seed_product(&db, "p2", 2000, 10).await;

    let receipt = engine
        .create_sale(sale_request(
            PaymentMethod::Cash,
            vec![line("p1", 3, 1000, 0), line("p2", 1, 2000, 500)],
            200,
        ))
        .await
        .unwrap();

    assert_eq!(receipt.sale.subtotal_cents, 4500);
    assert_eq!(receipt.sale.total_cents, 4300);
    assert_eq!(receipt.sale.status, SaleStatus::Paid);
    assert_eq!(receipt.lines.len(), 2);

    assert_eq!(receipt.payments.len(), 1);
    assert_eq!(receipt.payments[0].amount_cents, 4300);
    assert_eq!(receipt.payments[0].status, PaymentStatus::Completed);

    // Stock reserved
    assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 7);
    assert_eq!(db.products().get_by_id("p2").await.unwrap().unwrap().stock, 9);
}

#[tokio::test]
async fn transfer_sale_stays_pending() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Transfer, vec![line("p1", 2, 1000, 0)], 0))
        .await
        .unwrap();

    assert_eq!(receipt.sale.status, SaleStatus::Pending);
    assert_eq!(receipt.payments.len(), 1);
    assert_eq!(receipt.payments[0].status, PaymentStatus::Pending);
    assert_eq!(receipt.payments[0].method, PaymentMethod::Transfer);
}

#[tokio::test]
async fn insufficient_stock_leaves_nothing_behind() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;
    seed_product(&db, "p2", 500, 2).await;

    let err = engine
        .create_sale(sale_request(
            PaymentMethod::Cash,
            vec![line("p1", 1, 1000, 0), line("p2", 5, 500, 0)],
            0,
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SettlementError::Core(CoreError::InsufficientStock { requested: 5, .. })
    ));

    // Whole transaction rolled back: stock untouched, no sale row
    assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 10);
    assert_eq!(db.products().get_by_id("p2").await.unwrap().unwrap().stock, 2);
    let date_part = Utc::now().format("%Y%m%d").to_string();
    assert!(db
        .sales()
        .get_by_order_number(&format!("V-{date_part}-0001"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn unknown_product_rejected_before_any_write() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let err = engine
        .create_sale(sale_request(PaymentMethod::Cash, vec![line("ghost", 1, 1000, 0)], 0))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Core(CoreError::ProductNotFound(_))));
}

#[tokio::test]
async fn zero_total_rejected() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    // 1 × 10.00 with a 10.00 sale discount → total 0
    let err = engine
        .create_sale(sale_request(PaymentMethod::Cash, vec![line("p1", 1, 1000, 0)], 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Core(CoreError::NonPositiveTotal { .. })));
}

// =============================================================================
// QR Sales and Callback Reconciliation
// =============================================================================

#[tokio::test]
async fn qr_sale_settles_via_callback_idempotently() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 2500, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Qr, vec![line("p1", 4, 2500, 0)], 0))
        .await
        .unwrap();

    assert_eq!(receipt.sale.status, SaleStatus::Pending);
    assert_eq!(receipt.qr.as_ref().unwrap().transaction_id, "PF-1");
    assert_eq!(receipt.payments.len(), 1);
    assert_eq!(receipt.payments[0].status, PaymentStatus::Pending);
    assert_eq!(receipt.payments[0].reference.as_deref(), Some("PF-1"));

    // Provider confirms payment
    let ack = engine.handle_callback(&receipt.sale.order_number, 2).await;
    assert_eq!(ack.error, 0);
    assert!(ack.values);

    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Paid);
    assert_eq!(detail.payments.len(), 1);
    assert_eq!(detail.payments[0].status, PaymentStatus::Completed);
    assert!(detail.payments[0].paid_at.is_some());

    // Duplicate delivery: acknowledged, nothing double-credited
    let ack = engine.handle_callback(&receipt.sale.order_number, 2).await;
    assert_eq!(ack.error, 0);

    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Paid);
    assert_eq!(detail.payments.len(), 1);
}

#[tokio::test]
async fn concurrent_duplicate_callbacks_complete_one_payment() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 10000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Qr, vec![line("p1", 1, 10000, 0)], 0))
        .await
        .unwrap();
    let order = receipt.sale.order_number.clone();

    let (a, b) = tokio::join!(
        engine.handle_callback(&order, 2),
        engine.handle_callback(&order, 2)
    );
    assert_eq!(a.error, 0);
    assert_eq!(b.error, 0);

    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Paid);
    let completed = detail
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .count();
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn gateway_failure_still_commits_the_sale() {
    let gateway = Arc::new(ScriptedGateway::failing());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Qr, vec![line("p1", 2, 1000, 0)], 0))
        .await
        .unwrap();

    assert_eq!(receipt.sale.status, SaleStatus::Pending);
    assert!(receipt.qr.is_none());
    assert!(receipt.qr_error.is_some());
    assert!(receipt.payments.is_empty());

    // Sale and stock reservation are durable despite the gateway failure
    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.total_cents, 2000);
    assert!(detail.payments.is_empty());
    assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 8);
}

#[tokio::test]
async fn unknown_callback_reference_is_acknowledged() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, _db) = setup(gateway).await;

    let ack = engine.handle_callback("V-20260830-9999", 2).await;
    assert_eq!(ack.error, 0);
    assert!(!ack.values);
}

#[tokio::test]
async fn non_paid_status_is_acknowledged_without_changes() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Qr, vec![line("p1", 1, 1000, 0)], 0))
        .await
        .unwrap();

    let ack = engine.handle_callback(&receipt.sale.order_number, 1).await;
    assert_eq!(ack.error, 0);
    assert!(!ack.values);

    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Pending);
    assert_eq!(detail.payments[0].status, PaymentStatus::Pending);
}

// =============================================================================
// Payment Recording
// =============================================================================

#[tokio::test]
async fn record_payment_boundaries() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 10000, 10).await;

    // Transfer sale: the pending payment does not count toward settlement
    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Transfer, vec![line("p1", 1, 10000, 0)], 0))
        .await
        .unwrap();
    let sale_id = receipt.sale.id.clone();

    // Zero and negative amounts rejected
    let err = engine
        .record_payment(&sale_id, 0, PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Core(CoreError::NonPositivePayment { .. })));

    // Partial cash payment accepted, sale still pending
    let outcome = engine
        .record_payment(&sale_id, 4000, PaymentMethod::Cash, None)
        .await
        .unwrap();
    assert_eq!(outcome.payment.status, PaymentStatus::Completed);
    assert_eq!(outcome.sale.status, SaleStatus::Pending);

    // One cent over the outstanding balance rejected
    let err = engine
        .record_payment(&sale_id, 6001, PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SettlementError::Core(CoreError::PaymentExceedsBalance { .. })
    ));

    // Exactly the outstanding balance settles the sale
    let outcome = engine
        .record_payment(&sale_id, 6000, PaymentMethod::Cash, None)
        .await
        .unwrap();
    assert_eq!(outcome.sale.status, SaleStatus::Paid);

    // Fully paid: nothing further can be recorded
    let err = engine
        .record_payment(&sale_id, 1, PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SettlementError::Core(CoreError::PaymentExceedsBalance { .. })
    ));
}

#[tokio::test]
async fn record_payment_on_cancelled_sale_rejected() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Transfer, vec![line("p1", 1, 1000, 0)], 0))
        .await
        .unwrap();
    engine.cancel_sale(&receipt.sale.id).await.unwrap();

    let err = engine
        .record_payment(&receipt.sale.id, 1000, PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Core(CoreError::AlreadyCancelled { .. })));
}

// =============================================================================
// QR Generation for Existing Sales
// =============================================================================

#[tokio::test]
async fn generate_qr_defaults_to_outstanding_balance() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 10000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Transfer, vec![line("p1", 1, 10000, 0)], 0))
        .await
        .unwrap();
    engine
        .record_payment(&receipt.sale.id, 3000, PaymentMethod::Cash, None)
        .await
        .unwrap();

    let outcome = engine.generate_qr(&receipt.sale.id, None).await.unwrap();
    assert_eq!(outcome.payment.amount_cents, 7000);
    assert_eq!(outcome.payment.method, PaymentMethod::Qr);
    assert_eq!(outcome.payment.reference.as_deref(), Some(outcome.qr.transaction_id.as_str()));

    // Callback completes the QR payment and settles the sale
    let ack = engine.handle_callback(&receipt.sale.order_number, 2).await;
    assert_eq!(ack.error, 0);
    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Paid);
}

#[tokio::test]
async fn generate_qr_on_settled_sale_rejected() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Cash, vec![line("p1", 1, 1000, 0)], 0))
        .await
        .unwrap();

    // Outstanding balance is zero
    let err = engine.generate_qr(&receipt.sale.id, None).await.unwrap_err();
    assert!(matches!(err, SettlementError::Core(CoreError::NonPositivePayment { .. })));
}

#[tokio::test]
async fn generate_qr_gateway_failure_leaves_sale_untouched() {
    let gateway = Arc::new(ScriptedGateway::failing());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Transfer, vec![line("p1", 1, 1000, 0)], 0))
        .await
        .unwrap();

    let err = engine.generate_qr(&receipt.sale.id, None).await.unwrap_err();
    assert!(matches!(err, SettlementError::Gateway(_)));

    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    // Only the original transfer payment; no QR payment row persisted
    assert_eq!(detail.payments.len(), 1);
    assert_eq!(detail.payments[0].method, PaymentMethod::Transfer);
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test]
async fn poll_sale_qr_settles_when_provider_reports_paid() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway.clone()).await;
    seed_product(&db, "p1", 5000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Qr, vec![line("p1", 1, 5000, 0)], 0))
        .await
        .unwrap();

    // Provider not yet paid
    let detail = engine.poll_sale_qr(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Pending);

    gateway.set_paid();
    let detail = engine.poll_sale_qr(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Paid);
    assert_eq!(detail.payments[0].status, PaymentStatus::Completed);

    // Settled sale polls return cached state, no further changes
    let detail = engine.poll_sale_qr(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Paid);
    assert_eq!(detail.payments.len(), 1);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn cancel_restores_stock_and_is_not_repeatable() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, db) = setup(gateway).await;
    seed_product(&db, "p1", 1000, 10).await;

    let receipt = engine
        .create_sale(sale_request(PaymentMethod::Transfer, vec![line("p1", 5, 1000, 0)], 0))
        .await
        .unwrap();
    assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 5);

    let sale = engine.cancel_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(sale.status, SaleStatus::Cancelled);
    assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 10);

    // Payments are untouched by cancellation
    let detail = engine.get_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(detail.payments.len(), 1);

    let err = engine.cancel_sale(&receipt.sale.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::Core(CoreError::AlreadyCancelled { .. })));
}

// =============================================================================
// Standalone Checkouts
// =============================================================================

fn checkout_request(amount_cents: i64) -> CheckoutRequest {
    CheckoutRequest {
        customer_name: "Maria Lopez".to_string(),
        email: "maria@example.com".to_string(),
        phone: "70000000".to_string(),
        amount_cents,
        order_detail: serde_json::json!([{"product": "Coca Cola 2L", "quantity": 2}]),
    }
}

#[tokio::test]
async fn checkout_settles_via_callback() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, _db) = setup(gateway).await;

    let checkout = engine.create_checkout(checkout_request(5000)).await.unwrap();
    assert_eq!(checkout.status, CheckoutStatus::Pending);
    assert!(checkout.order_number.starts_with("ORD-"));
    assert_eq!(checkout.provider_tx_id.as_deref(), Some("PF-1"));
    assert!(checkout.qr_image.is_some());

    let ack = engine.handle_callback(&checkout.order_number, 2).await;
    assert_eq!(ack.error, 0);
    assert!(ack.values);

    let checkout = engine.get_checkout(&checkout.id).await.unwrap();
    assert_eq!(checkout.status, CheckoutStatus::Paid);
    assert!(checkout.paid_at.is_some());

    // Duplicate callback still acknowledged
    let ack = engine.handle_callback(&checkout.order_number, 2).await;
    assert_eq!(ack.error, 0);
}

#[tokio::test]
async fn checkout_settles_via_poll() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, _db) = setup(gateway.clone()).await;

    let checkout = engine.create_checkout(checkout_request(5000)).await.unwrap();

    let polled = engine.poll_checkout(&checkout.id).await.unwrap();
    assert_eq!(polled.status, CheckoutStatus::Pending);

    gateway.set_paid();
    let polled = engine.poll_checkout(&checkout.id).await.unwrap();
    assert_eq!(polled.status, CheckoutStatus::Paid);
}

#[tokio::test]
async fn checkout_gateway_failure_surfaces() {
    let gateway = Arc::new(ScriptedGateway::failing());
    let (engine, _db) = setup(gateway).await;

    let err = engine.create_checkout(checkout_request(5000)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Gateway(_)));
}

#[tokio::test]
async fn checkout_validation_rejects_bad_input() {
    let gateway = Arc::new(ScriptedGateway::new());
    let (engine, _db) = setup(gateway).await;

    let err = engine.create_checkout(checkout_request(0)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Core(CoreError::Validation(_))));
}
