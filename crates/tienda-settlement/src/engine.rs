//! # Settlement Engine
//!
//! Orchestrates sale creation, payment collection, provider callback
//! reconciliation and cancellation over the database and the QR gateway.
//!
//! ## Transaction Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  create_sale      [tx: number + sale + lines + stock + payment]     │
//! │                   then, QR method only: gateway call + [tx: payment]│
//! │  record_payment   [tx: balance guard + payment + PAID check]        │
//! │  generate_qr      gateway call, then [tx: pending payment]          │
//! │  handle_callback  [tx: FIFO match + complete + PAID check]          │
//! │  poll_sale_qr     gateway query, then the callback's completion tx  │
//! │  cancel_sale      [tx: stock release per line + CANCELLED]          │
//! │  create_checkout  insert, gateway call, then provider fields        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! The brackets are single SQLite write transactions; the gateway is
//! never called while one is open.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tienda_core::validation::{validate_checkout, validate_create_sale};
use tienda_core::{
    compute_totals, is_settled, line_subtotal, outstanding_cents, CheckoutRequest, CheckoutStatus,
    CoreError, CreateSaleRequest, Money, Payment, PaymentMethod, PaymentStatus, Product, QrCheckout,
    Sale, SaleLine, SaleStatus,
};
use tienda_db::repository::checkout::generate_checkout_id;
use tienda_db::repository::payment::generate_payment_id;
use tienda_db::repository::sale::{generate_line_id, generate_sale_id};
use tienda_db::Database;
use tienda_gateway::{QrGateway, QrRequest, PROVIDER_STATUS_PAID};

use crate::error::SettlementResult;
use crate::receipt::{CallbackAck, PaymentOutcome, QrOutcome, SaleDetail, SaleReceipt};

// =============================================================================
// Engine Configuration
// =============================================================================

/// Store contact data sent to the provider for sale-linked QR requests.
///
/// Sale-linked QRs carry the store's contact (the provider requires one
/// and walk-in sales have no customer record); standalone checkouts carry
/// the customer's own.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub store_name: String,
    pub store_email: String,
    pub store_phone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            store_name: "Tienda POS".to_string(),
            store_email: "ventas@tienda.local".to_string(),
            store_phone: "00000000".to_string(),
        }
    }
}

// =============================================================================
// Settlement Engine
// =============================================================================

/// The settlement state machine.
///
/// Cheap to clone (`Database` is a pool handle, the gateway is shared);
/// one instance serves all requests.
#[derive(Clone)]
pub struct SettlementEngine {
    db: Database,
    gateway: Arc<dyn QrGateway>,
    config: EngineConfig,
}

impl SettlementEngine {
    /// Creates a new engine.
    pub fn new(db: Database, gateway: Arc<dyn QrGateway>, config: EngineConfig) -> Self {
        SettlementEngine {
            db,
            gateway,
            config,
        }
    }

    // =========================================================================
    // Sale Creation
    // =========================================================================

    /// Creates a sale: lines, stock reservation and the initial payment,
    /// all in one transaction.
    ///
    /// ## Method Dispatch
    /// - **Cash**: payment completed on the spot, sale committed PAID.
    /// - **Transfer**: pending payment for the total, confirmed later.
    /// - **QR**: the sale commits first; the gateway is called after the
    ///   commit and a pending payment is persisted only if it succeeds.
    ///   A gateway failure is reported on the receipt, never rolls the
    ///   sale back.
    pub async fn create_sale(&self, req: CreateSaleRequest) -> SettlementResult<SaleReceipt> {
        validate_create_sale(&req).map_err(CoreError::from)?;

        // Resolve products up front. Existence and active checks happen
        // here; the conditional stock update inside the transaction stays
        // the authoritative guard against overselling.
        let products = self.db.products();
        let mut catalog: HashMap<String, Product> = HashMap::new();
        for line in &req.lines {
            if catalog.contains_key(&line.product_id) {
                continue;
            }
            let product = products
                .get_by_id(&line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            if !product.is_active {
                return Err(CoreError::ProductInactive { code: product.code }.into());
            }
            catalog.insert(line.product_id.clone(), product);
        }

        let totals = compute_totals(&req.lines, Money::from_cents(req.discount_cents));
        if !totals.total.is_positive() {
            return Err(CoreError::NonPositiveTotal {
                total: totals.total,
            }
            .into());
        }

        let now = Utc::now();
        let sales = self.db.sales();
        let payments = self.db.payments();

        let mut tx = self.db.begin().await?;

        let order_number = sales.next_order_number(&mut tx, now).await?;
        let mut sale = Sale {
            id: generate_sale_id(),
            order_number,
            customer_id: req.customer_id.clone(),
            seller_id: req.seller_id.clone(),
            kind: req.kind,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            status: SaleStatus::Pending,
            notes: req.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        sales.insert(&mut tx, &sale).await?;

        let mut lines = Vec::with_capacity(req.lines.len());
        for line_req in &req.lines {
            let product = &catalog[&line_req.product_id];
            let reserved = products
                .reserve_stock(&mut tx, &line_req.product_id, line_req.quantity)
                .await?;
            if !reserved {
                // Dropping the transaction rolls everything back.
                return Err(CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.stock,
                    requested: line_req.quantity,
                }
                .into());
            }

            let line = SaleLine {
                id: generate_line_id(),
                sale_id: sale.id.clone(),
                product_id: line_req.product_id.clone(),
                quantity: line_req.quantity,
                unit_price_cents: line_req.unit_price_cents,
                discount_cents: line_req.discount_cents,
                subtotal_cents: line_subtotal(
                    line_req.quantity,
                    Money::from_cents(line_req.unit_price_cents),
                    Money::from_cents(line_req.discount_cents),
                )
                .cents(),
                created_at: now,
            };
            sales.insert_line(&mut tx, &line).await?;
            lines.push(line);
        }

        let mut initial_payments = Vec::new();
        match req.method {
            PaymentMethod::Cash => {
                let payment = Payment {
                    id: generate_payment_id(),
                    sale_id: sale.id.clone(),
                    amount_cents: sale.total_cents,
                    method: PaymentMethod::Cash,
                    reference: None,
                    status: PaymentStatus::Completed,
                    paid_at: Some(now),
                    created_at: now,
                };
                payments.insert(&mut tx, &payment).await?;
                sales.set_status(&mut tx, &sale.id, SaleStatus::Paid).await?;
                sale.status = SaleStatus::Paid;
                initial_payments.push(payment);
            }
            PaymentMethod::Transfer => {
                let payment = Payment {
                    id: generate_payment_id(),
                    sale_id: sale.id.clone(),
                    amount_cents: sale.total_cents,
                    method: PaymentMethod::Transfer,
                    reference: None,
                    status: PaymentStatus::Pending,
                    paid_at: None,
                    created_at: now,
                };
                payments.insert(&mut tx, &payment).await?;
                initial_payments.push(payment);
            }
            // QR is handled after the commit; no payment row yet.
            PaymentMethod::Qr => {}
        }

        self.db.commit(tx).await?;

        info!(
            order_number = %sale.order_number,
            total_cents = sale.total_cents,
            method = ?req.method,
            status = ?sale.status,
            "Sale created"
        );

        let mut receipt = SaleReceipt {
            sale,
            lines,
            payments: initial_payments,
            qr: None,
            qr_error: None,
        };

        if req.method == PaymentMethod::Qr {
            match self.attach_qr(&receipt.sale, &receipt.lines, &catalog).await {
                Ok(outcome) => {
                    receipt.payments.push(outcome.payment);
                    receipt.qr = Some(outcome.qr);
                }
                Err(err) => {
                    warn!(
                        order_number = %receipt.sale.order_number,
                        %err,
                        "QR generation failed; sale committed without payment"
                    );
                    receipt.qr_error = Some(err.to_string());
                }
            }
        }

        Ok(receipt)
    }

    /// Requests a QR for the sale total and persists the pending payment.
    async fn attach_qr(
        &self,
        sale: &Sale,
        lines: &[SaleLine],
        catalog: &HashMap<String, Product>,
    ) -> SettlementResult<QrOutcome> {
        let manifest = lines
            .iter()
            .map(|line| {
                let name = catalog
                    .get(&line.product_id)
                    .map(|p| p.name.as_str())
                    .unwrap_or(line.product_id.as_str());
                serde_json::json!({
                    "product": name,
                    "quantity": line.quantity,
                    "unit_price_cents": line.unit_price_cents,
                })
            })
            .collect::<Vec<_>>();

        self.persist_qr_payment(sale, sale.total_cents, serde_json::Value::Array(manifest))
            .await
    }

    /// Gateway call plus the pending-payment insert, in that order.
    ///
    /// The payment row exists only when the provider accepted the request,
    /// so every pending QR payment carries a provider transaction id.
    async fn persist_qr_payment(
        &self,
        sale: &Sale,
        amount_cents: i64,
        order_detail: serde_json::Value,
    ) -> SettlementResult<QrOutcome> {
        let request = QrRequest {
            order_number: sale.order_number.clone(),
            amount_cents,
            customer_name: self.config.store_name.clone(),
            email: self.config.store_email.clone(),
            phone: self.config.store_phone.clone(),
            order_detail,
        };

        let qr = self.gateway.create_qr(&request).await?;

        let now = Utc::now();
        let payment = Payment {
            id: generate_payment_id(),
            sale_id: sale.id.clone(),
            amount_cents,
            method: PaymentMethod::Qr,
            reference: Some(qr.transaction_id.clone()),
            status: PaymentStatus::Pending,
            paid_at: None,
            created_at: now,
        };

        let mut tx = self.db.begin().await?;
        self.db.payments().insert(&mut tx, &payment).await?;
        self.db.commit(tx).await?;

        info!(
            order_number = %sale.order_number,
            transaction_id = %qr.transaction_id,
            amount_cents,
            "Pending QR payment persisted"
        );

        Ok(QrOutcome { payment, qr })
    }

    // =========================================================================
    // Payment Recording
    // =========================================================================

    /// Records a payment against a sale.
    ///
    /// The balance guard and the PAID re-check run inside one write
    /// transaction, so two concurrent completions cannot both slip past
    /// the outstanding balance or both skip the transition.
    pub async fn record_payment(
        &self,
        sale_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> SettlementResult<PaymentOutcome> {
        let sales = self.db.sales();
        let payments = self.db.payments();

        let mut tx = self.db.begin().await?;

        let mut sale = sales
            .get_by_id_in(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if sale.status == SaleStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled {
                order_number: sale.order_number,
            }
            .into());
        }

        if amount_cents <= 0 {
            return Err(CoreError::NonPositivePayment {
                amount: Money::from_cents(amount_cents),
            }
            .into());
        }

        let completed = payments.completed_total_in(&mut tx, sale_id).await?;
        let outstanding = outstanding_cents(sale.total_cents, completed);
        if amount_cents > outstanding {
            return Err(CoreError::PaymentExceedsBalance {
                requested: Money::from_cents(amount_cents),
                outstanding: Money::from_cents(outstanding),
            }
            .into());
        }

        let now = Utc::now();
        let settles = method.settles_immediately();
        let payment = Payment {
            id: generate_payment_id(),
            sale_id: sale_id.to_string(),
            amount_cents,
            method,
            reference,
            status: if settles {
                PaymentStatus::Completed
            } else {
                PaymentStatus::Pending
            },
            paid_at: settles.then_some(now),
            created_at: now,
        };
        payments.insert(&mut tx, &payment).await?;

        if settles && is_settled(sale.total_cents, completed + amount_cents) {
            sales.set_status(&mut tx, sale_id, SaleStatus::Paid).await?;
            sale.status = SaleStatus::Paid;
        }

        self.db.commit(tx).await?;

        debug!(
            sale_id,
            amount_cents,
            method = ?method,
            sale_status = ?sale.status,
            "Payment recorded"
        );

        Ok(PaymentOutcome { payment, sale })
    }

    // =========================================================================
    // QR Generation
    // =========================================================================

    /// Generates a QR for an existing sale.
    ///
    /// The amount defaults to the outstanding balance. On gateway failure
    /// the error surfaces and the sale is untouched.
    pub async fn generate_qr(
        &self,
        sale_id: &str,
        amount_cents: Option<i64>,
    ) -> SettlementResult<QrOutcome> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if sale.status == SaleStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled {
                order_number: sale.order_number,
            }
            .into());
        }

        let all_payments = self.db.payments().list_for_sale(sale_id).await?;
        let completed = tienda_core::completed_total(&all_payments).cents();
        let amount = amount_cents.unwrap_or_else(|| outstanding_cents(sale.total_cents, completed));
        if amount <= 0 {
            return Err(CoreError::NonPositivePayment {
                amount: Money::from_cents(amount),
            }
            .into());
        }

        let lines = self.db.sales().get_lines(sale_id).await?;
        let manifest = lines
            .iter()
            .map(|line| {
                serde_json::json!({
                    "product": line.product_id,
                    "quantity": line.quantity,
                    "unit_price_cents": line.unit_price_cents,
                })
            })
            .collect::<Vec<_>>();

        self.persist_qr_payment(&sale, amount, serde_json::Value::Array(manifest))
            .await
    }

    // =========================================================================
    // Callback Reconciliation
    // =========================================================================

    /// Handles a provider callback. Never fails: internal faults are
    /// logged and folded into the acknowledgment.
    pub async fn handle_callback(&self, order_ref: &str, status_code: i64) -> CallbackAck {
        match self.reconcile(order_ref, status_code).await {
            Ok(ack) => ack,
            Err(err) => {
                error!(order_ref, status_code, %err, "Callback reconciliation failed");
                CallbackAck::internal_fault()
            }
        }
    }

    async fn reconcile(&self, order_ref: &str, status_code: i64) -> SettlementResult<CallbackAck> {
        if status_code != PROVIDER_STATUS_PAID {
            debug!(order_ref, status_code, "Callback without paid status, acknowledging");
            return Ok(CallbackAck::ignored(status_code));
        }

        if let Some(sale) = self.db.sales().get_by_order_number(order_ref).await? {
            return self.settle_sale_qr(&sale).await;
        }

        // Not a sale: try the standalone checkout flow.
        if let Some(checkout) = self.db.checkouts().get_by_order_number(order_ref).await? {
            let transitioned = self.db.checkouts().mark_paid(&checkout.id, Utc::now()).await?;
            info!(
                order_ref,
                transitioned, "Standalone checkout callback processed"
            );
            return Ok(if transitioned {
                CallbackAck::applied()
            } else {
                CallbackAck::duplicate()
            });
        }

        warn!(order_ref, "Callback for unknown order reference");
        Ok(CallbackAck::unknown(order_ref))
    }

    /// Completes the oldest pending QR payment on a sale and re-runs the
    /// PAID check, all in one transaction.
    ///
    /// FIFO matching: with several open QR attempts on one sale, a
    /// confirmation settles the earliest. Idempotent: with nothing
    /// pending (duplicate delivery) it changes nothing and still
    /// acknowledges success.
    async fn settle_sale_qr(&self, sale: &Sale) -> SettlementResult<CallbackAck> {
        let sales = self.db.sales();
        let payments = self.db.payments();

        let mut tx = self.db.begin().await?;

        let pending = payments
            .find_oldest_pending_in(&mut tx, &sale.id, PaymentMethod::Qr)
            .await?;
        let Some(payment) = pending else {
            debug!(order_number = %sale.order_number, "No pending QR payment, duplicate callback");
            return Ok(CallbackAck::duplicate());
        };

        payments.mark_completed(&mut tx, &payment.id, Utc::now()).await?;

        let completed = payments.completed_total_in(&mut tx, &sale.id).await?;
        if is_settled(sale.total_cents, completed) {
            // Re-read inside the transaction: the snapshot we were handed
            // may predate another completion.
            if let Some(current) = sales.get_by_id_in(&mut tx, &sale.id).await? {
                if current.status == SaleStatus::Pending {
                    sales.set_status(&mut tx, &sale.id, SaleStatus::Paid).await?;
                }
            }
        }

        self.db.commit(tx).await?;

        info!(
            order_number = %sale.order_number,
            payment_id = %payment.id,
            "QR payment completed via callback"
        );
        Ok(CallbackAck::applied())
    }

    // =========================================================================
    // Active Status Polls
    // =========================================================================

    /// Polls the provider for a sale's open QR payment.
    ///
    /// Fallback for delayed or missed callbacks: settled sales return
    /// cached state; otherwise the oldest pending QR payment with a
    /// provider reference is queried and, if paid, completed exactly like
    /// a callback.
    pub async fn poll_sale_qr(&self, sale_id: &str) -> SettlementResult<SaleDetail> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if sale.status != SaleStatus::Pending {
            return self.get_sale(sale_id).await;
        }

        let open_qr = self
            .db
            .payments()
            .list_for_sale(sale_id)
            .await?
            .into_iter()
            .find(|p| {
                p.method == PaymentMethod::Qr
                    && p.status == PaymentStatus::Pending
                    && p.reference.is_some()
            });

        if let Some(payment) = open_qr {
            // Pending QR payments always carry a reference; the filter
            // above makes this infallible.
            if let Some(reference) = payment.reference.as_deref() {
                let status = self.gateway.query_transaction(reference).await?;
                if status.is_paid() {
                    info!(sale_id, reference, "Poll found paid transaction");
                    self.settle_sale_qr(&sale).await?;
                }
            }
        }

        self.get_sale(sale_id).await
    }

    /// Polls the provider for a standalone checkout.
    pub async fn poll_checkout(&self, checkout_id: &str) -> SettlementResult<QrCheckout> {
        let checkout = self
            .db
            .checkouts()
            .get_by_id(checkout_id)
            .await?
            .ok_or_else(|| CoreError::CheckoutNotFound(checkout_id.to_string()))?;

        if checkout.status != CheckoutStatus::Pending {
            return Ok(checkout);
        }
        let Some(provider_tx_id) = checkout.provider_tx_id.as_deref() else {
            // QR generation never succeeded; nothing to ask the provider.
            return Ok(checkout);
        };

        let status = self.gateway.query_transaction(provider_tx_id).await?;
        if status.is_paid() {
            self.db.checkouts().mark_paid(&checkout.id, Utc::now()).await?;
            info!(checkout_id, provider_tx_id, "Checkout settled via poll");
            return self
                .db
                .checkouts()
                .get_by_id(checkout_id)
                .await?
                .ok_or_else(|| CoreError::CheckoutNotFound(checkout_id.to_string()).into());
        }

        Ok(checkout)
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Cancels a sale, restoring stock for every line.
    ///
    /// Payments are left untouched; financial reversal is a manual
    /// process.
    pub async fn cancel_sale(&self, sale_id: &str) -> SettlementResult<Sale> {
        let sales = self.db.sales();
        let products = self.db.products();

        let mut tx = self.db.begin().await?;

        let mut sale = sales
            .get_by_id_in(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if sale.status == SaleStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled {
                order_number: sale.order_number,
            }
            .into());
        }

        let lines = sales.get_lines_in(&mut tx, sale_id).await?;
        for line in &lines {
            products
                .release_stock(&mut tx, &line.product_id, line.quantity)
                .await?;
        }
        sales.set_status(&mut tx, sale_id, SaleStatus::Cancelled).await?;
        sale.status = SaleStatus::Cancelled;

        self.db.commit(tx).await?;

        info!(
            order_number = %sale.order_number,
            restored_lines = lines.len(),
            "Sale cancelled, stock restored"
        );
        Ok(sale)
    }

    // =========================================================================
    // Standalone Checkout
    // =========================================================================

    /// Opens a standalone QR checkout (payment without a sale).
    ///
    /// The pending row is persisted first so the provider callback always
    /// has something to match; a gateway failure marks it `error` and
    /// surfaces to the caller.
    pub async fn create_checkout(&self, req: CheckoutRequest) -> SettlementResult<QrCheckout> {
        validate_checkout(&req).map_err(CoreError::from)?;

        let now = Utc::now();
        let order_number = generate_checkout_order_number();
        let checkout = QrCheckout {
            id: generate_checkout_id(),
            order_number: order_number.clone(),
            customer_name: req.customer_name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            amount_cents: req.amount_cents,
            status: CheckoutStatus::Pending,
            provider_tx_id: None,
            qr_image: None,
            checkout_url: None,
            order_detail: req.order_detail.to_string(),
            expires_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        self.db.checkouts().insert(&checkout).await?;

        let request = QrRequest {
            order_number: order_number.clone(),
            amount_cents: req.amount_cents,
            customer_name: req.customer_name,
            email: req.email,
            phone: req.phone,
            order_detail: req.order_detail,
        };

        let qr = match self.gateway.create_qr(&request).await {
            Ok(qr) => qr,
            Err(err) => {
                warn!(order_number = %order_number, %err, "Checkout QR generation failed");
                self.db.checkouts().mark_error(&checkout.id).await?;
                return Err(err.into());
            }
        };

        self.db
            .checkouts()
            .set_provider_details(
                &checkout.id,
                &qr.transaction_id,
                &qr.qr_image,
                qr.checkout_url.as_deref(),
                qr.expires_at,
            )
            .await?;

        info!(
            order_number = %order_number,
            transaction_id = %qr.transaction_id,
            amount_cents = req.amount_cents,
            "Checkout opened"
        );

        self.db
            .checkouts()
            .get_by_id(&checkout.id)
            .await?
            .ok_or_else(|| CoreError::CheckoutNotFound(checkout.id.clone()).into())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns a sale with its lines and payments.
    pub async fn get_sale(&self, sale_id: &str) -> SettlementResult<SaleDetail> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let lines = self.db.sales().get_lines(sale_id).await?;
        let payments = self.db.payments().list_for_sale(sale_id).await?;
        Ok(SaleDetail {
            sale,
            lines,
            payments,
        })
    }

    /// Returns a standalone checkout.
    pub async fn get_checkout(&self, checkout_id: &str) -> SettlementResult<QrCheckout> {
        self.db
            .checkouts()
            .get_by_id(checkout_id)
            .await?
            .ok_or_else(|| CoreError::CheckoutNotFound(checkout_id.to_string()).into())
    }
}

/// Provider-facing order reference for standalone checkouts,
/// e.g. `ORD-1724980000-3f9a2c`.
fn generate_checkout_order_number() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_string();
    format!("ORD-{}-{}", Utc::now().timestamp(), suffix)
}
