//! # QR Gateway Client
//!
//! The [`QrGateway`] trait is the seam the settlement engine depends on;
//! [`HttpQrGateway`] is the production implementation over reqwest.
//!
//! ## Retry Discipline
//! Exactly one retry, and only for an invalidated token: if the provider
//! answers 401 the cached session is dropped, a fresh login is performed
//! and the request is sent once more. Transport failures and provider
//! rejections are never retried here; the callers decide what a failed
//! QR means for the sale they are building.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::session::Session;
use crate::types::{
    cents_to_decimal, parse_expiration, Envelope, GenerateQrBody, GenerateQrValues, LoginValues,
    QrCreated, QrRequest, QueryTransactionBody, QueryTransactionValues, TransactionStatus,
    CURRENCY_LOCAL, PAYMENT_METHOD_QR,
};

/// The payment provider boundary.
///
/// Implemented by [`HttpQrGateway`] in production and by scripted mocks
/// in settlement tests.
#[async_trait]
pub trait QrGateway: Send + Sync {
    /// Generates a payment QR for the given order.
    async fn create_qr(&self, request: &QrRequest) -> GatewayResult<QrCreated>;

    /// Queries the provider for the current state of a transaction.
    async fn query_transaction(&self, provider_tx_id: &str) -> GatewayResult<TransactionStatus>;
}

/// HTTP implementation of [`QrGateway`].
pub struct HttpQrGateway {
    config: GatewayConfig,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
}

impl HttpQrGateway {
    /// Creates a new gateway client.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpQrGateway {
            config,
            http,
            session: RwLock::new(None),
        })
    }

    /// Returns a valid access token, logging in if needed.
    async fn access_token(&self) -> GatewayResult<String> {
        {
            let guard = self.session.read().await;
            if let Some(session) = guard.as_ref() {
                if !session.needs_refresh() {
                    debug!(remaining_secs = session.remaining_secs(), "Using cached provider session");
                    return Ok(session.access_token.clone());
                }
            }
        }

        let mut guard = self.session.write().await;
        // Double-check after acquiring write lock
        if let Some(session) = guard.as_ref() {
            if !session.needs_refresh() {
                return Ok(session.access_token.clone());
            }
        }

        let session = self.login().await?;
        let token = session.access_token.clone();
        *guard = Some(session);
        Ok(token)
    }

    /// Drops the cached session so the next request logs in again.
    async fn invalidate_session(&self) {
        *self.session.write().await = None;
    }

    /// Logs in with the configured service credentials.
    async fn login(&self) -> GatewayResult<Session> {
        debug!(url = %self.config.endpoint("login"), "Authenticating with provider");

        let response = self
            .http
            .post(self.config.endpoint("login"))
            .timeout(self.config.auth_timeout)
            .header("tcTokenService", &self.config.token_service)
            .header("tcTokenSecret", &self.config.token_secret)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Auth(format!(
                "login answered HTTP {}",
                response.status()
            )));
        }

        let envelope: Envelope<LoginValues> = response.json().await?;
        if envelope.error != 0 {
            return Err(GatewayError::Auth(envelope.message));
        }
        let values = envelope
            .values
            .ok_or_else(|| GatewayError::InvalidResponse("login envelope without values".into()))?;

        info!("Authenticated with payment provider");
        Ok(Session::new(values.access_token, self.config.token_ttl))
    }

    /// Sends an authorized POST, re-authenticating once on 401.
    async fn post_authorized<B, V>(&self, path: &str, body: &B) -> GatewayResult<V>
    where
        B: Serialize + Sync,
        V: DeserializeOwned,
    {
        let token = self.access_token().await?;
        let url = self.config.endpoint(path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Provider rejected token, re-authenticating");
            self.invalidate_session().await;
            let token = self.access_token().await?;
            self.http
                .post(&url)
                .bearer_auth(&token)
                .json(body)
                .send()
                .await?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(GatewayError::Provider {
                message: format!("{path} answered HTTP {}", response.status()),
            });
        }

        let envelope: Envelope<V> = response.json().await?;
        if envelope.error != 0 {
            return Err(GatewayError::Provider {
                message: envelope.message,
            });
        }
        envelope
            .values
            .ok_or_else(|| GatewayError::InvalidResponse(format!("{path} envelope without values")))
    }
}

#[async_trait]
impl QrGateway for HttpQrGateway {
    async fn create_qr(&self, request: &QrRequest) -> GatewayResult<QrCreated> {
        debug!(
            order_number = %request.order_number,
            amount_cents = request.amount_cents,
            "Requesting QR generation"
        );

        let body = GenerateQrBody {
            payment_method: PAYMENT_METHOD_QR,
            client_name: request.customer_name.clone(),
            phone_number: request.phone.clone(),
            email: request.email.clone(),
            payment_number: request.order_number.clone(),
            amount: cents_to_decimal(request.amount_cents),
            currency: CURRENCY_LOCAL,
            client_code: self.config.client_code.clone(),
            callback_url: self.config.callback_url.clone(),
            order_detail: request.order_detail.clone(),
        };

        let values: GenerateQrValues = self.post_authorized("generate-qr", &body).await?;

        info!(
            order_number = %request.order_number,
            transaction_id = %values.transaction_id,
            "QR generated"
        );

        Ok(QrCreated {
            transaction_id: values.transaction_id,
            qr_image: values.qr_base64,
            checkout_url: values.checkout_url,
            expires_at: values.expiration_date.as_deref().and_then(parse_expiration),
        })
    }

    async fn query_transaction(&self, provider_tx_id: &str) -> GatewayResult<TransactionStatus> {
        debug!(provider_tx_id, "Querying transaction status");

        let body = QueryTransactionBody {
            pagofacil_transaction_id: provider_tx_id.to_string(),
        };
        let values: QueryTransactionValues =
            self.post_authorized("query-transaction", &body).await?;

        Ok(TransactionStatus {
            payment_status: values.payment_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StaticGateway;

    #[async_trait]
    impl QrGateway for StaticGateway {
        async fn create_qr(&self, request: &QrRequest) -> GatewayResult<QrCreated> {
            Ok(QrCreated {
                transaction_id: format!("TX-{}", request.order_number),
                qr_image: "aW1n".to_string(),
                checkout_url: None,
                expires_at: None,
            })
        }

        async fn query_transaction(
            &self,
            _provider_tx_id: &str,
        ) -> GatewayResult<TransactionStatus> {
            Ok(TransactionStatus { payment_status: 2 })
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let gateway: Arc<dyn QrGateway> = Arc::new(StaticGateway);
        let request = QrRequest {
            order_number: "V-20260830-0001".to_string(),
            amount_cents: 4300,
            customer_name: "Maria Lopez".to_string(),
            email: "maria@example.com".to_string(),
            phone: "70000000".to_string(),
            order_detail: serde_json::json!([]),
        };

        let created = gateway.create_qr(&request).await.unwrap();
        assert_eq!(created.transaction_id, "TX-V-20260830-0001");

        let status = gateway.query_transaction(&created.transaction_id).await.unwrap();
        assert!(status.is_paid());
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = GatewayConfig::new("not-a-url", "svc", "sec", "https://cb");
        assert!(HttpQrGateway::new(config).is_err());
    }
}
