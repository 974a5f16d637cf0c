use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use amlbot_core::aml::{AmlProvider, BalanceLedger, LedgerError, ProviderCheck, ProviderError};
use amlbot_core::config::BackendConfig;
use amlbot_core::domain::UserId;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// HTTP client for the wallet backend: AML provider proxy and balance ledger.
pub struct BackendClient {
    http: Client,
    base_url: String,
    auth_token: SecretString,
    read_retries: u32,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            base_url: format!("{}/", config.base_url.trim_end_matches('/')),
            auth_token: config.auth_token.clone(),
            read_retries: config.read_retries,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("Authorization", self.auth_token.expose_secret())
    }

    async fn fetch_balance(&self, user_id: UserId, token_name: &str) -> Result<Decimal, LedgerError> {
        let response = self
            .request(Method::GET, "balancelist/")
            .query(&[("telegram_id", user_id.to_string().as_str()), ("token_name", token_name)])
            .send()
            .await
            .map_err(|error| LedgerError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Status(status.as_u16()));
        }

        let body: Value =
            response.json().await.map_err(|error| LedgerError::Malformed(error.to_string()))?;
        let Some(entry) = body.as_array().and_then(|entries| entries.first()) else {
            return Err(LedgerError::MissingBalance { user_id, token_name: token_name.to_owned() });
        };
        parse_amount(entry.get("amount"))
            .ok_or_else(|| LedgerError::Malformed(format!("unreadable balance amount in {entry}")))
    }
}

fn parse_amount(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::String(raw) => Decimal::from_str(raw.trim()).ok(),
        Value::Number(number) => {
            let raw = number.to_string();
            Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).ok()
        }
        _ => None,
    }
}

fn is_retryable(error: &LedgerError) -> bool {
    match error {
        LedgerError::Transport(_) => true,
        LedgerError::Status(status) => {
            StatusCode::from_u16(*status).is_ok_and(|status| status.is_server_error())
        }
        LedgerError::MissingBalance { .. } | LedgerError::Malformed(_) => false,
    }
}

#[async_trait]
impl AmlProvider for BackendClient {
    async fn check(&self, address: &str, asset_code: &str) -> Result<ProviderCheck, ProviderError> {
        let response = self
            .request(Method::POST, "aml/")
            .json(&json!({ "address": address, "asset": asset_code }))
            .send()
            .await
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: Value =
            response.json().await.map_err(|error| ProviderError::Malformed(error.to_string()))?;
        Ok(ProviderCheck::from_body(&body))
    }
}

#[async_trait]
impl BalanceLedger for BackendClient {
    async fn balance(&self, user_id: UserId, token_name: &str) -> Result<Decimal, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.fetch_balance(user_id, token_name).await {
                Err(error) if attempt < self.read_retries && is_retryable(&error) => {
                    attempt += 1;
                    warn!(
                        event_name = "egress.backend.balance_retry",
                        user_id = %user_id,
                        attempt,
                        error = %error,
                        "balance read failed; retrying"
                    );
                }
                result => return result,
            }
        }
    }

    /// Single attempt: the backend has no idempotency key, so a retry could charge twice.
    async fn set_balance(
        &self,
        user_id: UserId,
        token_name: &str,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let response = self
            .request(Method::PATCH, &format!("balancelist/{user_id}/{token_name}/"))
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .map_err(|error| LedgerError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Status(status.as_u16()));
        }
        debug!(
            event_name = "egress.backend.balance_updated",
            user_id = %user_id,
            token_name,
            %amount,
            "balance updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::{get, patch, post},
        Json, Router,
    };
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use amlbot_core::aml::{AmlProvider, BalanceLedger, LedgerError, ProviderCheck};
    use amlbot_core::config::BackendConfig;
    use amlbot_core::domain::UserId;

    use super::BackendClient;

    #[derive(Clone, Default)]
    struct Backend {
        balance_calls: Arc<AtomicUsize>,
        failing_balance_reads: usize,
        patch_calls: Arc<AtomicUsize>,
        patched: Arc<Mutex<Vec<(String, String, Value)>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("Authorization").and_then(|value| value.to_str().ok()) == Some("Token secret")
    }

    async fn aml(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }
        if body["address"] == "unknown" {
            return (StatusCode::OK, Json(json!({ "detail": "no data" })));
        }
        (
            StatusCode::OK,
            Json(json!({
                "lowestScore": 0.42,
                "AML": { "data": { "riskscore": 0.42, "asset": body["asset"].clone() } }
            })),
        )
    }

    async fn balance_list(
        State(backend): State<Backend>,
        Query(query): Query<std::collections::HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        let call = backend.balance_calls.fetch_add(1, Ordering::SeqCst);
        if call < backend.failing_balance_reads {
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
        }
        match query.get("token_name").map(String::as_str) {
            Some("USDT") => (StatusCode::OK, Json(json!([{ "amount": "12.50" }]))),
            _ => (StatusCode::OK, Json(json!([]))),
        }
    }

    async fn balance_update(
        State(backend): State<Backend>,
        Path((user_id, token_name)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        backend.patch_calls.fetch_add(1, Ordering::SeqCst);
        backend.patched.lock().await.push((user_id, token_name, body));
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn serve(backend: Backend) -> String {
        let router = Router::new()
            .route("/api/aml/", post(aml))
            .route("/api/balancelist/", get(balance_list))
            .route("/api/balancelist/{user_id}/{token_name}/", patch(balance_update))
            .with_state(backend);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}/api")
    }

    fn client(base_url: String, read_retries: u32) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url,
            auth_token: "Token secret".to_string().into(),
            timeout_secs: 5,
            read_retries,
        })
        .expect("client")
    }

    #[tokio::test]
    async fn provider_check_posts_address_and_asset() {
        let client = client(serve(Backend::default()).await, 1);

        let scored = client.check("TXyz", "TRX").await.expect("check");
        let ProviderCheck::Scored { overall_score, report_payload } = scored else {
            panic!("expected a scored check");
        };
        assert_eq!(overall_score, Decimal::new(42, 2));
        assert_eq!(report_payload["data"]["asset"], "TRX");

        let missing = client.check("unknown", "TRX").await.expect("check");
        assert_eq!(missing, ProviderCheck::NotFound);
    }

    #[tokio::test]
    async fn balance_read_is_retried_once_after_server_error() {
        let backend = Backend { failing_balance_reads: 1, ..Backend::default() };
        let calls = backend.balance_calls.clone();
        let client = client(serve(backend).await, 1);

        let balance = client.balance(UserId(7), "USDT").await.expect("balance");

        assert_eq!(balance, Decimal::new(1250, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn balance_read_gives_up_after_configured_retries() {
        let backend = Backend { failing_balance_reads: 5, ..Backend::default() };
        let calls = backend.balance_calls.clone();
        let client = client(serve(backend).await, 1);

        let error = client.balance(UserId(7), "USDT").await.expect_err("should fail");

        assert_eq!(error, LedgerError::Status(503));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_balance_list_is_missing_balance() {
        let client = client(serve(Backend::default()).await, 1);

        let error = client.balance(UserId(7), "BTC").await.expect_err("should fail");

        assert!(matches!(error, LedgerError::MissingBalance { .. }));
    }

    #[tokio::test]
    async fn balance_write_is_never_retried() {
        let backend = Backend::default();
        let patch_calls = backend.patch_calls.clone();
        let patched = backend.patched.clone();
        let client = client(serve(backend).await, 3);

        let error = client
            .set_balance(UserId(7), "USDT", Decimal::new(750, 2))
            .await
            .expect_err("backend rejects the write");

        assert_eq!(error, LedgerError::Status(503));
        assert_eq!(patch_calls.load(Ordering::SeqCst), 1);
        let patched = patched.lock().await;
        assert_eq!(patched[0].0, "7");
        assert_eq!(patched[0].1, "USDT");
        assert_eq!(patched[0].2, json!({ "amount": "7.50" }));
    }
}
