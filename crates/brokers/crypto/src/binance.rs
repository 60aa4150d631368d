use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spotdesk_core::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::signing::sign;

pub const MAINNET_URL: &str = "https://api.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binance.vision";

const ORDER_PATH: &str = "/api/v3/order";
const ACCOUNT_PATH: &str = "/api/v3/account";
const OPEN_ORDERS_PATH: &str = "/api/v3/openOrders";

/// Configuration for connecting to Binance spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    /// REST endpoint root (e.g. "https://api.binance.com").
    pub base_url: String,
    /// How long a signed request stays valid after its timestamp.
    pub recv_window_ms: u64,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: MAINNET_URL.to_string(),
            recv_window_ms: 5000,
            timeout_secs: 10,
        }
    }
}

impl BinanceConfig {
    pub fn testnet() -> Self {
        Self {
            base_url: TESTNET_URL.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

/// Binance spot REST client for the signed trading endpoints.
pub struct BinanceSpotClient {
    config: BinanceConfig,
    credentials: Credentials,
    http: reqwest::Client,
}

impl BinanceSpotClient {
    pub fn new(config: BinanceConfig, credentials: Credentials) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Http(format!("Client build failed: {}", e)))?;

        Ok(Self {
            config,
            credentials,
            http,
        })
    }

    /// Encode `params`, append `recvWindow` and `timestamp`, and sign the
    /// result.
    fn signed_query(&self, params: &RequestParams, timestamp: i64) -> Result<String, ExchangeError> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params.iter() {
            query.append_pair(key, value);
        }
        query.append_pair("recvWindow", &self.config.recv_window_ms.to_string());
        query.append_pair("timestamp", &timestamp.to_string());
        let query = query.finish();

        let signature = sign(&self.credentials.api_secret, &query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &RequestParams,
    ) -> Result<T, ExchangeError> {
        let query = self.signed_query(params, Utc::now().timestamp_millis())?;
        let url = format!(
            "{}{}?{}",
            self.config.base_url.trim_end_matches('/'),
            path,
            query
        );
        debug!(method = %method, path, "Sending signed request");

        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()
            .await
            .map_err(|e| ExchangeError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Http(format!("Read error: {}", e)))?;

        if !status.is_success() {
            let err = api_error(status.as_u16(), &body);
            warn!(path, status = status.as_u16(), error = %err, "Binance request rejected");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }
}

fn api_error(status: u16, body: &str) -> ExchangeError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => ExchangeError::Api {
            status,
            code: err.code,
            msg: err.msg,
        },
        Err(_) => ExchangeError::Http(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl ExchangeClient for BinanceSpotClient {
    async fn new_order(&self, params: &RequestParams) -> Result<OrderResponse, ExchangeError> {
        self.signed(Method::POST, ORDER_PATH, params).await
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        params: &RequestParams,
    ) -> Result<OrderResponse, ExchangeError> {
        let mut params = params.clone();
        params.insert("symbol", symbol);
        self.signed(Method::DELETE, ORDER_PATH, &params).await
    }

    async fn account(&self) -> Result<AccountInfo, ExchangeError> {
        self.signed(Method::GET, ACCOUNT_PATH, &RequestParams::new())
            .await
    }

    async fn open_orders(
        &self,
        params: &RequestParams,
    ) -> Result<Vec<OrderResponse>, ExchangeError> {
        self.signed(Method::GET, OPEN_ORDERS_PATH, params).await
    }
}

/// Builds `BinanceSpotClient` handles for a fixed endpoint configuration.
pub struct BinanceConnector {
    config: BinanceConfig,
}

impl BinanceConnector {
    pub fn new(config: BinanceConfig) -> Self {
        Self { config }
    }
}

impl ExchangeConnector for BinanceConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ExchangeClient>, ExchangeError> {
        info!(base_url = %self.config.base_url, "Creating Binance spot client");
        let client = BinanceSpotClient::new(self.config.clone(), credentials.clone())?;
        Ok(Arc::new(client))
    }
}
