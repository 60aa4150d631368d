use chrono::Utc;
use spotdesk_core::*;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Mediates every exchange call.
///
/// Owns the client handle, which stays empty until `initialize` finds
/// credentials. The handle slot is locked only to clone the `Arc`; exchange
/// calls run concurrently and are never serialized here.
pub struct SpotTrader {
    store: Arc<dyn CredentialStore>,
    connector: Arc<dyn ExchangeConnector>,
    client: RwLock<Option<Arc<dyn ExchangeClient>>>,
}

impl SpotTrader {
    pub fn new(store: Arc<dyn CredentialStore>, connector: Arc<dyn ExchangeConnector>) -> Self {
        Self {
            store,
            connector,
            client: RwLock::new(None),
        }
    }

    /// Build a client handle from stored credentials.
    ///
    /// Returns `Ok(false)` when nothing is stored so the caller can ask for
    /// configuration. Calling again replaces the handle.
    pub async fn initialize(&self) -> Result<bool, TradeError> {
        let Some(credentials) = self.store.get_api_keys().await? else {
            info!("No API keys configured; exchange client not initialized");
            return Ok(false);
        };

        let client = self.connector.connect(&credentials)?;
        *self.client.write().await = Some(client);
        info!("Exchange client initialized");
        Ok(true)
    }

    /// Store a new key pair and rebuild the client handle from it.
    pub async fn configure(&self, credentials: Credentials) -> Result<bool, TradeError> {
        self.store.store_api_keys(credentials).await?;
        self.initialize().await
    }

    pub async fn is_initialized(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn client(&self) -> Result<Arc<dyn ExchangeClient>, TradeError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(TradeError::UninitializedClient)
    }

    /// Place a spot order. Optional fields are forwarded only when present.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse, TradeError> {
        let client = self.client().await?;
        let params = order.to_params();
        debug!(
            symbol = %order.symbol,
            side = order.side.as_str(),
            order_type = order.order_type.as_str(),
            fields = params.len(),
            "Placing order"
        );
        Ok(client.new_order(&params).await?)
    }

    /// Cancel an order. Success is the absence of an error.
    pub async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), TradeError> {
        let client = self.client().await?;
        let mut params = RequestParams::new();
        params.insert("orderId", order_id);

        let cancelled = client.cancel_order(symbol, &params).await?;
        debug!(symbol, order_id, status = ?cancelled.status, "Order cancelled");
        Ok(())
    }

    pub async fn get_account_balances(&self) -> Result<Vec<AccountBalance>, TradeError> {
        let client = self.client().await?;
        let account = client.account().await?;
        Ok(account.balances)
    }

    /// Fetch working orders, optionally for a single symbol.
    ///
    /// Each order's `transactTime` is overwritten with the retrieval time.
    pub async fn get_open_orders(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<OrderResponse>, TradeError> {
        let client = self.client().await?;
        let filter = OpenOrdersFilter {
            symbol: symbol.filter(|s| !s.is_empty()).map(str::to_string),
        };

        let orders = client.open_orders(&filter.to_params()).await?;
        let captured_at = Utc::now().timestamp_millis();
        Ok(orders
            .into_iter()
            .map(|mut order| {
                order.transact_time = Some(captured_at);
                order
            })
            .collect())
    }
}
