use crate::errors::*;
use crate::models::*;
use async_trait::async_trait;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Exchange Client Trait
// ---------------------------------------------------------------------------

/// An authenticated spot exchange client.
///
/// Signing, wire format and any timeout live behind this trait. Callers
/// receive exchange failures as they are.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Place a new order with a sparse parameter set.
    async fn new_order(&self, params: &RequestParams) -> Result<OrderResponse, ExchangeError>;

    /// Cancel an order on `symbol`. `params` carries `orderId`.
    async fn cancel_order(
        &self,
        symbol: &str,
        params: &RequestParams,
    ) -> Result<OrderResponse, ExchangeError>;

    /// Fetch the account snapshot, including balances.
    async fn account(&self) -> Result<AccountInfo, ExchangeError>;

    /// Fetch working orders. An empty parameter set means every symbol.
    async fn open_orders(&self, params: &RequestParams)
        -> Result<Vec<OrderResponse>, ExchangeError>;
}

/// Builds exchange clients from credentials.
pub trait ExchangeConnector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ExchangeClient>, ExchangeError>;
}

// ---------------------------------------------------------------------------
// Credential Store Trait
// ---------------------------------------------------------------------------

/// Source of exchange API keys.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Return the stored key pair, or `None` if nothing has been configured.
    async fn get_api_keys(&self) -> Result<Option<Credentials>, TradeError>;

    /// Persist a key pair, replacing any previous one.
    async fn store_api_keys(&self, credentials: Credentials) -> Result<(), TradeError>;
}
