// ---------------------------------------------------------------------------
// Exchange errors
// ---------------------------------------------------------------------------

/// Errors raised by an exchange client. These reach callers unwrapped.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Exchange API error {code} (HTTP {status}): {msg}")]
    Api { status: u16, code: i64, msg: String },
    #[error("Failed to decode exchange response: {0}")]
    Decode(String),
    #[error("Exchange error: {0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Trading errors
// ---------------------------------------------------------------------------

/// Failures surfaced by the trading adapter and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    /// An operation ran before the exchange client was initialized.
    #[error("Binance client not initialized")]
    UninitializedClient,
    /// Credential retrieval or storage failed.
    #[error("API key error: {0}")]
    Credential(String),
    /// The order request is malformed.
    #[error("Order validation error: {0}")]
    OrderValidation(String),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl TradeError {
    /// Stable machine-readable tag for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TradeError::UninitializedClient => "uninitialized_client",
            TradeError::Credential(_) => "credential",
            TradeError::OrderValidation(_) => "order_validation",
            TradeError::Exchange(_) => "exchange",
        }
    }
}
