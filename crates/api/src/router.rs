use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use spotdesk_core::{Credentials, OrderRequest, TradeError};
use spotdesk_engine::SpotTrader;
use std::sync::Arc;
use tracing::{info, warn};

use crate::registry::*;

/// Errors from dispatching a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("Failed to encode result: {0}")]
    Encode(String),
    #[error(transparent)]
    Trade(#[from] TradeError),
}

impl ToolError {
    /// Stable machine-readable tag for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::Encode(_) => "encode",
            ToolError::Trade(err) => err.kind(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigureArgs {
    api_key: String,
    api_secret: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelArgs {
    symbol: String,
    order_id: u64,
}

#[derive(Deserialize)]
struct OpenOrdersArgs {
    #[serde(default)]
    symbol: Option<String>,
}

/// Decode tool arguments; a missing/null argument object counts as `{}`.
fn decode<T: DeserializeOwned>(args: Value) -> Result<T, serde_json::Error> {
    let args = match args {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(args)
}

fn invalid(tool: &str, err: serde_json::Error) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: err.to_string(),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Encode(e.to_string()))
}

/// Routes tool invocations by name to the trading adapter.
#[derive(Clone)]
pub struct ToolRouter {
    trader: Arc<SpotTrader>,
}

impl ToolRouter {
    pub fn new(trader: Arc<SpotTrader>) -> Self {
        Self { trader }
    }

    pub fn trader(&self) -> &Arc<SpotTrader> {
        &self.trader
    }

    /// Descriptors for every tool this router dispatches.
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        all_tools()
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        info!(tool = name, "Tool invoked");
        let result = self.dispatch(name, args).await;
        if let Err(err) = &result {
            warn!(tool = name, kind = err.kind(), error = %err, "Tool call failed");
        }
        result
    }

    async fn dispatch(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            CONFIGURE_API_KEYS => {
                let args: ConfigureArgs = decode(args).map_err(|e| invalid(name, e))?;
                if args.api_key.trim().is_empty() || args.api_secret.trim().is_empty() {
                    return Err(TradeError::Credential(
                        "API key and secret must not be empty".to_string(),
                    )
                    .into());
                }
                let initialized = self
                    .trader
                    .configure(Credentials::new(args.api_key, args.api_secret))
                    .await?;
                Ok(json!({
                    "message": "API keys configured successfully",
                    "initialized": initialized,
                }))
            }
            CREATE_SPOT_ORDER => {
                let order: OrderRequest = decode(args)
                    .map_err(|e| TradeError::OrderValidation(e.to_string()))?;
                if order.quantity.is_none() {
                    return Err(
                        TradeError::OrderValidation("quantity is required".to_string()).into(),
                    );
                }
                let response = self.trader.place_order(&order).await?;
                encode(&response)
            }
            CANCEL_ORDER => {
                let args: CancelArgs = decode(args).map_err(|e| invalid(name, e))?;
                self.trader.cancel_order(&args.symbol, args.order_id).await?;
                Ok(json!({
                    "message": format!("Order {} cancelled", args.order_id),
                    "symbol": args.symbol,
                    "orderId": args.order_id,
                }))
            }
            GET_BALANCES => {
                let balances = self.trader.get_account_balances().await?;
                encode(&balances)
            }
            GET_OPEN_ORDERS => {
                let args: OpenOrdersArgs = decode(args).map_err(|e| invalid(name, e))?;
                let orders = self.trader.get_open_orders(args.symbol.as_deref()).await?;
                encode(&orders)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
