use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// An exchange API key pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// The type of order. Only plain spot order types are exposed as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
        }
    }
}

/// How long an order stays working on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-til-cancelled.
    Gtc,
    /// Immediate-or-cancel.
    Ioc,
    /// Fill-or-kill.
    Fok,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
        }
    }
}

/// A spot order as requested by a caller.
///
/// `price` is expected for LIMIT orders but that rule is left to the
/// exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_in_force: Option<TimeInForce>,
}

/// Optional order fields arriving as `""` or `null` are absent.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.is_empty() => Ok(None),
        Some(value) => T::deserialize(value).map(Some).map_err(D::Error::custom),
    }
}

impl OrderRequest {
    /// Create a market order request.
    pub fn market(symbol: &str, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity: Some(quantity),
            price: None,
            time_in_force: None,
        }
    }

    /// Create a limit order request.
    pub fn limit(symbol: &str, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity: Some(quantity),
            price: Some(price),
            time_in_force: None,
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }

    /// Build the exchange parameter set. Optional fields are left out
    /// entirely when absent; the exchange rejects empty values.
    pub fn to_params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        params.insert("symbol", &self.symbol);
        params.insert("side", self.side.as_str());
        params.insert("type", self.order_type.as_str());
        params.insert_opt("quantity", self.quantity.as_ref());
        params.insert_opt("price", self.price.as_ref());
        params.insert_opt("timeInForce", self.time_in_force.map(|t| t.as_str()));
        params
    }
}

/// A sparse set of request parameters: only fields that are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestParams(BTreeMap<&'static str, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: impl ToString) {
        self.0.insert(key, value.to_string());
    }

    pub fn insert_opt<V: ToString>(&mut self, key: &'static str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Filter for the open-orders query. Empty means all symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOrdersFilter {
    pub symbol: Option<String>,
}

impl OpenOrdersFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn symbol(symbol: &str) -> Self {
        Self {
            symbol: Some(symbol.to_string()),
        }
    }

    pub fn to_params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        params.insert_opt("symbol", self.symbol.as_deref());
        params
    }
}

/// An order as reported by the exchange.
///
/// The shape is passed through: fields without a typed slot are kept in
/// `extra` and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_list_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    /// Epoch milliseconds. On the open-orders path this holds the time the
    /// orders were retrieved, not the exchange transaction time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transact_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_qty: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_qty: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cummulative_quote_qty: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OrderResponse {
    /// Whether the exchange still has the order working.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("NEW") | Some("PARTIALLY_FILLED") | Some("PENDING_NEW")
        )
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Holdings of a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Account snapshot as returned by the exchange's account-info call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_trade: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub balances: Vec<AccountBalance>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_limit_order_params_carry_all_six_fields() {
        let req = OrderRequest::limit("BTCUSDT", Side::Buy, dec!(0.01), dec!(50000))
            .with_time_in_force(TimeInForce::Gtc);
        let params = req.to_params();

        assert_eq!(params.len(), 6);
        assert_eq!(params.get("symbol"), Some("BTCUSDT"));
        assert_eq!(params.get("side"), Some("BUY"));
        assert_eq!(params.get("type"), Some("LIMIT"));
        assert_eq!(params.get("quantity"), Some("0.01"));
        assert_eq!(params.get("price"), Some("50000"));
        assert_eq!(params.get("timeInForce"), Some("GTC"));
    }

    #[test]
    fn test_market_order_params_omit_absent_fields() {
        let req = OrderRequest::market("BTCUSDT", Side::Sell, dec!(0.01));
        let params = req.to_params();

        assert_eq!(params.len(), 4);
        assert!(!params.contains("price"));
        assert!(!params.contains("timeInForce"));
    }

    #[test]
    fn test_order_request_decodes_tool_arguments() {
        let json = serde_json::json!({
            "symbol": "ETHUSDT",
            "side": "SELL",
            "type": "LIMIT",
            "quantity": "1.5",
            "price": "3200.10",
            "timeInForce": "IOC"
        });
        let req: OrderRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.side, Side::Sell);
        assert_eq!(req.order_type, OrderType::Limit);
        assert_eq!(req.price, Some(dec!(3200.10)));
        assert_eq!(req.time_in_force, Some(TimeInForce::Ioc));
    }

    #[test]
    fn test_empty_optional_fields_are_omitted() {
        let json = serde_json::json!({
            "symbol": "BTCUSDT",
            "side": "BUY",
            "type": "MARKET",
            "quantity": "0.5",
            "price": "",
            "timeInForce": ""
        });
        let req: OrderRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.price, None);
        assert_eq!(req.time_in_force, None);

        let params = req.to_params();
        assert_eq!(params.len(), 4);
        assert_eq!(params.get("quantity"), Some("0.5"));
        assert!(!params.contains("price"));
        assert!(!params.contains("timeInForce"));

        let blank_quantity: OrderRequest = serde_json::from_value(serde_json::json!({
            "symbol": "BTCUSDT", "side": "BUY", "type": "MARKET", "quantity": "", "price": null
        }))
        .unwrap();
        assert_eq!(blank_quantity.quantity, None);
        assert_eq!(blank_quantity.to_params().len(), 3);

        let bad_price = serde_json::from_value::<OrderRequest>(serde_json::json!({
            "symbol": "BTCUSDT", "side": "BUY", "type": "LIMIT", "price": "abc"
        }));
        assert!(bad_price.is_err());
    }

    #[test]
    fn test_order_response_keeps_unknown_fields() {
        let json = serde_json::json!({
            "symbol": "BTCUSDT",
            "orderId": 28,
            "orderListId": -1,
            "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
            "transactTime": 1507725176595i64,
            "price": "0.00000000",
            "origQty": "10.00000000",
            "executedQty": "10.00000000",
            "cummulativeQuoteQty": "10.00000000",
            "status": "FILLED",
            "timeInForce": "GTC",
            "type": "MARKET",
            "side": "SELL",
            "workingTime": 1507725176595i64,
            "selfTradePreventionMode": "NONE"
        });
        let order: OrderResponse = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(order.order_id, 28);
        assert_eq!(order.side, Some(Side::Sell));
        assert!(!order.is_open());
        assert_eq!(order.extra.get("selfTradePreventionMode"), Some(&json["selfTradePreventionMode"]));

        let back = serde_json::to_value(&order).unwrap();
        assert_eq!(back["workingTime"], json["workingTime"]);
        assert_eq!(back["origQty"], "10.00000000");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("key", "super-secret");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("key"));
        assert!(!printed.contains("super-secret"));
    }
}
