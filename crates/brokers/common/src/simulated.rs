use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use spotdesk_core::*;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Configuration for the simulated exchange.
#[derive(Debug, Clone)]
pub struct SimulatedExchangeConfig {
    /// Balances reported by the account call.
    pub balances: Vec<AccountBalance>,
    /// First exchange order id handed out.
    pub first_order_id: u64,
    /// Most recent requests kept in the journal. Zero disables journaling.
    pub journal_capacity: usize,
}

impl Default for SimulatedExchangeConfig {
    fn default() -> Self {
        Self {
            balances: vec![
                AccountBalance {
                    asset: "USDT".to_string(),
                    free: Decimal::new(10_000, 0),
                    locked: Decimal::ZERO,
                },
                AccountBalance {
                    asset: "BTC".to_string(),
                    free: Decimal::ZERO,
                    locked: Decimal::ZERO,
                },
            ],
            first_order_id: 1,
            journal_capacity: 256,
        }
    }
}

/// A request as the exchange received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    NewOrder(RequestParams),
    CancelOrder { symbol: String, params: RequestParams },
    Account,
    OpenOrders(RequestParams),
}

#[derive(Debug, Default)]
struct State {
    next_order_id: u64,
    open_orders: Vec<OrderResponse>,
    journal: VecDeque<RecordedRequest>,
    /// Error returned by the next call, if set.
    fail_next: Option<(u16, i64, String)>,
}

/// An in-memory spot exchange.
///
/// MARKET orders fill immediately. LIMIT orders rest as `NEW` until
/// cancelled. Recent requests are journaled so callers can inspect exactly
/// which parameters were forwarded.
pub struct SimulatedExchange {
    config: SimulatedExchangeConfig,
    state: Mutex<State>,
}

impl SimulatedExchange {
    pub fn new(config: SimulatedExchangeConfig) -> Self {
        let state = State {
            next_order_id: config.first_order_id,
            ..Default::default()
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Journaled requests, oldest first.
    pub async fn journal(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.journal.iter().cloned().collect()
    }

    /// The most recent request, if any.
    pub async fn last_request(&self) -> Option<RecordedRequest> {
        self.state.lock().await.journal.back().cloned()
    }

    /// Make the next call fail with an exchange API error.
    pub async fn fail_next(&self, status: u16, code: i64, msg: &str) {
        self.state.lock().await.fail_next = Some((status, code, msg.to_string()));
    }

    fn record(&self, state: &mut State, request: RecordedRequest) {
        let capacity = self.config.journal_capacity;
        if capacity == 0 {
            return;
        }
        while state.journal.len() >= capacity {
            state.journal.pop_front();
        }
        state.journal.push_back(request);
    }

    fn take_failure(state: &mut State) -> Result<(), ExchangeError> {
        match state.fail_next.take() {
            Some((status, code, msg)) => Err(ExchangeError::Api { status, code, msg }),
            None => Ok(()),
        }
    }
}

impl Default for SimulatedExchange {
    fn default() -> Self {
        Self::new(SimulatedExchangeConfig::default())
    }
}

fn mandatory<'a>(params: &'a RequestParams, key: &str) -> Result<&'a str, ExchangeError> {
    params.get(key).ok_or_else(|| ExchangeError::Api {
        status: 400,
        code: -1102,
        msg: format!(
            "Mandatory parameter '{}' was not sent, was empty/null, or malformed.",
            key
        ),
    })
}

fn decimal_param(params: &RequestParams, key: &str) -> Result<Option<Decimal>, ExchangeError> {
    params
        .get(key)
        .map(|raw| {
            Decimal::from_str(raw).map_err(|_| ExchangeError::Api {
                status: 400,
                code: -1100,
                msg: format!("Illegal characters found in parameter '{}'.", key),
            })
        })
        .transpose()
}

fn parse_side(raw: &str) -> Result<Side, ExchangeError> {
    match raw {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        _ => Err(ExchangeError::Api {
            status: 400,
            code: -1100,
            msg: "Illegal characters found in parameter 'side'.".to_string(),
        }),
    }
}

#[async_trait]
impl ExchangeClient for SimulatedExchange {
    async fn new_order(&self, params: &RequestParams) -> Result<OrderResponse, ExchangeError> {
        let mut state = self.state.lock().await;
        self.record(&mut state, RecordedRequest::NewOrder(params.clone()));
        Self::take_failure(&mut state)?;

        let symbol = mandatory(params, "symbol")?;
        let side = parse_side(mandatory(params, "side")?)?;
        let order_type = mandatory(params, "type")?;
        let quantity = decimal_param(params, "quantity")?;
        let price = decimal_param(params, "price")?;

        let (status, executed) = match order_type {
            "MARKET" => ("FILLED", quantity.unwrap_or(Decimal::ZERO)),
            "LIMIT" => {
                mandatory(params, "price")?;
                mandatory(params, "timeInForce")?;
                ("NEW", Decimal::ZERO)
            }
            other => {
                return Err(ExchangeError::Api {
                    status: 400,
                    code: -1116,
                    msg: format!("Invalid orderType: {}", other),
                })
            }
        };

        let order_id = state.next_order_id;
        state.next_order_id += 1;

        let order = OrderResponse {
            symbol: symbol.to_string(),
            order_id,
            order_list_id: Some(-1),
            client_order_id: Some(Uuid::new_v4().simple().to_string()),
            transact_time: Some(Utc::now().timestamp_millis()),
            price: Some(price.unwrap_or(Decimal::ZERO)),
            orig_qty: quantity,
            executed_qty: Some(executed),
            cummulative_quote_qty: Some(Decimal::ZERO),
            status: Some(status.to_string()),
            time_in_force: Some(params.get("timeInForce").unwrap_or("GTC").to_string()),
            order_type: Some(order_type.to_string()),
            side: Some(side),
            extra: serde_json::Map::new(),
        };

        if order.is_open() {
            state.open_orders.push(order.clone());
        }
        debug!(order_id, symbol = %order.symbol, status, "Simulated order accepted");
        Ok(order)
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        params: &RequestParams,
    ) -> Result<OrderResponse, ExchangeError> {
        let mut state = self.state.lock().await;
        self.record(
            &mut state,
            RecordedRequest::CancelOrder {
                symbol: symbol.to_string(),
                params: params.clone(),
            },
        );
        Self::take_failure(&mut state)?;

        let order_id: Option<u64> = params.get("orderId").and_then(|id| id.parse().ok());
        let pos = state
            .open_orders
            .iter()
            .position(|o| Some(o.order_id) == order_id && o.symbol == symbol);

        match pos {
            Some(pos) => {
                let mut order = state.open_orders.remove(pos);
                order.status = Some("CANCELED".to_string());
                Ok(order)
            }
            None => Err(ExchangeError::Api {
                status: 400,
                code: -2011,
                msg: "Unknown order sent.".to_string(),
            }),
        }
    }

    async fn account(&self) -> Result<AccountInfo, ExchangeError> {
        let mut state = self.state.lock().await;
        self.record(&mut state, RecordedRequest::Account);
        Self::take_failure(&mut state)?;

        Ok(AccountInfo {
            can_trade: Some(true),
            update_time: Some(Utc::now().timestamp_millis()),
            account_type: Some("SPOT".to_string()),
            balances: self.config.balances.clone(),
            extra: serde_json::Map::new(),
        })
    }

    async fn open_orders(
        &self,
        params: &RequestParams,
    ) -> Result<Vec<OrderResponse>, ExchangeError> {
        let mut state = self.state.lock().await;
        self.record(&mut state, RecordedRequest::OpenOrders(params.clone()));
        Self::take_failure(&mut state)?;

        let symbol = params.get("symbol");
        Ok(state
            .open_orders
            .iter()
            .filter(|o| symbol.map_or(true, |s| o.symbol == s))
            .cloned()
            .collect())
    }
}

/// Hands out a shared simulated exchange regardless of credentials.
pub struct SimulatedConnector {
    exchange: Arc<SimulatedExchange>,
    connects: AtomicUsize,
}

impl SimulatedConnector {
    pub fn new(exchange: Arc<SimulatedExchange>) -> Self {
        Self {
            exchange,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn exchange(&self) -> Arc<SimulatedExchange> {
        self.exchange.clone()
    }

    /// Number of client handles created so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ExchangeConnector for SimulatedConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ExchangeClient>, ExchangeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        debug!(api_key = %credentials.api_key, "Connecting simulated exchange");
        Ok(self.exchange.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_market_order_fills_immediately() {
        let exchange = SimulatedExchange::default();
        let params = OrderRequest::market("BTCUSDT", Side::Buy, dec!(0.5)).to_params();

        let order = exchange.new_order(&params).await.unwrap();
        assert_eq!(order.status.as_deref(), Some("FILLED"));
        assert_eq!(order.executed_qty, Some(dec!(0.5)));

        let open = exchange.open_orders(&RequestParams::new()).await.unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn test_limit_order_rests_until_cancelled() {
        let exchange = SimulatedExchange::default();
        let params = OrderRequest::limit("ETHUSDT", Side::Sell, dec!(1), dec!(4000))
            .with_time_in_force(TimeInForce::Gtc)
            .to_params();

        let order = exchange.new_order(&params).await.unwrap();
        assert_eq!(order.status.as_deref(), Some("NEW"));

        let open = exchange
            .open_orders(&OpenOrdersFilter::symbol("ETHUSDT").to_params())
            .await
            .unwrap();
        assert_eq!(open.len(), 1);

        let mut cancel = RequestParams::new();
        cancel.insert("orderId", order.order_id);
        let cancelled = exchange.cancel_order("ETHUSDT", &cancel).await.unwrap();
        assert_eq!(cancelled.status.as_deref(), Some("CANCELED"));

        let open = exchange.open_orders(&RequestParams::new()).await.unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn test_limit_order_without_price_is_rejected() {
        let exchange = SimulatedExchange::default();
        let mut req = OrderRequest::market("BTCUSDT", Side::Buy, dec!(1));
        req.order_type = OrderType::Limit;

        match exchange.new_order(&req.to_params()).await {
            Err(ExchangeError::Api { code, .. }) => assert_eq!(code, -1102),
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let exchange = SimulatedExchange::default();
        let mut cancel = RequestParams::new();
        cancel.insert("orderId", 999);

        match exchange.cancel_order("BTCUSDT", &cancel).await {
            Err(ExchangeError::Api { code, msg, .. }) => {
                assert_eq!(code, -2011);
                assert!(msg.contains("Unknown order"));
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_injected_failure_and_journal() {
        let exchange = SimulatedExchange::default();
        exchange.fail_next(429, -1003, "Too many requests").await;

        assert!(exchange.account().await.is_err());
        let account = exchange.account().await.unwrap();
        assert_eq!(account.balances.len(), 2);

        let journal = exchange.journal().await;
        assert_eq!(journal, vec![RecordedRequest::Account, RecordedRequest::Account]);
    }

    #[tokio::test]
    async fn test_journal_keeps_only_recent_requests() {
        let exchange = SimulatedExchange::new(SimulatedExchangeConfig {
            journal_capacity: 2,
            ..Default::default()
        });
        exchange.account().await.unwrap();
        exchange.open_orders(&RequestParams::new()).await.unwrap();
        exchange
            .open_orders(&OpenOrdersFilter::symbol("BTCUSDT").to_params())
            .await
            .unwrap();

        let journal = exchange.journal().await;
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0], RecordedRequest::OpenOrders(RequestParams::new()));

        let silent = SimulatedExchange::new(SimulatedExchangeConfig {
            journal_capacity: 0,
            ..Default::default()
        });
        silent.account().await.unwrap();
        assert!(silent.last_request().await.is_none());
    }
}
