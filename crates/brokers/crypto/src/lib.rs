//! Crypto exchange broker adapter.
//!
//! Direct REST integration with Binance spot. Requests are signed locally
//! with HMAC-SHA256; nothing is retried or cached.

pub mod binance;
pub mod signing;

pub use binance::{BinanceConfig, BinanceConnector, BinanceSpotClient};
