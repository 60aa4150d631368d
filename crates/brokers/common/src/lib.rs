//! Exchange clients shared across brokers.
//!
//! `simulated` is an in-memory paper exchange used for dry runs and tests.

pub mod simulated;

pub use simulated::{RecordedRequest, SimulatedConnector, SimulatedExchange, SimulatedExchangeConfig};
