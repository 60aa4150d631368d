use anyhow::{Context, Result};
use serde::Deserialize;
use spotdesk_brokers_crypto::BinanceConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

/// Settings loaded from the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeSection,
    pub keystore: KeystoreSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExchangeSection {
    /// Use the Binance spot testnet endpoint.
    pub testnet: bool,
    /// Overrides the endpoint picked by `testnet`.
    pub base_url: Option<String>,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        let defaults = BinanceConfig::default();
        Self {
            testnet: false,
            base_url: None,
            recv_window_ms: defaults.recv_window_ms,
            timeout_secs: defaults.timeout_secs,
        }
    }
}

impl ExchangeSection {
    pub fn binance_config(&self) -> BinanceConfig {
        let mut config = if self.testnet {
            BinanceConfig::testnet()
        } else {
            BinanceConfig::default()
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        config.recv_window_ms = self.recv_window_ms;
        config.timeout_secs = self.timeout_secs;
        config
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeystoreSection {
    pub path: Option<PathBuf>,
}

impl KeystoreSection {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_keystore_path)
    }
}

/// `$HOME/.config/spotdesk/credentials.json`, or the working directory when
/// `HOME` is unset.
pub fn default_keystore_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("spotdesk")
            .join("credentials.json"),
        None => PathBuf::from("spotdesk-credentials.json"),
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    /// Install the tracing subscriber. Logs go to stderr; stdout belongs to
    /// the tool protocol.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        let builder = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr);

        match self.format.as_str() {
            "json" => builder.json().init(),
            _ => builder.init(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotdesk_brokers_crypto::binance::{MAINNET_URL, TESTNET_URL};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.exchange.binance_config(), BinanceConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(config.keystore.path.is_none());
    }

    #[test]
    fn test_testnet_and_overrides() {
        let config = AppConfig::parse(
            r#"
            [exchange]
            testnet = true
            recv_window_ms = 10000

            [keystore]
            path = "/tmp/keys.json"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        let binance = config.exchange.binance_config();
        assert_eq!(binance.base_url, TESTNET_URL);
        assert_eq!(binance.recv_window_ms, 10000);
        assert_eq!(binance.timeout_secs, 10);
        assert_eq!(config.keystore.resolved_path(), PathBuf::from("/tmp/keys.json"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_base_url_wins_over_testnet_flag() {
        let config = AppConfig::parse(
            r#"
            [exchange]
            testnet = true
            base_url = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.exchange.binance_config().base_url, "http://localhost:9000");
        assert_ne!(config.exchange.binance_config().base_url, MAINNET_URL);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = Path::new("/definitely/not/here/spotdesk.toml");
        assert!(AppConfig::load(Some(path)).is_err());
        assert!(AppConfig::load(None).is_ok());
    }
}
