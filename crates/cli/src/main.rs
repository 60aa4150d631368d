mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spotdesk_api::{registry, serve_stdio, SpotdeskServer, ToolRouter};
use spotdesk_brokers_common::{SimulatedConnector, SimulatedExchange};
use spotdesk_brokers_crypto::BinanceConnector;
use spotdesk_core::{CredentialStore, Credentials, ExchangeConnector};
use spotdesk_engine::SpotTrader;
use spotdesk_keystore::{FileKeyStore, MemoryKeyStore};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "spotdesk")]
#[command(about = "Binance spot trading tools for agent orchestrators")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SPOTDESK_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long, env = "SPOTDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the API key file
    #[arg(long, env = "SPOTDESK_KEYSTORE")]
    keystore: Option<PathBuf>,

    /// Trade against the Binance spot testnet
    #[arg(long)]
    testnet: bool,

    /// Use the in-memory paper exchange instead of Binance
    #[arg(long)]
    paper: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the trading tools over stdin/stdout (default)
    Serve,

    /// Print the tool descriptors as JSON
    Tools,

    /// Invoke a single tool and print its result
    Call {
        /// Tool name (e.g. "get_balances")
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Store API keys in the key file
    Configure {
        #[arg(long, env = "BINANCE_API_KEY")]
        api_key: String,

        #[arg(long, env = "BINANCE_API_SECRET", hide_env_values = true)]
        api_secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if cli.testnet {
        config.exchange.testnet = true;
    }
    if let Some(path) = cli.keystore {
        config.keystore.path = Some(path);
    }
    config.logging.init();

    let command = cli.command.unwrap_or(Commands::Serve);
    if let Commands::Tools = command {
        println!("{}", serde_json::to_string_pretty(&registry::all_tools())?);
        return Ok(());
    }

    let trader = Arc::new(build_trader(&config, cli.paper));
    let router = ToolRouter::new(trader.clone());

    match command {
        Commands::Serve => {
            if !trader.initialize().await? {
                tracing::warn!("No API keys stored; call configure_api_keys before trading");
            }
            serve_stdio(SpotdeskServer::new(router)).await?;
        }
        Commands::Call { tool, args } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            trader.initialize().await?;
            let result = router.call(&tool, args).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Configure {
            api_key,
            api_secret,
        } => {
            let args = serde_json::json!({ "apiKey": api_key, "apiSecret": api_secret });
            router.call(registry::CONFIGURE_API_KEYS, args).await?;
            println!("API keys stored");
        }
        Commands::Tools => {}
    }

    Ok(())
}

fn build_trader(config: &AppConfig, paper: bool) -> SpotTrader {
    let (store, connector): (Arc<dyn CredentialStore>, Arc<dyn ExchangeConnector>) = if paper {
        tracing::info!("Paper trading against the simulated exchange");
        (
            Arc::new(MemoryKeyStore::with_credentials(Credentials::new(
                "paper", "paper",
            ))),
            Arc::new(SimulatedConnector::new(Arc::new(SimulatedExchange::default()))),
        )
    } else {
        let binance = config.exchange.binance_config();
        tracing::info!(
            base_url = %binance.base_url,
            keystore = %config.keystore.resolved_path().display(),
            "Trading against Binance spot"
        );
        (
            Arc::new(FileKeyStore::new(config.keystore.resolved_path())),
            Arc::new(BinanceConnector::new(binance)),
        )
    };
    SpotTrader::new(store, connector)
}
