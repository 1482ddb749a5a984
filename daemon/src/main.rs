//! Dustproof daemon: entry point for running a verifier node.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use dustproof_node::{init_logging, LogFormat, ServiceConfig, VerifierNode};

#[derive(Parser)]
#[command(name = "dustproof-daemon", about = "Wallet ownership verification by micro-payment")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DUSTPROOF_CONFIG")]
    config: Option<PathBuf>,

    /// Solana JSON-RPC endpoint.
    #[arg(long, env = "SOLANA_RPC_URL")]
    rpc_url: Option<String>,

    /// Address incoming transfers are matched against.
    #[arg(long, env = "RECEIVING_ADDRESS")]
    receiving_address: Option<String>,

    /// Address shown to users; defaults to the receiving address.
    #[arg(long, env = "VANITY_ADDRESS")]
    display_address: Option<String>,

    /// Directory for the pending, verified and consumed collections.
    #[arg(long, env = "DUSTPROOF_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "PORT")]
    http_port: Option<u16>,

    /// WebSocket notifier port.
    #[arg(long, env = "LISTENER_PORT")]
    websocket_port: Option<u16>,

    /// Chain poll interval in milliseconds.
    #[arg(long, env = "SOLANA_POLL_INTERVAL")]
    poll_interval_ms: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DUSTPROOF_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DUSTPROOF_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the verifier until SIGINT/SIGTERM.
    Run,
    /// Print the effective configuration as TOML and exit.
    Config,
}

impl Cli {
    /// File settings (or defaults) with every flag/env override applied.
    fn service_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServiceConfig::default(),
        };

        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(address) = &self.receiving_address {
            config.receiving_address = address.clone();
        }
        if let Some(address) = &self.display_address {
            config.display_address = Some(address.clone());
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(port) = self.websocket_port {
            config.websocket_port = port;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.service_config()?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Run => {
            init_logging(config.log_format, &config.log_level);
            if let Some(path) = &cli.config {
                tracing::info!(path = %path.display(), "loaded config file");
            }
            config.validate().context("invalid configuration")?;

            let mut node = VerifierNode::new(config)?;
            node.run().await?;
            tracing::info!("dustproof daemon exited cleanly");
        }
    }

    Ok(())
}
