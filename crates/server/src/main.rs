use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use storefront_server::{LogFormat, ServerConfig, StoreArgs, StorefrontServer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, env = "STOREFRONT_BIND_ADDRESS", default_value = "127.0.0.1")]
    bind_address: String,

    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, env = "STOREFRONT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "STOREFRONT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(flatten)]
    store: StoreArgs,

    /// TOML file; when given, the other flags are ignored
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path).await?
    } else {
        ServerConfig {
            bind_address: args.bind_address,
            port: args.port,
            log_level: args.log_level,
            log_format: args.log_format,
            tls: None,
            store: args.store.into_store_config(),
        }
    };

    StorefrontServer::new(config).run().await
}
