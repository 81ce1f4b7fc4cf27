//! Bank server binary

use anyhow::Context;
use clap::Parser;
use ledger_core::{
    server, spawn_ledger_actor, CommandProcessor, Config, EncryptedStore, KeyPair, Ledger,
    Metrics, StoreKey,
};
use std::path::PathBuf;
use tokio::net::TcpListener;

/// Verifiable ledger bank
#[derive(Parser, Debug)]
#[command(name = "bank", version, about)]
struct Args {
    /// Base64 store key (see `secret-key`)
    #[arg(env = "BANK_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// TOML configuration file
    #[arg(long, env = "BANK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Starting bank");

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env_overrides()?,
        None => Config::from_env()?,
    };

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let store_key = StoreKey::from_base64(&args.secret_key).context("Invalid secret key")?;
    let authority = KeyPair::load_or_generate(config.keys_path())
        .context("Failed to load authority keys")?;

    // Open ledger; refuse to serve a log that fails to decrypt or verify
    let store = EncryptedStore::new(config.ledger_path(), store_key);
    let ledger = Ledger::open(store, authority).context("Ledger failed verification")?;
    tracing::info!(entries = ledger.len(), "Ledger opened successfully");

    let metrics = Metrics::new().context("Failed to register metrics")?;
    let processor = CommandProcessor::new(ledger, metrics.clone());
    let (handle, actor) = spawn_ledger_actor(processor, config.mailbox_capacity);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    server::serve(listener, handle.clone(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await?;

    tracing::info!("Shutting down bank");
    handle.shutdown().await?;
    actor.await.context("Ledger actor panicked")?;

    tracing::info!("Final metrics:\n{}", metrics.render());
    Ok(())
}
