//! Teller command-line interface

use anyhow::Context;
use clap::{Parser, Subcommand};
use ledger_core::{CustomerId, CustomerSecret, Request, Response};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use teller::{BankClient, CustomerSigner, LastHashStore};

#[derive(Parser)]
#[command(name = "teller")]
#[command(about = "Teller for the verifiable ledger bank", long_about = None)]
struct Cli {
    /// Bank address
    #[arg(long, env = "TELLER_BANK_ADDR", default_value = "127.0.0.1:3876")]
    addr: String,

    /// File holding the last known hash per customer
    #[arg(long, default_value = "tellerLog.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new customer
    Register,

    /// Check balance for a customer
    Balance {
        /// Customer ID (base64 public key)
        customer_id: String,
        /// Customer secret returned at registration
        secret: String,
    },

    /// Deposit funds for a customer
    Deposit {
        /// Customer ID (base64 public key)
        customer_id: String,
        /// Customer secret returned at registration
        secret: String,
        /// Amount to deposit
        amount: Decimal,
    },

    /// Withdraw funds for a customer
    Withdraw {
        /// Customer ID (base64 public key)
        customer_id: String,
        /// Customer secret returned at registration
        secret: String,
        /// Amount to withdraw
        amount: Decimal,
    },
}

fn signer(customer_id: &str, secret: String) -> anyhow::Result<CustomerSigner> {
    let customer_id = CustomerId::from_base64(customer_id).context("Invalid customer ID")?;
    Ok(CustomerSigner::for_customer(
        &customer_id,
        &CustomerSecret::new(secret),
    )?)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing (stderr, so stdout stays machine readable)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut state = LastHashStore::load(&cli.state)
        .with_context(|| format!("Failed to load {}", cli.state.display()))?;

    let request = match cli.command {
        Commands::Register => Request::register(),
        Commands::Balance {
            customer_id,
            secret,
        } => {
            let signer = signer(&customer_id, secret)?;
            signer.balance(state.get(&signer.customer_id()))
        }
        Commands::Deposit {
            customer_id,
            secret,
            amount,
        } => {
            let signer = signer(&customer_id, secret)?;
            signer.deposit(amount, state.get(&signer.customer_id()))
        }
        Commands::Withdraw {
            customer_id,
            secret,
            amount,
        } => {
            let signer = signer(&customer_id, secret)?;
            signer.withdraw(amount, state.get(&signer.customer_id()))
        }
    };

    let client = BankClient::new(&cli.addr);
    let response = client
        .send(&request)
        .await
        .with_context(|| format!("Failed to reach bank at {}", cli.addr))?;

    if state.record(&response) {
        state.save().context("Failed to save teller state")?;
    }

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(match response {
        Response::Error { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}
