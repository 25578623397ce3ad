//! Token lifecycle demo.
//!
//! Creates a token with Metaplex metadata, mints 10.00 of it to the
//! configured wallet, and transfers 9.00 to the recipient, printing an
//! explorer link for each transaction. Every parameter is embedded in
//! `config.rs`; put the wallet's secret key there before running.
//!
//! ```bash
//! RUST_LOG=info cargo run --release -p token-demo
//! ```

use std::process::ExitCode;

use ledger_client::create_solana_client;
use tracing_subscriber::EnvFilter;

use token_demo::{run_pipeline, DemoConfig, DemoError, Identities, PipelineReport, Plan};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(report) => {
            tracing::info!(mint = %report.mint, "token demo finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "token demo failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<PipelineReport, DemoError> {
    let config = DemoConfig::default();
    // Key decoding happens before any network call.
    let identities = Identities::load(&config)?;
    let client = create_solana_client(&config.cluster)?;
    run_pipeline(&client, &identities, &Plan::from(&config)).await
}
