use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use tracing::info;

use opentip_checker::{BatchProcessor, Config, OpenTipClient};

#[derive(Parser, Debug)]
#[command(
    name = "opentip-checker",
    about = "Look up every domain of a spreadsheet in Kaspersky OpenTIP and save the results",
    version,
    long_about = None
)]
struct Args {
    /// Input spreadsheet (.xlsx, .xls, .ods or .csv) with a "Domain" column
    input: PathBuf,

    /// Output spreadsheet (.xlsx or .csv)
    output: PathBuf,

    /// OpenTIP API key
    api_key: String,

    /// Skip TLS certificate verification (unsafe, only for intercepting proxies)
    #[arg(long)]
    insecure: bool,

    /// Maximum API calls per second (0 disables pacing)
    #[arg(long)]
    requests_per_second: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Override the OpenTIP domain lookup endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Do not print the progress line
    #[arg(long)]
    no_progress: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if self.insecure {
            config.accept_invalid_certs = true;
        }
        if let Some(rate) = self.requests_per_second {
            config.requests_per_second = rate;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_seconds = timeout;
        }
        if let Some(endpoint) = &self.endpoint {
            config.api_endpoint = endpoint.clone();
        }
        if self.no_progress {
            config.show_progress = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Logs go to stderr so the progress line on stdout stays intact
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "opentip_checker=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load().context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid command line options")?;
    info!("Configuration loaded successfully");

    let config = Arc::new(config);
    let client = OpenTipClient::new(config.clone(), args.api_key.clone())
        .context("Failed to initialize OpenTIP client")?;

    let processor = BatchProcessor::new(client, config.show_progress);
    if processor.run(&args.input, &args.output).await {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
