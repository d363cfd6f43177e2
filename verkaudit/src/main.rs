//! Verkaudit - Verkada Audit Log Report Tool
//!
//! Prints audit events of interest and camera notifications for one window
use clap::Parser;
use log::info;
use verkada_platform::VerkadaSession;
use verkaudit::{ReportOptions, Result, cli, credentials, datetime, run_report};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse CLI arguments
    let args = cli::Cli::parse();

    info!("Verkaudit - Verkada Audit Log Report Tool");

    let options = ReportOptions::from_cli(&args, datetime::now_epoch_secs())?;
    let config = credentials::load_config_from_env(args.region)?;
    info!("Using Verkada region {} ({})", config.region, config.base_url);

    let session = VerkadaSession::new(config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_report(&session, &options, &mut out).await?;

    Ok(())
}
