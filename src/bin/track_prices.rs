//! track-prices — append the seller's current listing prices to the price
//! history table. Meant to be run from cron; exits non-zero on any failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use marketplace_price_tracker::api::MarketplaceClient;
use marketplace_price_tracker::clock::SystemClock;
use marketplace_price_tracker::config::{
    ApiConfig, AppConfig, SETTINGS_PATH, SettingsConfig, timezone_from_env,
};
use marketplace_price_tracker::error::TrackerError;
use marketplace_price_tracker::pipeline::run_cycle;
use marketplace_price_tracker::store::{MemoryHistory, MySqlPriceStore};
use marketplace_price_tracker::types::RunSummary;
use marketplace_price_tracker::{logging, reporter};

#[derive(Parser)]
#[command(
    name = "track-prices",
    about = "Append current marketplace listing prices to the price history"
)]
struct Args {
    /// Optional TOML settings file
    #[arg(long, default_value = SETTINGS_PATH)]
    config: PathBuf,

    /// Fetch and timestamp listings, print them, and skip the database
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let result = if args.dry_run {
        dry_run(&args).await
    } else {
        track(&args).await
    };

    match result {
        Ok(summary) => {
            reporter::report_run(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(category = e.category(), "Price tracking run failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn track(args: &Args) -> Result<RunSummary, TrackerError> {
    let settings = SettingsConfig::load(&args.config)?;
    let config = AppConfig::from_env(settings)?;
    info!(
        "Starting price tracking run — seller={} timezone={} page_size={}",
        config.api.seller_id, config.timezone, config.settings.page_size
    );

    // Connect before fetching so an unreachable database costs no API calls.
    let store = MySqlPriceStore::connect(&config.database, &config.settings).await?;
    let client = MarketplaceClient::new(&config.api, &config.settings)?;

    let result = match store.begin().await {
        Ok(batch) => run_cycle(&client, batch, &SystemClock, config.timezone).await,
        Err(e) => Err(e),
    };
    store.close().await;
    result
}

async fn dry_run(args: &Args) -> Result<RunSummary, TrackerError> {
    let settings = SettingsConfig::load(&args.config)?;
    let api = ApiConfig::from_env()?;
    let tz = timezone_from_env()?;
    info!("Starting dry run — seller={} timezone={tz}", api.seller_id);

    let client = MarketplaceClient::new(&api, &settings)?;
    let history = MemoryHistory::new();
    let mut summary = run_cycle(&client, history.begin(), &SystemClock, tz).await?;
    for record in history.rows()? {
        reporter::report_record(&record);
    }
    summary.dry_run = true;
    Ok(summary)
}
