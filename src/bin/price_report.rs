//! price-report — classify a candidate price against a barcode's stored
//! history and print the resulting pending price suggestion.

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;

use marketplace_price_tracker::config::{
    DatabaseConfig, SETTINGS_PATH, SettingsConfig, timezone_from_env,
};
use marketplace_price_tracker::store::MySqlPriceStore;
use marketplace_price_tracker::suggestion::PriceSuggestion;
use marketplace_price_tracker::{logging, reporter};

#[derive(Parser)]
#[command(
    name = "price-report",
    about = "Compare a candidate price with the 1-week, 2-week and 1-month lows"
)]
struct Args {
    /// Product barcode
    #[arg(long)]
    barcode: String,

    /// Candidate price to classify
    #[arg(long)]
    price: Decimal,

    /// Optional TOML settings file
    #[arg(long, default_value = SETTINGS_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let barcode = args.barcode.trim();
    if barcode.is_empty() {
        bail!("--barcode must not be empty");
    }
    if args.price < Decimal::ZERO {
        bail!("--price must not be negative");
    }

    let settings = SettingsConfig::load(&args.config)?;
    let db = DatabaseConfig::from_env()?;
    let tz = timezone_from_env()?;
    let store = MySqlPriceStore::connect(&db, &settings).await?;

    let now_utc = Utc::now();
    let now = now_utc.with_timezone(&tz);
    let lows = store.historical_lows(barcode, now_utc).await?;
    let current = store.latest_price(barcode).await?;
    store.close().await;

    let suggestion = PriceSuggestion::new(barcode, current, args.price, lows, now);
    if suggestion.is_notable() {
        info!(
            "{barcode}: candidate {} is a {:?}",
            args.price, suggestion.category
        );
    } else {
        info!("{barcode}: candidate {} is above every recent low", args.price);
    }
    reporter::report_suggestion(&suggestion);
    Ok(())
}
