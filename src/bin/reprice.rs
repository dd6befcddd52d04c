//! reprice — submit a sale/list price update for one barcode and report the
//! marketplace batch result.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{info, warn};

use marketplace_price_tracker::api::MarketplaceClient;
use marketplace_price_tracker::config::{ApiConfig, SETTINGS_PATH, SettingsConfig};
use marketplace_price_tracker::types::PriceUpdate;
use marketplace_price_tracker::{logging, reporter};

#[derive(Parser)]
#[command(name = "reprice", about = "Update the marketplace price of one product")]
struct Args {
    /// Product barcode
    #[arg(long)]
    barcode: String,

    /// New sale price
    #[arg(long)]
    sale_price: Decimal,

    /// New list price (must not be below the sale price)
    #[arg(long)]
    list_price: Decimal,

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
    if args.sale_price < Decimal::ZERO || args.list_price < Decimal::ZERO {
        bail!("prices must not be negative");
    }
    if args.sale_price > args.list_price {
        bail!(
            "--sale-price {} is above --list-price {}",
            args.sale_price,
            args.list_price
        );
    }

    let settings = SettingsConfig::load(&args.config)?;
    let api = ApiConfig::from_env()?;
    let client = MarketplaceClient::new(&api, &settings)?;

    let items = [PriceUpdate {
        barcode: barcode.to_string(),
        sale_price: args.sale_price,
        list_price: args.list_price,
    }];
    info!(
        "Submitting price update for {barcode}: sale={} list={}",
        args.sale_price, args.list_price
    );
    let batch_id = client
        .update_prices(&items)
        .await
        .context("price update was rejected")?;
    info!("Price update accepted — batchRequestId={batch_id}");

    // The marketplace processes batches asynchronously.
    tokio::time::sleep(settings.batch_check_delay()).await;

    let status = client
        .batch_status(&batch_id)
        .await
        .with_context(|| format!("failed to fetch status of batch {batch_id}"))?;
    reporter::report_batch(&status);

    if !status.all_succeeded() {
        for item in status.failures() {
            warn!(
                "{} -> {} {:?}",
                item.request_item.barcode.as_deref().unwrap_or("?"),
                item.status,
                item.failure_reasons
            );
        }
        bail!("batch {batch_id} did not fully succeed");
    }
    info!("Batch {batch_id} succeeded");
    Ok(())
}
