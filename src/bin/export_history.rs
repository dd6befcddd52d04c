//! export-history — dump the stored price history as JSON lines, oldest first.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use marketplace_price_tracker::config::{DatabaseConfig, SETTINGS_PATH, SettingsConfig};
use marketplace_price_tracker::store::MySqlPriceStore;
use marketplace_price_tracker::{logging, reporter};

#[derive(Parser)]
#[command(name = "export-history", about = "Print the stored price history as JSON lines")]
struct Args {
    /// Only export rows for this barcode
    #[arg(long)]
    barcode: Option<String>,

    /// Optional TOML settings file
    #[arg(long, default_value = SETTINGS_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let barcode = args
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let settings = SettingsConfig::load(&args.config)?;
    let db = DatabaseConfig::from_env()?;
    let store = MySqlPriceStore::connect(&db, &settings).await?;
    let rows = store.history(barcode).await;
    store.close().await;
    let rows = rows?;

    for row in &rows {
        reporter::report_history_row(row);
    }
    info!("Exported {} history rows", rows.len());
    Ok(())
}
