//! merge-catalogs — fetch the live Trendyol catalog, merge it with a
//! Hepsiburada CSV export and print the combined catalog as JSON lines.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::TryStreamExt;
use tracing::info;

use marketplace_price_tracker::api::{MarketplaceClient, fetch_listings};
use marketplace_price_tracker::catalog::read_hepsiburada;
use marketplace_price_tracker::config::{ApiConfig, SETTINGS_PATH, SettingsConfig};
use marketplace_price_tracker::engine::merge_catalogs;
use marketplace_price_tracker::{logging, reporter};

#[derive(Parser)]
#[command(
    name = "merge-catalogs",
    about = "Match Trendyol listings with a Hepsiburada catalog export"
)]
struct Args {
    /// Hepsiburada catalog CSV
    #[arg(long)]
    hepsiburada: PathBuf,

    /// Optional TOML settings file
    #[arg(long, default_value = SETTINGS_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let file = File::open(&args.hepsiburada)
        .with_context(|| format!("open {}", args.hepsiburada.display()))?;
    let hepsiburada = read_hepsiburada(file)
        .with_context(|| format!("parse {}", args.hepsiburada.display()))?;

    let settings = SettingsConfig::load(&args.config)?;
    let api = ApiConfig::from_env()?;
    let client = MarketplaceClient::new(&api, &settings)?;
    let trendyol: Vec<_> = fetch_listings(&client).try_collect().await?;

    let merged = merge_catalogs(&trendyol, &hepsiburada);
    let matched = merged
        .iter()
        .take(trendyol.len())
        .filter(|m| m.hb_id.is_some())
        .count();
    info!(
        "Merged {} Trendyol listings with {} Hepsiburada rows ({matched} matched)",
        trendyol.len(),
        hepsiburada.len()
    );
    for product in &merged {
        reporter::report_merged(product);
    }
    Ok(())
}
