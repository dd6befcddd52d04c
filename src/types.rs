use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One active listing as returned by the marketplace product endpoint.
///
/// Only the fields the tracker and the catalog merge use are decoded;
/// everything else in the payload (`listPrice`, `images`, ...) is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub barcode: String,
    #[serde(default)]
    pub title: String,
    pub sale_price: Decimal,
    #[serde(default)]
    pub stock_code: Option<String>,
    #[serde(default)]
    pub product_main_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// A single page of the product listing endpoint (0-based page index).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    #[serde(default)]
    pub content: Vec<Listing>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_elements: u64,
}

/// A timestamped price observation, ready to be appended to history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPriceRecord {
    pub barcode: String,
    pub title: String,
    pub price: Decimal,
    pub captured_at: DateTime<Tz>,
}

/// A row read back from the price history, with the offset it was captured in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPriceRow {
    pub barcode: String,
    pub title: String,
    pub price: Decimal,
    pub captured_at: DateTime<FixedOffset>,
}

/// Outcome of one fetch cycle, emitted as a JSON line at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub fetched: u64,
    pub written: u64,
    pub skipped_invalid: u64,
    pub skipped_duplicate: u64,
    pub conflicts: u64,
}

/// Where a candidate price sits relative to recent history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceCategory {
    #[serde(rename = "1-week-low")]
    OneWeekLow,
    #[serde(rename = "2-week-low")]
    TwoWeekLow,
    #[serde(rename = "1-month-low")]
    OneMonthLow,
    #[serde(rename = "none")]
    None,
}

/// Lowest stored prices for a barcode over the trailing windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HistoricalLows {
    pub week: Option<Decimal>,
    pub two_weeks: Option<Decimal>,
    pub month: Option<Decimal>,
}

/// One item of a price-and-inventory update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub barcode: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub list_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceUpdateRequest<'a> {
    pub items: &'a [PriceUpdate],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdateResponse {
    pub batch_request_id: String,
}

/// Result of an asynchronous marketplace batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    #[serde(default)]
    pub batch_request_id: Option<String>,
    #[serde(default)]
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub request_item: BatchRequestItem,
    pub status: String,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequestItem {
    #[serde(default)]
    pub barcode: Option<String>,
}

/// One row of a Hepsiburada catalog export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HepsiburadaItem {
    pub merchant_sku: String,
    pub hepsiburada_sku: String,
    pub product_name: String,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub barcode: String,
}

/// One line of the combined Trendyol + Hepsiburada catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedProduct {
    pub stock_id: String,
    pub hb_id: Option<String>,
    pub product_name: String,
    pub price: Decimal,
    pub stock: u32,
}

impl BatchStatus {
    /// True when every item in the batch reported `SUCCESS`.
    ///
    /// An empty batch is not considered successful: the marketplace has not
    /// processed it yet.
    pub fn all_succeeded(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.status == "SUCCESS")
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| i.status != "SUCCESS")
    }
}
