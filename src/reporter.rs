use serde::Serialize;
use tracing::warn;

use crate::suggestion::PriceSuggestion;
use crate::types::{BatchStatus, MergedProduct, ProductPriceRecord, RunSummary, StoredPriceRow};

/// Emit any serializable value as a single JSON line to stdout.
fn emit_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Failed to serialize report: {e}"),
    }
}

/// Emit the run summary as a single JSON line to stdout.
pub fn report_run(summary: &RunSummary) {
    emit_line(summary);
}

/// Emit one captured record (dry runs only).
pub fn report_record(record: &ProductPriceRecord) {
    emit_line(record);
}

/// Emit one row of stored price history.
pub fn report_history_row(row: &StoredPriceRow) {
    emit_line(row);
}

/// Emit one line of a merged catalog.
pub fn report_merged(product: &MergedProduct) {
    emit_line(product);
}

/// Emit a price suggestion as pretty-printed JSON to stdout.
pub fn report_suggestion(suggestion: &PriceSuggestion) {
    match serde_json::to_string_pretty(suggestion) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Failed to serialize suggestion: {e}"),
    }
}

/// Emit a batch request result as pretty-printed JSON to stdout.
pub fn report_batch(status: &BatchStatus) {
    match serde_json::to_string_pretty(status) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Failed to serialize batch status: {e}"),
    }
}
