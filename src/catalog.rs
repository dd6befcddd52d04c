//! Hepsiburada catalog exports (CSV with a header row).
use std::io::Read;

use csv::{ReaderBuilder, Trim};

use crate::types::HepsiburadaItem;

/// Decode every row of a catalog export. Expected headers: `merchantSku`,
/// `hepsiburadaSku`, `productName`, `price`, `stock` and optionally `barcode`.
pub fn read_hepsiburada<R: Read>(reader: R) -> Result<Vec<HepsiburadaItem>, csv::Error> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect()
}
