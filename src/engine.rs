use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::types::{
    HepsiburadaItem, HistoricalLows, Listing, MergedProduct, PriceCategory, ProductPriceRecord,
};

/// Reasons a listing is not fit for the price history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyBarcode,
    NegativePrice,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::EmptyBarcode => write!(f, "empty barcode"),
            Rejection::NegativePrice => write!(f, "negative price"),
        }
    }
}

/// Check a raw listing before it is stamped and persisted.
pub fn validate_listing(listing: &Listing) -> Result<(), Rejection> {
    if listing.barcode.trim().is_empty() {
        return Err(Rejection::EmptyBarcode);
    }
    if listing.sale_price < Decimal::ZERO {
        return Err(Rejection::NegativePrice);
    }
    Ok(())
}

/// Converts listings into timestamped records in a fixed timezone.
///
/// Within one stamper the captured instant never goes backwards, even if the
/// wall clock is stepped back mid-run.
#[derive(Debug, Clone)]
pub struct Timestamper {
    tz: Tz,
    last: Option<DateTime<Utc>>,
}

impl Timestamper {
    pub fn new(tz: Tz) -> Self {
        Self { tz, last: None }
    }

    pub fn stamp(&mut self, listing: Listing, now: DateTime<Utc>) -> ProductPriceRecord {
        let instant = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(instant);
        ProductPriceRecord {
            barcode: listing.barcode.trim().to_string(),
            title: listing.title,
            price: listing.sale_price,
            captured_at: instant.with_timezone(&self.tz),
        }
    }
}

/// Classify a candidate price against the trailing historical lows.
///
/// Windows are checked from narrowest to widest; a window with no history
/// never matches.
pub fn price_category(candidate: Decimal, lows: &HistoricalLows) -> PriceCategory {
    let at_or_below = |low: Option<Decimal>| low.is_some_and(|l| candidate <= l);
    if at_or_below(lows.week) {
        PriceCategory::OneWeekLow
    } else if at_or_below(lows.two_weeks) {
        PriceCategory::TwoWeekLow
    } else if at_or_below(lows.month) {
        PriceCategory::OneMonthLow
    } else {
        PriceCategory::None
    }
}

/// Combine the Trendyol catalog with a Hepsiburada catalog export.
///
/// A Trendyol listing matches the first Hepsiburada row whose merchant SKU or
/// barcode equals the listing's barcode, stock code or product main id. Every
/// listing yields one line, in order; Hepsiburada rows that matched nothing
/// are appended after them. Blank identifiers never match.
pub fn merge_catalogs(trendyol: &[Listing], hepsiburada: &[HepsiburadaItem]) -> Vec<MergedProduct> {
    let mut matched = vec![false; hepsiburada.len()];
    let mut merged = Vec::with_capacity(trendyol.len() + hepsiburada.len());

    for listing in trendyol {
        let ids: Vec<&str> = [
            Some(listing.barcode.as_str()),
            listing.stock_code.as_deref(),
            listing.product_main_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

        let hit = hepsiburada.iter().position(|hb| {
            [hb.merchant_sku.trim(), hb.barcode.trim()]
                .iter()
                .any(|key| !key.is_empty() && ids.contains(key))
        });
        if let Some(j) = hit {
            matched[j] = true;
        }

        merged.push(MergedProduct {
            stock_id: listing.barcode.trim().to_string(),
            hb_id: hit.map(|j| hepsiburada[j].hepsiburada_sku.clone()),
            product_name: listing.title.clone(),
            price: listing.sale_price,
            stock: listing.quantity.unwrap_or(0),
        });
    }

    for (hb, _) in hepsiburada.iter().zip(&matched).filter(|(_, m)| !**m) {
        merged.push(MergedProduct {
            stock_id: hb.merchant_sku.clone(),
            hb_id: Some(hb.hepsiburada_sku.clone()),
            product_name: hb.product_name.clone(),
            price: hb.price,
            stock: hb.stock,
        });
    }
    merged
}
