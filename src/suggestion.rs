//! Pending price suggestions.
//!
//! A suggestion is the only thing handed to the approval workflow: the
//! ingestion pipeline never talks to it directly.

use chrono::DateTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::price_category;
use crate::types::{HistoricalLows, PriceCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
}

/// A proposed price change awaiting human approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSuggestion {
    pub barcode: String,
    pub current_price: Option<Decimal>,
    pub proposed_price: Decimal,
    pub category: PriceCategory,
    pub lows: HistoricalLows,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Tz>,
}

impl PriceSuggestion {
    pub fn new(
        barcode: &str,
        current_price: Option<Decimal>,
        proposed_price: Decimal,
        lows: HistoricalLows,
        created_at: DateTime<Tz>,
    ) -> Self {
        Self {
            barcode: barcode.to_string(),
            current_price,
            proposed_price,
            category: price_category(proposed_price, &lows),
            lows,
            status: SuggestionStatus::Pending,
            created_at,
        }
    }

    /// True if the proposed price undercuts at least one trailing low.
    pub fn is_notable(&self) -> bool {
        self.category != PriceCategory::None
    }
}
