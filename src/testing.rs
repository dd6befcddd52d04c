//! Shared fakes for unit tests.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::api::ListingSource;
use crate::clock::Clock;
use crate::error::TrackerError;
use crate::store::PriceBatch;
use crate::types::{Listing, ListingPage, ProductPriceRecord};

pub fn listing(barcode: &str, price: Decimal) -> Listing {
    Listing {
        barcode: barcode.to_string(),
        title: format!("Product {barcode}"),
        sale_price: price,
        stock_code: None,
        product_main_id: None,
        quantity: None,
    }
}

pub fn page(content: Vec<Listing>, total_pages: u32) -> ListingPage {
    let size = content.len() as u32;
    ListingPage {
        content,
        total_pages,
        page: 0,
        size,
        total_elements: 0,
    }
}

/// Serves scripted pages in order; records which page indices were asked for.
pub struct FakeSource {
    pages: Mutex<VecDeque<Result<ListingPage, TrackerError>>>,
    requested: Mutex<Vec<u32>>,
}

impl FakeSource {
    pub fn new(pages: Vec<Result<ListingPage, TrackerError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn fetch_page(&self, page_index: u32) -> Result<ListingPage, TrackerError> {
        self.requested.lock().unwrap().push(page_index);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(page(Vec::new(), 0)))
    }
}

/// Clock that advances by a fixed step on every reading.
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl StepClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + self.step;
        now
    }
}

/// Batch whose storage goes away after a number of successful appends.
pub struct FailingBatch {
    pub remaining: usize,
}

#[async_trait]
impl PriceBatch for FailingBatch {
    async fn append(&mut self, _record: &ProductPriceRecord) -> Result<(), TrackerError> {
        if self.remaining == 0 {
            return Err(TrackerError::StorageUnavailable("connection reset".into()));
        }
        self.remaining -= 1;
        Ok(())
    }

    async fn commit(self) -> Result<u64, TrackerError> {
        Err(TrackerError::StorageUnavailable("commit after failure".into()))
    }
}
