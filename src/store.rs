use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, MySqlPool, Row, Transaction};
use tracing::{debug, info};

use crate::config::{DatabaseConfig, SettingsConfig};
use crate::error::{TrackerError, is_unique_violation};
use crate::types::{HistoricalLows, ProductPriceRecord, StoredPriceRow};

const INSERT_PRICE: &str = "INSERT INTO priceTracking (barcode, title, price, capturedAt, capturedOffset) \
     VALUES (?, ?, ?, ?, ?)";

const LOWEST_PRICE_SINCE: &str =
    "SELECT MIN(price) FROM priceTracking WHERE barcode = ? AND capturedAt >= ?";

const LATEST_PRICE: &str =
    "SELECT price FROM priceTracking WHERE barcode = ? ORDER BY capturedAt DESC LIMIT 1";

const SELECT_HISTORY: &str = "SELECT barcode, title, price, capturedAt, capturedOffset \
     FROM priceTracking WHERE (? IS NULL OR barcode = ?) ORDER BY capturedAt, barcode";

/// One run's worth of appends to the price history.
///
/// Nothing appended is visible until `commit`; dropping an uncommitted batch
/// discards every row it staged.
#[async_trait]
pub trait PriceBatch: Send {
    /// Stage one record. A duplicate `(barcode, capturedAt)` yields
    /// `StorageConflict` and leaves the batch usable.
    async fn append(&mut self, record: &ProductPriceRecord) -> Result<(), TrackerError>;

    /// Make every staged row durable. Returns the number of rows written.
    async fn commit(self) -> Result<u64, TrackerError>;
}

/// Column values for `capturedAt`: the UTC instant plus the zone offset in
/// seconds east of UTC at that instant.
pub fn captured_columns(captured_at: &DateTime<Tz>) -> (NaiveDateTime, i32) {
    (
        captured_at.naive_utc(),
        captured_at.offset().fix().local_minus_utc(),
    )
}

/// Rebuild an offset-aware timestamp from stored columns.
pub fn captured_from_columns(
    utc: NaiveDateTime,
    offset_secs: i32,
) -> Result<DateTime<FixedOffset>, TrackerError> {
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| {
        TrackerError::StorageUnavailable(format!("stored offset {offset_secs}s is out of range"))
    })?;
    Ok(Utc.from_utc_datetime(&utc).with_timezone(&offset))
}

/// MySQL-backed price history (`priceTracking` table).
pub struct MySqlPriceStore {
    pool: MySqlPool,
}

impl MySqlPriceStore {
    pub async fn connect(
        db: &DatabaseConfig,
        settings: &SettingsConfig,
    ) -> Result<Self, TrackerError> {
        let options = MySqlConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .password(&db.password)
            .database(&db.name);
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(settings.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| {
                TrackerError::StorageUnavailable(format!(
                    "cannot connect to {}:{}/{}: {e}",
                    db.host, db.port, db.name
                ))
            })?;
        info!("Connected to price history at {}:{}/{}", db.host, db.port, db.name);
        Ok(Self { pool })
    }

    /// Open a transaction for one run.
    pub async fn begin(&self) -> Result<MySqlBatch, TrackerError> {
        let tx = self.pool.begin().await.map_err(storage_unavailable)?;
        Ok(MySqlBatch { tx, staged: 0 })
    }

    /// Lowest stored price for a barcode captured at or after `since`.
    pub async fn lowest_price_since(
        &self,
        barcode: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Decimal>, TrackerError> {
        sqlx::query_scalar::<_, Option<Decimal>>(LOWEST_PRICE_SINCE)
            .bind(barcode)
            .bind(since.naive_utc())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_unavailable)
    }

    pub async fn latest_price(&self, barcode: &str) -> Result<Option<Decimal>, TrackerError> {
        sqlx::query_scalar::<_, Decimal>(LATEST_PRICE)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_unavailable)
    }

    /// Lowest prices over the trailing 7, 14 and 30 days ending at `now`.
    pub async fn historical_lows(
        &self,
        barcode: &str,
        now: DateTime<Utc>,
    ) -> Result<HistoricalLows, TrackerError> {
        let since = |days: i64| now - Duration::days(days);
        Ok(HistoricalLows {
            week: self.lowest_price_since(barcode, since(7)).await?,
            two_weeks: self.lowest_price_since(barcode, since(14)).await?,
            month: self.lowest_price_since(barcode, since(30)).await?,
        })
    }

    /// Every stored row, oldest first, optionally for a single barcode.
    pub async fn history(&self, barcode: Option<&str>) -> Result<Vec<StoredPriceRow>, TrackerError> {
        let rows = sqlx::query(SELECT_HISTORY)
            .bind(barcode)
            .bind(barcode)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_unavailable)?;
        rows.iter()
            .map(|row| {
                let utc: NaiveDateTime = row.try_get("capturedAt").map_err(storage_unavailable)?;
                let offset: i32 = row.try_get("capturedOffset").map_err(storage_unavailable)?;
                Ok(StoredPriceRow {
                    barcode: row.try_get("barcode").map_err(storage_unavailable)?,
                    title: row.try_get("title").map_err(storage_unavailable)?,
                    price: row.try_get("price").map_err(storage_unavailable)?,
                    captured_at: captured_from_columns(utc, offset)?,
                })
            })
            .collect()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn storage_unavailable(err: sqlx::Error) -> TrackerError {
    TrackerError::StorageUnavailable(err.to_string())
}

pub struct MySqlBatch {
    tx: Transaction<'static, MySql>,
    staged: u64,
}

#[async_trait]
impl PriceBatch for MySqlBatch {
    async fn append(&mut self, record: &ProductPriceRecord) -> Result<(), TrackerError> {
        let (captured_utc, offset_secs) = captured_columns(&record.captured_at);
        let result = sqlx::query(INSERT_PRICE)
            .bind(&record.barcode)
            .bind(&record.title)
            .bind(record.price)
            .bind(captured_utc)
            .bind(offset_secs)
            .execute(&mut *self.tx)
            .await;
        match result {
            Ok(_) => {
                self.staged += 1;
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(TrackerError::StorageConflict {
                barcode: record.barcode.clone(),
            }),
            Err(e) => Err(storage_unavailable(e)),
        }
    }

    async fn commit(self) -> Result<u64, TrackerError> {
        self.tx.commit().await.map_err(storage_unavailable)?;
        debug!(rows = self.staged, "Committed price history batch");
        Ok(self.staged)
    }
}

/// In-process price history, used for dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    rows: Arc<Mutex<Vec<ProductPriceRecord>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> MemoryBatch {
        MemoryBatch {
            history: self.clone(),
            staged: Vec::new(),
        }
    }

    /// Snapshot of every committed row, in commit order.
    pub fn rows(&self) -> Result<Vec<ProductPriceRecord>, TrackerError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ProductPriceRecord>>, TrackerError> {
        self.rows
            .lock()
            .map_err(|_| TrackerError::StorageUnavailable("memory history lock poisoned".into()))
    }
}

pub struct MemoryBatch {
    history: MemoryHistory,
    staged: Vec<ProductPriceRecord>,
}

fn row_key(record: &ProductPriceRecord) -> (String, DateTime<Utc>) {
    (record.barcode.clone(), record.captured_at.with_timezone(&Utc))
}

#[async_trait]
impl PriceBatch for MemoryBatch {
    async fn append(&mut self, record: &ProductPriceRecord) -> Result<(), TrackerError> {
        let key = row_key(record);
        let duplicate = self.staged.iter().any(|r| row_key(r) == key)
            || self.history.lock()?.iter().any(|r| row_key(r) == key);
        if duplicate {
            return Err(TrackerError::StorageConflict {
                barcode: record.barcode.clone(),
            });
        }
        self.staged.push(record.clone());
        Ok(())
    }

    async fn commit(self) -> Result<u64, TrackerError> {
        let mut rows = self.history.lock()?;
        let existing: HashSet<_> = rows.iter().map(row_key).collect();
        if let Some(dup) = self.staged.iter().find(|r| existing.contains(&row_key(r))) {
            return Err(TrackerError::StorageConflict {
                barcode: dup.barcode.clone(),
            });
        }
        let written = self.staged.len() as u64;
        rows.extend(self.staged);
        Ok(written)
    }
}
