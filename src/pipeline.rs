use std::collections::HashSet;

use chrono_tz::Tz;
use futures_util::TryStreamExt;
use tracing::{debug, info, warn};

use crate::api::{ListingSource, fetch_listings};
use crate::clock::Clock;
use crate::engine::{Timestamper, validate_listing};
use crate::error::TrackerError;
use crate::store::PriceBatch;
use crate::types::RunSummary;

/// Run one fetch cycle: stream listings, stamp them, append them to `batch`.
///
/// The batch is committed only after the listing stream has been fully
/// drained, so any upstream or storage failure leaves history untouched.
/// A duplicate-key conflict skips that record and the run continues.
pub async fn run_cycle<S, B, C>(
    source: &S,
    mut batch: B,
    clock: &C,
    tz: Tz,
) -> Result<RunSummary, TrackerError>
where
    S: ListingSource + ?Sized,
    B: PriceBatch,
    C: Clock + ?Sized,
{
    let started_at = clock.now();
    let mut stamper = Timestamper::new(tz);
    let mut seen: HashSet<String> = HashSet::new();
    let mut fetched = 0u64;
    let mut skipped_invalid = 0u64;
    let mut skipped_duplicate = 0u64;
    let mut conflicts = 0u64;

    let listings = fetch_listings(source);
    let mut listings = std::pin::pin!(listings);

    while let Some(listing) = listings.try_next().await? {
        fetched += 1;

        if let Err(reason) = validate_listing(&listing) {
            warn!(barcode = %listing.barcode, %reason, "Skipping invalid listing");
            skipped_invalid += 1;
            continue;
        }
        if !seen.insert(listing.barcode.trim().to_string()) {
            warn!(barcode = %listing.barcode, "Skipping repeated barcode in this run");
            skipped_duplicate += 1;
            continue;
        }

        let record = stamper.stamp(listing, clock.now());
        match batch.append(&record).await {
            Ok(()) => debug!(
                barcode = %record.barcode,
                title = %record.title,
                price = %record.price,
                "Staged price"
            ),
            Err(TrackerError::StorageConflict { barcode }) => {
                warn!(%barcode, captured_at = %record.captured_at, "Price row already exists, skipping");
                conflicts += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let written = batch.commit().await?;
    info!(
        fetched,
        written, skipped_invalid, skipped_duplicate, conflicts, "Price tracking cycle complete"
    );

    Ok(RunSummary {
        started_at,
        finished_at: clock.now(),
        dry_run: false,
        fetched,
        written,
        skipped_invalid,
        skipped_duplicate,
        conflicts,
    })
}
