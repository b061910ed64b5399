//! Per-SKU scan history reads and the monthly clear.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::errors::ServiceError;
use crate::models::{HistoryEntry, HistoryFilter, Location};
use crate::stores::HistoryStore;

/// Inclusive bounds of the calendar month containing `now`.
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap_or(now.date_naive());
    let next = if now.month() == 12 {
        NaiveDate::from_ymd_opt(now.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(now.year(), now.month() + 1, 1)
    }
    .unwrap_or(first + Duration::days(31));

    let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).unwrap_or_default());
    let end = Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).unwrap_or_default())
        - Duration::microseconds(1);
    (start, end)
}

pub struct HistoryService {
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
}

impl HistoryService {
    pub fn new(history: Arc<dyn HistoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { history, clock }
    }

    pub async fn search(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, ServiceError> {
        Ok(self.history.query_history(filter).await?)
    }

    /// This month's scans of `barcode` at `location`, newest first.
    #[instrument(skip(self))]
    pub async fn monthly_for_sku(
        &self,
        barcode: &str,
        location: Location,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        let filter = self.monthly_filter(barcode, location)?;
        Ok(self.history.query_history(&filter).await?)
    }

    /// Deletes this month's scans of `barcode` at `location`.
    #[instrument(skip(self))]
    pub async fn clear_monthly_for_sku(
        &self,
        barcode: &str,
        location: Location,
    ) -> Result<u64, ServiceError> {
        let filter = self.monthly_filter(barcode, location)?;
        let deleted = self.history.delete_history(&filter).await?;
        info!(%barcode, %location, deleted, "Cleared monthly scan history");
        Ok(deleted)
    }

    fn monthly_filter(&self, barcode: &str, location: Location) -> Result<HistoryFilter, ServiceError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(ServiceError::ValidationError(
                "Please enter a barcode.".to_string(),
            ));
        }
        let (start, end) = month_bounds(self.clock.now());
        Ok(HistoryFilter::for_barcode(barcode, location).between(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2026, 10, 17, "2026-10-01T00:00:00", "2026-10-31T23:59:59")]
    #[case(2026, 12, 31, "2026-12-01T00:00:00", "2026-12-31T23:59:59")]
    #[case(2028, 2, 10, "2028-02-01T00:00:00", "2028-02-29T23:59:59")]
    fn month_bounds_cover_the_whole_month(
        #[case] y: i32,
        #[case] m: u32,
        #[case] d: u32,
        #[case] start: &str,
        #[case] end: &str,
    ) {
        let now = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        let (from, to) = month_bounds(now);
        assert_eq!(from.format("%Y-%m-%dT%H:%M:%S").to_string(), start);
        assert_eq!(to.format("%Y-%m-%dT%H:%M:%S").to_string(), end);
    }
}
