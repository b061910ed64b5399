//! Aggregates behind the dashboard: scan volume over time, busiest SKUs and
//! weekly-count activity. Data only; rendering is the client's job.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::{CountSession, HistoryEntry, HistoryFilter, Location, SessionKind};
use crate::stores::{HistoryStore, SessionStore};

const TOP_N: usize = 10;
const TREND_WEEKS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyTotal {
    pub date: NaiveDate,
    /// Scans up to and including this day.
    pub cumulative: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuScanCount {
    pub barcode: String,
    pub scans: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuLocationCounts {
    pub barcode: String,
    /// Scan counts keyed by location code, every location present.
    pub by_location: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeekTrend {
    pub iso_year: i32,
    pub iso_week: u32,
    /// SKUs counted per weekday, Monday first, seven entries.
    pub per_day: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub progress_over_time: Vec<DailyTotal>,
    pub top_skus: Vec<SkuScanCount>,
    pub scans_by_location: Vec<SkuLocationCounts>,
    pub weekly_trends: Vec<WeekTrend>,
}

/// Cumulative scans per calendar day, ascending.
pub fn progress_over_time(entries: &[HistoryEntry]) -> Vec<DailyTotal> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for entry in entries {
        *per_day.entry(entry.timestamp.date_naive()).or_default() += 1;
    }
    let mut running = 0;
    per_day
        .into_iter()
        .map(|(date, count)| {
            running += count;
            DailyTotal {
                date,
                cumulative: running,
            }
        })
        .collect()
}

fn ranked(counts: HashMap<&str, u64>) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(barcode, n)| (barcode.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}

/// The ten most-scanned barcodes; ties broken by barcode.
pub fn top_skus(entries: &[HistoryEntry]) -> Vec<SkuScanCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.barcode.as_str()).or_default() += 1;
    }
    ranked(counts)
        .into_iter()
        .map(|(barcode, scans)| SkuScanCount { barcode, scans })
        .collect()
}

/// Per-location scan counts for the ten busiest barcodes.
pub fn scans_by_location(entries: &[HistoryEntry]) -> Vec<SkuLocationCounts> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    let mut per_location: HashMap<(&str, Location), u64> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.barcode.as_str()).or_default() += 1;
        *per_location
            .entry((entry.barcode.as_str(), entry.location))
            .or_default() += 1;
    }
    ranked(counts)
        .into_iter()
        .map(|(barcode, _)| {
            let by_location = Location::all()
                .into_iter()
                .map(|location| {
                    let n = per_location
                        .get(&(barcode.as_str(), location))
                        .copied()
                        .unwrap_or(0);
                    (location.to_string(), n)
                })
                .collect();
            SkuLocationCounts {
                barcode,
                by_location,
            }
        })
        .collect()
}

/// SKUs counted per weekday for the last four ISO weeks with weekly activity.
/// Sessions are placed by when they were last updated.
pub fn weekly_trends(sessions: &[CountSession]) -> Vec<WeekTrend> {
    let mut weeks: BTreeMap<(i32, u32), [u64; 7]> = BTreeMap::new();
    for session in sessions {
        let date = session.last_updated.date_naive();
        let iso = date.iso_week();
        let day = date.weekday().num_days_from_monday() as usize;
        weeks.entry((iso.year(), iso.week())).or_insert([0; 7])[day] +=
            session.progress.len() as u64;
    }
    let skip = weeks.len().saturating_sub(TREND_WEEKS);
    weeks
        .into_iter()
        .skip(skip)
        .map(|((iso_year, iso_week), per_day)| WeekTrend {
            iso_year,
            iso_week,
            per_day: per_day.to_vec(),
        })
        .collect()
}

pub struct DashboardService {
    history: Arc<dyn HistoryStore>,
    sessions: Arc<dyn SessionStore>,
}

impl DashboardService {
    pub fn new(history: Arc<dyn HistoryStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { history, sessions }
    }

    /// History-based aggregates span every location; weekly trends are for
    /// `location`.
    #[instrument(skip(self))]
    pub async fn summary(&self, location: Location) -> Result<DashboardSummary, ServiceError> {
        let entries = self.history.query_history(&HistoryFilter::default()).await?;
        let weekly = self
            .sessions
            .list_sessions(SessionKind::Weekly, Some(location))
            .await?;

        Ok(DashboardSummary {
            progress_over_time: progress_over_time(&entries),
            top_skus: top_skus(&entries),
            scans_by_location: scans_by_location(&entries),
            weekly_trends: weekly_trends(&weekly),
        })
    }
}
