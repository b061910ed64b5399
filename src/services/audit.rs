//! Audit trail: scans and weekly session activity at one location, merged
//! into a single newest-first timeline.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;
use crate::models::{Actor, HistoryFilter, Location, SessionKind};
use crate::stores::{HistoryStore, SessionStore};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

const SCAN_ACTION: &str = "Scan";
const WEEKLY_ACTION: &str = "Weekly Count";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    /// "-" for rows not tied to one SKU.
    pub sku: String,
    pub details: String,
    pub actor: Actor,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
pub struct AuditQuery {
    /// Case-insensitive substring of the action, e.g. "scan"
    pub action: Option<String>,
    /// Case-insensitive substring of the SKU
    pub sku: Option<String>,
    /// First day to include
    pub from: Option<NaiveDate>,
    /// Last day to include
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditPage {
    pub events: Vec<AuditEvent>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl AuditQuery {
    fn matches(&self, event: &AuditEvent) -> bool {
        let action_ok = self
            .action
            .as_deref()
            .filter(|a| !a.is_empty())
            .map_or(true, |a| contains_ignore_case(&event.action, a));
        let sku_ok = self
            .sku
            .as_deref()
            .filter(|s| !s.is_empty())
            .map_or(true, |s| contains_ignore_case(&event.sku, s));
        let date = event.timestamp.date_naive();
        action_ok
            && sku_ok
            && self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
    }
}

/// Slices `events` into one page; pages are 1-based and hold at most
/// [`MAX_PAGE_SIZE`] rows.
pub fn paginate(events: Vec<AuditEvent>, page: u64, per_page: u64) -> AuditPage {
    let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
    let page = page.max(1);
    let total = events.len() as u64;
    let total_pages = total.div_ceil(per_page);
    let skip = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
    let events = events
        .into_iter()
        .skip(skip)
        .take(per_page as usize)
        .collect();
    AuditPage {
        events,
        page,
        per_page,
        total,
        total_pages,
    }
}

pub struct AuditService {
    history: Arc<dyn HistoryStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AuditService {
    pub fn new(history: Arc<dyn HistoryStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { history, sessions }
    }

    #[instrument(skip(self, query))]
    pub async fn trail(&self, location: Location, query: &AuditQuery) -> Result<AuditPage, ServiceError> {
        let mut filter = HistoryFilter {
            location: Some(location),
            ..Default::default()
        };
        if let Some(from) = query.from {
            filter.from = Some(Utc.from_utc_datetime(&from.and_hms_opt(0, 0, 0).unwrap_or_default()));
        }

        let mut events: Vec<AuditEvent> = self
            .history
            .query_history(&filter)
            .await?
            .into_iter()
            .map(|entry| AuditEvent {
                timestamp: entry.timestamp,
                action: SCAN_ACTION.to_string(),
                sku: entry.barcode,
                details: format!("Quantity: {} at {}", entry.quantity, entry.location),
                actor: entry.actor,
            })
            .collect();

        let weekly = self
            .sessions
            .list_sessions(SessionKind::Weekly, Some(location))
            .await?;
        events.extend(weekly.into_iter().map(|session| AuditEvent {
            timestamp: session.last_updated,
            action: WEEKLY_ACTION.to_string(),
            sku: "-".to_string(),
            details: format!(
                "Completed count for {} SKUs on {}",
                session.progress.len(),
                session.scope.day.map(|d| d.to_string()).unwrap_or_default()
            ),
            actor: Actor::User,
        }));

        events.retain(|event| query.matches(event));
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(paginate(
            events,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(action: &str, sku: &str, day: u32) -> AuditEvent {
        AuditEvent {
            timestamp: Utc.with_ymd_and_hms(2026, 10, day, 23, 59, 0).unwrap(),
            action: action.into(),
            sku: sku.into(),
            details: String::new(),
            actor: Actor::User,
        }
    }

    #[test]
    fn filters_are_substrings_and_inclusive_days() {
        let query = AuditQuery {
            action: Some("scan".into()),
            sku: Some("sku1".into()),
            from: NaiveDate::from_ymd_opt(2026, 10, 5),
            to: NaiveDate::from_ymd_opt(2026, 10, 6),
            ..Default::default()
        };
        assert!(query.matches(&event("Scan", "SKU100", 6)));
        assert!(query.matches(&event("Scan", "SKU100", 5)));
        assert!(!query.matches(&event("Scan", "SKU100", 7)));
        assert!(!query.matches(&event("Weekly Count", "-", 6)));
        assert!(!query.matches(&event("Scan", "SKU200", 6)));
    }

    #[test]
    fn pages_hold_ten_rows_by_default() {
        let events: Vec<AuditEvent> = (1..=23).map(|d| event("Scan", "A", d)).collect();
        let page = paginate(events.clone(), 3, DEFAULT_PAGE_SIZE);
        assert_eq!(page.total, 23);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.events.len(), 3);

        let beyond = paginate(events, 9, DEFAULT_PAGE_SIZE);
        assert!(beyond.events.is_empty());
    }

    #[test]
    fn huge_page_numbers_are_clamped() {
        let events: Vec<AuditEvent> = (1..=23).map(|d| event("Scan", "A", d)).collect();

        let wide = paginate(events.clone(), 1, u64::MAX);
        assert_eq!(wide.per_page, MAX_PAGE_SIZE);
        assert_eq!(wide.total_pages, 1);
        assert_eq!(wide.events.len(), 23);

        let far = paginate(events, u64::MAX, 2);
        assert!(far.events.is_empty());
        assert_eq!(far.total_pages, 12);
        assert!(paginate(vec![], u64::MAX, u64::MAX).events.is_empty());
    }
}
