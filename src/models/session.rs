use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

use super::location::Location;
use crate::errors::ServiceError;
use crate::services::progress::{self, ProgressSummary};

/// Barcode → last accepted counted quantity within one session.
pub type ProgressMap = BTreeMap<String, i32>;

const MONTHLY_PREFIX: &str = "Cycle_";
const WEEKLY_PREFIX: &str = "Weekly_";

/// Which recurring count a session belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SessionKind {
    Monthly,
    Weekly,
}

impl SessionKind {
    /// Name used in provenance strings.
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Monthly => "Monthly Count",
            SessionKind::Weekly => "Weekly Count",
        }
    }
}

/// Weekday a high-volume weekly count is scheduled on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum CountDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl CountDay {
    pub fn from_weekday(weekday: Weekday) -> Option<CountDay> {
        match weekday {
            Weekday::Mon => Some(CountDay::Monday),
            Weekday::Tue => Some(CountDay::Tuesday),
            Weekday::Wed => Some(CountDay::Wednesday),
            Weekday::Thu => Some(CountDay::Thursday),
            Weekday::Fri => Some(CountDay::Friday),
            Weekday::Sat | Weekday::Sun => None,
        }
    }

    pub fn parse(raw: &str) -> Result<CountDay, ServiceError> {
        raw.trim().parse::<CountDay>().map_err(|_| {
            ServiceError::ValidationError(format!(
                "Invalid count day: {}. Expected Monday through Friday",
                raw
            ))
        })
    }
}

/// Composite session identifier: scope type, period, location and (weekly) day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        SessionId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kind encoded in the identifier prefix, if it is one of ours.
    pub fn kind(&self) -> Option<SessionKind> {
        if self.0.starts_with(MONTHLY_PREFIX) {
            Some(SessionKind::Monthly)
        } else if self.0.starts_with(WEEKLY_PREFIX) {
            Some(SessionKind::Weekly)
        } else {
            None
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a count session covers: a location, the kind of count and, for weekly
/// counts, the weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct SessionScope {
    pub location: Location,
    pub kind: SessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<CountDay>,
}

impl SessionScope {
    pub fn monthly(location: Location) -> Self {
        Self {
            location,
            kind: SessionKind::Monthly,
            day: None,
        }
    }

    /// Weekly counts only run at HSTD.
    pub fn weekly(day: CountDay) -> Self {
        Self {
            location: Location::Hstd,
            kind: SessionKind::Weekly,
            day: Some(day),
        }
    }

    /// Builds a scope from loose request parts.
    pub fn new(
        location: Location,
        kind: SessionKind,
        day: Option<CountDay>,
    ) -> Result<Self, ServiceError> {
        match kind {
            SessionKind::Monthly => Ok(Self::monthly(location)),
            SessionKind::Weekly => {
                if !location.has_weekly_count() {
                    return Err(ServiceError::ValidationError(format!(
                        "Weekly counts are only run at HSTD, not {}",
                        location
                    )));
                }
                let day = day.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Please select a day for the weekly count.".to_string(),
                    )
                })?;
                Ok(Self::weekly(day))
            }
        }
    }

    pub fn session_id(&self, now: DateTime<Utc>) -> SessionId {
        match (self.kind, self.day) {
            (SessionKind::Weekly, Some(day)) => SessionId(format!(
                "{}{}_{}_{}",
                WEEKLY_PREFIX,
                week_start(now.date_naive()).format("%Y-%m-%d"),
                self.location,
                day
            )),
            _ => SessionId(format!(
                "{}{}_{}",
                MONTHLY_PREFIX,
                now.format("%Y-%m"),
                self.location
            )),
        }
    }

    /// Sessions that may hold the same barcodes as this one in the same period.
    pub fn siblings(&self) -> Vec<SessionScope> {
        match (self.kind, self.day) {
            (SessionKind::Monthly, _) if self.location.has_weekly_count() => {
                CountDay::iter().map(SessionScope::weekly).collect()
            }
            (SessionKind::Monthly, _) => Vec::new(),
            // Weekdays never cross-check each other, only the monthly count.
            (SessionKind::Weekly, _) => vec![SessionScope::monthly(self.location)],
        }
    }

    /// Human name used in conflict prompts, e.g. "Monday weekly count".
    pub fn describe(&self) -> String {
        match (self.kind, self.day) {
            (SessionKind::Weekly, Some(day)) => format!("{} weekly count", day),
            (SessionKind::Weekly, None) => "weekly count".to_string(),
            (SessionKind::Monthly, _) => "monthly cycle count".to_string(),
        }
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Persisted state of one count session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CountSession {
    pub id: SessionId,
    pub scope: SessionScope,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub progress: ProgressMap,
    pub completed: bool,
}

impl CountSession {
    pub fn open(id: SessionId, scope: SessionScope, now: DateTime<Utc>) -> Self {
        Self {
            id,
            scope,
            started_at: now,
            last_updated: now,
            progress: ProgressMap::new(),
            completed: false,
        }
    }

    pub fn record(&mut self, barcode: &str, quantity: i32, now: DateTime<Utc>) {
        self.progress.insert(barcode.to_string(), quantity);
        self.last_updated = now;
    }

    pub fn remove(&mut self, barcode: &str, now: DateTime<Utc>) -> Option<i32> {
        let removed = self.progress.remove(barcode);
        if removed.is_some() {
            self.last_updated = now;
        }
        removed
    }

    /// Recomputes `completed` from the size of the expected SKU set.
    pub fn refresh_completion(&mut self, expected_len: usize) {
        self.completed = progress::is_complete(self.progress.len(), expected_len);
    }

    pub fn summary(&self, expected_len: usize) -> ProgressSummary {
        ProgressSummary::new(self.progress.len(), expected_len)
    }
}
