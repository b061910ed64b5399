use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::location::Location;
use super::session::{SessionId, SessionKind};

/// Who recorded a count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Actor {
    #[default]
    User,
    Admin,
}

/// One accepted count. Written once; only removed by an explicit reset or
/// history clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub barcode: String,
    pub quantity: i32,
    pub session_id: SessionId,
    pub count_type: SessionKind,
    pub actor: Actor,
    /// Provenance note, e.g. "Counted on 10/17/2026 at 02:30:00 PM using Monthly Count at MtD"
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub location: Location,
}

/// Selection criteria for history reads and deletes. Empty criteria match
/// everything; the date range is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, IntoParams)]
pub struct HistoryFilter {
    pub barcode: Option<String>,
    pub location: Option<Location>,
    pub session_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn for_barcode(barcode: impl Into<String>, location: Location) -> Self {
        Self {
            barcode: Some(barcode.into()),
            location: Some(location),
            ..Default::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.barcode
            .as_deref()
            .map_or(true, |barcode| entry.barcode == barcode)
            && self.location.map_or(true, |location| entry.location == location)
            && self
                .session_id
                .as_deref()
                .map_or(true, |session| entry.session_id.as_str() == session)
            && self.from.map_or(true, |from| entry.timestamp >= from)
            && self.to.map_or(true, |to| entry.timestamp <= to)
    }
}
