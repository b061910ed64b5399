//! Count reconciliation: validates a scanned quantity against stock on hand,
//! checks it against overlapping sessions, then records it.
//!
//! One engine serves monthly, weekly and admin counts; the differences are
//! carried by [`SessionScope`] and [`Actor`].
//!
//! Requests run as a sequence of awaited store calls with no locking. Two
//! operators counting the same barcode at once both pass the checks and the
//! later write wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::clock::Clock;
use crate::errors::{ConflictDetail, ServiceError, StoreError, WriteStep};
use crate::events::{Event, EventSender};
use crate::models::{
    Actor, CountDay, CountSession, HistoryEntry, HistoryFilter, Location, ProgressMap, SessionId,
    SessionKind, SessionScope,
};
use crate::services::progress::ProgressSummary;
use crate::stores::Stores;

/// Raw count submission, as typed by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CountInput {
    pub barcode: Option<String>,
    pub quantity: Option<String>,
    pub location: Option<String>,
    pub kind: SessionKind,
    pub day: Option<CountDay>,
    #[serde(default)]
    pub actor: Actor,
    /// Answer to a conflict prompt: `None` asks, `Some(false)` declines.
    pub confirm_override: Option<bool>,
}

impl CountInput {
    pub fn monthly(barcode: &str, quantity: &str, location: &str) -> Self {
        Self {
            barcode: Some(barcode.to_string()),
            quantity: Some(quantity.to_string()),
            location: Some(location.to_string()),
            kind: SessionKind::Monthly,
            day: None,
            actor: Actor::User,
            confirm_override: None,
        }
    }

    pub fn weekly(day: CountDay, barcode: &str, quantity: &str) -> Self {
        Self {
            barcode: Some(barcode.to_string()),
            quantity: Some(quantity.to_string()),
            location: Some(Location::Hstd.to_string()),
            kind: SessionKind::Weekly,
            day: Some(day),
            actor: Actor::User,
            confirm_override: None,
        }
    }

    pub fn as_admin(mut self) -> Self {
        self.actor = Actor::Admin;
        self
    }

    pub fn with_override(mut self, confirm: bool) -> Self {
        self.confirm_override = Some(confirm);
        self
    }
}

/// A count that passed the input checks.
#[derive(Debug, Clone)]
struct ValidCount {
    barcode: String,
    quantity: i32,
    scope: SessionScope,
}

/// Parses the quantity field: trimmed, digits only, fits in an i32.
pub fn parse_quantity(raw: &str) -> Result<i32, ServiceError> {
    let trimmed = raw.trim();
    let invalid = || {
        ServiceError::ValidationError(format!(
            "Invalid quantity: {}. Please enter a whole number of zero or more.",
            trimmed
        ))
    };
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    trimmed.parse::<i32>().map_err(|_| invalid())
}

fn validate_input(input: &CountInput) -> Result<ValidCount, ServiceError> {
    let barcode = input
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ServiceError::ValidationError("Please enter a barcode.".to_string()))?;

    let raw_quantity = input
        .quantity
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ServiceError::ValidationError("Please enter a quantity.".to_string()))?;
    let quantity = parse_quantity(raw_quantity)?;

    let location = Location::parse(input.location.as_deref())?;
    let scope = SessionScope::new(location, input.kind, input.day)?;

    Ok(ValidCount {
        barcode: barcode.to_string(),
        quantity,
        scope,
    })
}

/// Provenance note stored with each history entry.
pub fn provenance(now: DateTime<Utc>, scope: &SessionScope, actor: Actor) -> String {
    let label = match (actor, scope.kind) {
        (Actor::Admin, SessionKind::Monthly) => "Admin View",
        (_, kind) => kind.label(),
    };
    format!(
        "Counted on {} using {} at {}",
        now.format("%m/%d/%Y at %I:%M:%S %p"),
        label,
        scope.location
    )
}

/// Result of an accepted count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountOutcome {
    pub barcode: String,
    pub quantity: i32,
    pub location: Location,
    pub session: CountSession,
    pub summary: ProgressSummary,
    pub conflict_overridden: bool,
    pub provenance: String,
}

/// What a reset (or a single-SKU removal) cleaned up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResetReport {
    pub session_id: SessionId,
    /// False when there was no session to reset.
    pub existed: bool,
    pub cleared_barcodes: Vec<String>,
    pub touched_siblings: Vec<SessionId>,
    pub history_deleted: u64,
}

/// Last recorded count of one expected SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuProgress {
    pub barcode: String,
    pub quantity: Option<i32>,
    /// Provenance of the latest count, or "Not yet counted".
    pub note: String,
}

/// Read model for a count screen.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub scope: SessionScope,
    pub session: Option<CountSession>,
    pub counted: Vec<String>,
    pub uncounted: Vec<String>,
    pub summary: ProgressSummary,
    pub skus: Vec<SkuProgress>,
}

pub const NOT_YET_COUNTED: &str = "Not yet counted";

pub struct ReconciliationEngine {
    stores: Stores,
    clock: Arc<dyn Clock>,
    event_sender: EventSender,
}

impl ReconciliationEngine {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, event_sender: EventSender) -> Self {
        Self {
            stores,
            clock,
            event_sender,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Validates, reconciles and records one scanned count.
    #[instrument(
        skip(self, input),
        fields(
            barcode = tracing::field::Empty,
            location = tracing::field::Empty,
            kind = %input.kind,
            actor = %input.actor
        )
    )]
    pub async fn submit_count(&self, input: CountInput) -> Result<CountOutcome, ServiceError> {
        let valid = validate_input(&input)?;
        let span = tracing::Span::current();
        span.record("barcode", valid.barcode.as_str());
        span.record("location", tracing::field::display(valid.scope.location));

        let ValidCount {
            barcode,
            quantity,
            scope,
        } = valid;

        // Weekly counts are restricted to the day's curated list.
        let weekly_expected = if scope.kind == SessionKind::Weekly {
            let expected = self.stores.catalog.list_expected_skus(&scope).await?;
            if !expected.contains(&barcode) {
                return Err(ServiceError::ValidationError(format!(
                    "Barcode {} is not part of the {}.",
                    barcode,
                    scope.describe()
                )));
            }
            Some(expected)
        } else {
            None
        };

        let on_hand = self
            .stores
            .inventory
            .get_component_quantity(&barcode, scope.location)
            .await?;
        if on_hand != quantity {
            debug!(expected = on_hand, entered = quantity, "Count rejected: quantity mismatch");
            return Err(ServiceError::QuantityMismatch {
                expected: on_hand,
                entered: quantity,
            });
        }

        let now = self.clock.now();
        let conflict = self.find_conflict(&scope, &barcode, quantity, now).await?;
        let conflict_overridden = match (&conflict, input.confirm_override) {
            (None, _) => false,
            (Some(detail), None) => {
                info!(session_id = %detail.session_id, previous = detail.previous_quantity, "Count needs confirmation");
                return Err(ServiceError::CountConflict(detail.clone()));
            }
            (Some(_), Some(false)) => return Err(ServiceError::CountDeclined),
            (Some(_), Some(true)) => true,
        };

        let mut applied = Vec::new();
        self.stores
            .inventory
            .set_component_quantity(&barcode, scope.location, quantity)
            .await?;
        applied.push(WriteStep::ComponentQuantity);

        let session = match self
            .record_progress(&scope, &barcode, quantity, now, weekly_expected)
            .await
        {
            Ok(session) => session,
            Err(source) => {
                return Err(self
                    .partial_write(&barcode, scope.location, applied, WriteStep::SessionProgress, source)
                    .await)
            }
        };
        applied.push(WriteStep::SessionProgress);

        if scope.kind == SessionKind::Weekly {
            if let Err(source) = self.mirror_into_monthly(&barcode, quantity, now).await {
                return Err(self
                    .partial_write(&barcode, scope.location, applied, WriteStep::MirroredSession, source)
                    .await);
            }
            applied.push(WriteStep::MirroredSession);
        }

        let note = provenance(now, &scope, input.actor);
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            barcode: barcode.clone(),
            quantity,
            session_id: session.id.clone(),
            count_type: scope.kind,
            actor: input.actor,
            source: note.clone(),
            timestamp: now,
            location: scope.location,
        };
        if let Err(source) = self.stores.history.append_history(&entry).await {
            return Err(self
                .partial_write(&barcode, scope.location, applied, WriteStep::HistoryEntry, source)
                .await);
        }

        let expected_len = self.expected_len(&scope).await;
        let summary = match expected_len {
            Some(len) => session.summary(len),
            None => ProgressSummary::new(session.progress.len(), 0),
        };

        info!(session_id = %session.id, quantity, conflict_overridden, "Count accepted");
        self.event_sender
            .send_or_log(Event::CountAccepted {
                barcode: barcode.clone(),
                location: scope.location,
                quantity,
                session_id: session.id.clone(),
                actor: input.actor,
                conflict_overridden,
                at: now,
            })
            .await;

        Ok(CountOutcome {
            barcode,
            quantity,
            location: scope.location,
            session,
            summary,
            conflict_overridden,
            provenance: note,
        })
    }

    /// Creates the current session for `scope`, or resumes it. Cached progress
    /// from the client is merged in and wins on collisions.
    #[instrument(skip(self, cached), fields(cached = cached.len()))]
    pub async fn start_session(
        &self,
        scope: SessionScope,
        cached: ProgressMap,
    ) -> Result<CountSession, ServiceError> {
        if let Some((barcode, quantity)) = cached.iter().find(|(_, quantity)| **quantity < 0) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid quantity for {}: {}. Please enter a whole number of zero or more.",
                barcode, quantity
            )));
        }

        let now = self.clock.now();
        let id = scope.session_id(now);
        let existing = self.stores.sessions.get_session(&id).await?;
        let resumed = existing.is_some();

        let mut session = existing.unwrap_or_else(|| CountSession::open(id.clone(), scope, now));
        let before = session.progress.clone();
        session.progress.extend(cached);
        if session.progress != before {
            session.last_updated = now;
        }

        let expected = self.stores.catalog.list_expected_skus(&scope).await?;
        session.refresh_completion(expected.len());
        self.stores.sessions.put_session(&session).await?;

        info!(session_id = %session.id, resumed, counted = session.progress.len(), "Session ready");
        self.event_sender
            .send_or_log(Event::SessionStarted {
                session_id: session.id.clone(),
                resumed,
            })
            .await;
        Ok(session)
    }

    /// Deletes the current session for `scope` and undoes its counts in
    /// overlapping sessions and the history log.
    #[instrument(skip(self))]
    pub async fn reset_session(&self, scope: SessionScope) -> Result<ResetReport, ServiceError> {
        let now = self.clock.now();
        let id = scope.session_id(now);
        let Some(session) = self.stores.sessions.get_session(&id).await? else {
            debug!(session_id = %id, "Nothing to reset");
            return Ok(ResetReport {
                session_id: id,
                existed: false,
                cleared_barcodes: Vec::new(),
                touched_siblings: Vec::new(),
                history_deleted: 0,
            });
        };

        self.stores.sessions.delete_session(&id).await?;

        let barcodes: Vec<String> = session.progress.keys().cloned().collect();
        let (touched_siblings, history_deleted) = self
            .cascade_removal(&scope, &barcodes, session.started_at, session.last_updated, now)
            .await?;

        info!(
            session_id = %id,
            cleared = barcodes.len(),
            siblings = touched_siblings.len(),
            history_deleted,
            "Session reset"
        );
        self.event_sender
            .send_or_log(Event::SessionReset {
                session_id: id.clone(),
                cleared_barcodes: barcodes.len(),
                history_deleted,
            })
            .await;

        Ok(ResetReport {
            session_id: id,
            existed: true,
            cleared_barcodes: barcodes,
            touched_siblings,
            history_deleted,
        })
    }

    /// Takes one barcode out of the current session, cascading like a reset.
    #[instrument(skip(self))]
    pub async fn remove_sku(
        &self,
        scope: SessionScope,
        barcode: &str,
    ) -> Result<CountSession, ServiceError> {
        let now = self.clock.now();
        let id = scope.session_id(now);
        let mut session = self
            .stores
            .sessions
            .get_session(&id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No {} session {} in progress", scope.describe(), id))
            })?;

        let window = (session.started_at, session.last_updated);
        if session.remove(barcode, now).is_none() {
            return Err(ServiceError::NotFound(format!(
                "Barcode {} has not been counted in {}",
                barcode, id
            )));
        }

        let expected = self.stores.catalog.list_expected_skus(&scope).await?;
        session.refresh_completion(expected.len());
        self.stores.sessions.put_session(&session).await?;

        let barcodes = [barcode.to_string()];
        self.cascade_removal(&scope, &barcodes, window.0, window.1, now)
            .await?;

        self.event_sender
            .send_or_log(Event::SkuRemoved {
                session_id: id,
                barcode: barcode.to_string(),
            })
            .await;
        Ok(session)
    }

    /// Expected SKUs of the current session and how far counting has got.
    #[instrument(skip(self))]
    pub async fn session_status(&self, scope: SessionScope) -> Result<SessionStatus, ServiceError> {
        let now = self.clock.now();
        let id = scope.session_id(now);
        let session = self.stores.sessions.get_session(&id).await?;
        let expected = self.stores.catalog.list_expected_skus(&scope).await?;

        let filter = HistoryFilter {
            location: Some(scope.location),
            session_id: Some(id.as_str().to_string()),
            ..Default::default()
        };
        // Newest first, so the first note seen per barcode is the latest.
        let mut latest_notes: BTreeMap<String, String> = BTreeMap::new();
        for entry in self.stores.history.query_history(&filter).await? {
            latest_notes.entry(entry.barcode).or_insert(entry.source);
        }

        let progress = session
            .as_ref()
            .map(|s| s.progress.clone())
            .unwrap_or_default();
        let (counted, uncounted): (Vec<String>, Vec<String>) = expected
            .iter()
            .cloned()
            .partition(|barcode| progress.contains_key(barcode));

        let skus = expected
            .iter()
            .map(|barcode| {
                let quantity = progress.get(barcode).copied();
                let note = match (quantity, latest_notes.get(barcode)) {
                    (Some(_), Some(note)) => note.clone(),
                    (Some(q), None) => format!("Counted: {}", q),
                    (None, _) => NOT_YET_COUNTED.to_string(),
                };
                SkuProgress {
                    barcode: barcode.clone(),
                    quantity,
                    note,
                }
            })
            .collect();

        Ok(SessionStatus {
            session_id: id,
            scope,
            summary: ProgressSummary::new(counted.len(), expected.len()),
            session,
            counted,
            uncounted,
            skus,
        })
    }

    /// First open sibling session that already holds a different quantity.
    async fn find_conflict(
        &self,
        scope: &SessionScope,
        barcode: &str,
        entered: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ConflictDetail>, StoreError> {
        for sibling in scope.siblings() {
            let sibling_id = sibling.session_id(now);
            let Some(session) = self.stores.sessions.get_session(&sibling_id).await? else {
                continue;
            };
            if session.completed {
                continue;
            }
            match session.progress.get(barcode) {
                Some(&previous) if previous != entered => {
                    return Ok(Some(ConflictDetail {
                        barcode: barcode.to_string(),
                        session_id: sibling_id,
                        session_label: sibling.describe(),
                        location: sibling.location,
                        previous_quantity: previous,
                        entered_quantity: entered,
                    }));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    async fn record_progress(
        &self,
        scope: &SessionScope,
        barcode: &str,
        quantity: i32,
        now: DateTime<Utc>,
        expected: Option<BTreeSet<String>>,
    ) -> Result<CountSession, StoreError> {
        let id = scope.session_id(now);
        let mut session = self
            .stores
            .sessions
            .get_session(&id)
            .await?
            .unwrap_or_else(|| CountSession::open(id, *scope, now));
        session.record(barcode, quantity, now);

        let expected = match expected {
            Some(expected) => expected,
            None => self.stores.catalog.list_expected_skus(scope).await?,
        };
        session.refresh_completion(expected.len());
        self.stores.sessions.put_session(&session).await?;
        Ok(session)
    }

    /// Copies a weekly HSTD count into this month's HSTD cycle count,
    /// opening that session if nobody has started it yet.
    async fn mirror_into_monthly(
        &self,
        barcode: &str,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let monthly = SessionScope::monthly(Location::Hstd);
        let id = monthly.session_id(now);
        let mut session = self
            .stores
            .sessions
            .get_session(&id)
            .await?
            .unwrap_or_else(|| CountSession::open(id.clone(), monthly, now));
        session.record(barcode, quantity, now);
        let expected = self.stores.catalog.list_expected_skus(&monthly).await?;
        session.refresh_completion(expected.len());
        self.stores.sessions.put_session(&session).await?;
        debug!(session_id = %id, "Mirrored weekly count into monthly session");
        Ok(())
    }

    /// Removes `barcodes` from every sibling session holding them and deletes
    /// their history at the scope's location inside `[from, to]`.
    async fn cascade_removal(
        &self,
        scope: &SessionScope,
        barcodes: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(Vec<SessionId>, u64), StoreError> {
        let mut touched = Vec::new();
        for sibling in scope.siblings() {
            let sibling_id = sibling.session_id(now);
            let Some(mut session) = self.stores.sessions.get_session(&sibling_id).await? else {
                continue;
            };
            let removed = barcodes
                .iter()
                .filter(|barcode| session.remove(barcode, now).is_some())
                .count();
            if removed == 0 {
                continue;
            }
            let expected = self.stores.catalog.list_expected_skus(&sibling).await?;
            session.refresh_completion(expected.len());
            self.stores.sessions.put_session(&session).await?;
            touched.push(sibling_id);
        }

        let mut history_deleted = 0;
        for barcode in barcodes {
            let filter = HistoryFilter::for_barcode(barcode.clone(), scope.location).between(from, to);
            history_deleted += self.stores.history.delete_history(&filter).await?;
        }
        Ok((touched, history_deleted))
    }

    async fn expected_len(&self, scope: &SessionScope) -> Option<usize> {
        match self.stores.catalog.list_expected_skus(scope).await {
            Ok(expected) => Some(expected.len()),
            Err(e) => {
                warn!(error = %e, "Could not read expected SKUs for progress summary");
                None
            }
        }
    }

    async fn partial_write(
        &self,
        barcode: &str,
        location: Location,
        applied: Vec<WriteStep>,
        failed: WriteStep,
        source: StoreError,
    ) -> ServiceError {
        error!(
            partial_write = true,
            %barcode,
            %location,
            ?applied,
            %failed,
            error = %source,
            "Count write failed after earlier writes succeeded"
        );
        self.event_sender
            .send_or_log(Event::PartialWriteDetected {
                barcode: barcode.to_string(),
                location,
                applied: applied.clone(),
                failed,
            })
            .await;
        ServiceError::PartialWrite {
            applied,
            failed,
            source,
        }
    }
}
