//! Collaborator contracts the reconciliation engine reads and writes through,
//! plus the two adapters that implement them.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::errors::StoreError;
use crate::models::{
    Actor, Component, CountSession, HistoryEntry, HistoryFilter, Location, ProgressMap, SessionId,
    SessionKind, SessionScope,
};

pub mod database;
pub mod workbook;

pub use database::DatabaseStore;
pub use workbook::WorkbookStore;

/// Per-location stock quantities keyed by barcode.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_component(&self, barcode: &str) -> Result<Option<Component>, StoreError>;

    /// Quantity on hand at `location`; 0 when the barcode is unknown.
    async fn get_component_quantity(
        &self,
        barcode: &str,
        location: Location,
    ) -> Result<i32, StoreError>;

    /// Sets one location's quantity, inserting the component when absent.
    /// The stored total is recomputed.
    async fn set_component_quantity(
        &self,
        barcode: &str,
        location: Location,
        quantity: i32,
    ) -> Result<Component, StoreError>;

    async fn list_components(&self) -> Result<Vec<Component>, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, id: &SessionId) -> Result<Option<CountSession>, StoreError>;

    async fn get_session_progress(
        &self,
        id: &SessionId,
    ) -> Result<Option<ProgressMap>, StoreError>;

    /// Inserts or replaces the session row with the same id.
    async fn put_session(&self, session: &CountSession) -> Result<(), StoreError>;

    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError>;

    /// Sessions of `kind`, optionally restricted to one location, newest first.
    async fn list_sessions(
        &self,
        kind: SessionKind,
        location: Option<Location>,
    ) -> Result<Vec<CountSession>, StoreError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError>;

    /// Matching entries, newest first.
    async fn query_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Deletes matching entries and returns how many were removed.
    async fn delete_history(&self, filter: &HistoryFilter) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait SkuCatalog: Send + Sync {
    /// Barcodes a session of `scope` must count before it is complete.
    async fn list_expected_skus(&self, scope: &SessionScope) -> Result<BTreeSet<String>, StoreError>;

    /// Cheap reachability probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// The four collaborators, as shared trait objects.
#[derive(Clone)]
pub struct Stores {
    pub inventory: Arc<dyn InventoryStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub history: Arc<dyn HistoryStore>,
    pub catalog: Arc<dyn SkuCatalog>,
}

impl Stores {
    /// Uses one adapter for every collaborator.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: InventoryStore + SessionStore + HistoryStore + SkuCatalog + 'static,
    {
        Self {
            inventory: store.clone(),
            sessions: store.clone(),
            history: store.clone(),
            catalog: store,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Decodes a persisted progress map; blank text is an empty map.
pub(crate) fn decode_progress(raw: &str) -> Result<ProgressMap, StoreError> {
    if raw.trim().is_empty() {
        return Ok(ProgressMap::new());
    }
    Ok(serde_json::from_str(raw)?)
}

pub(crate) fn encode_progress(progress: &ProgressMap) -> Result<String, StoreError> {
    Ok(serde_json::to_string(progress)?)
}

pub(crate) fn parse_location(raw: &str) -> Result<Location, StoreError> {
    raw.trim()
        .parse::<Location>()
        .map_err(|_| StoreError::Decode(format!("unknown location '{}'", raw)))
}

pub(crate) fn parse_actor(raw: &str) -> Result<Actor, StoreError> {
    raw.trim()
        .parse::<Actor>()
        .map_err(|_| StoreError::Decode(format!("unknown actor '{}'", raw)))
}
