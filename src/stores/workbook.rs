//! Spreadsheet-table adapter.
//!
//! Every collaborator maps onto a workbook table reached through the workbook
//! REST API: list rows, add a row, patch or delete a row by index. Rows are
//! positional arrays of cells; the column order of each table is fixed below.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    decode_progress, encode_progress, parse_actor, parse_location, HistoryStore, InventoryStore,
    SessionStore, SkuCatalog,
};
use crate::config::WorkbookConfig;
use crate::errors::{ServiceError, StoreError};
use crate::models::{
    Actor, Component, CountDay, CountSession, HistoryEntry, HistoryFilter, Location, ProgressMap,
    SessionId, SessionKind, SessionScope,
};

const COMPONENTS_TABLE: &str = "ComponentsTable";
const HISTORY_TABLE: &str = "CountHistoryTable";
const CYCLE_COUNTS_TABLE: &str = "CycleCountsTable";
const WEEKLY_COUNTS_TABLE: &str = "WeeklyCountsHstdTable";
const HIGH_VOLUME_TABLE: &str = "HighVolumeSkusTable";

/// [id, barcode, description, mtd, ftp, hstd, 3pl, total, quarantine]
mod component_col {
    pub const ID: usize = 0;
    pub const BARCODE: usize = 1;
    pub const DESCRIPTION: usize = 2;
    pub const MTD: usize = 3;
    pub const FTP: usize = 4;
    pub const HSTD: usize = 5;
    pub const TPL: usize = 6;
    pub const TOTAL: usize = 7;
    pub const QUARANTINE: usize = 8;
}

/// [id, sku, quantity, count_type, count_session, timestamp, user_type, source, location]
mod history_col {
    pub const ID: usize = 0;
    pub const SKU: usize = 1;
    pub const QUANTITY: usize = 2;
    pub const COUNT_TYPE: usize = 3;
    pub const SESSION: usize = 4;
    pub const TIMESTAMP: usize = 5;
    pub const USER_TYPE: usize = 6;
    pub const SOURCE: usize = 7;
    pub const LOCATION: usize = 8;
}

/// Cycle counts: [id, start_date, last_updated, progress, completed, user_type, location]
/// Weekly counts: [id, date, last_updated, progress, day, completed, location]
mod session_col {
    pub const ID: usize = 0;
    pub const STARTED: usize = 1;
    pub const LAST_UPDATED: usize = 2;
    pub const PROGRESS: usize = 3;
    pub const MONTHLY_COMPLETED: usize = 4;
    pub const WEEKLY_DAY: usize = 4;
    pub const WEEKLY_COMPLETED: usize = 5;
    pub const LOCATION: usize = 6;
}

/// [id, sku, day, location]
mod high_volume_col {
    pub const SKU: usize = 1;
    pub const DAY: usize = 2;
    pub const LOCATION: usize = 3;
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    #[serde(default)]
    value: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    index: Option<u64>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// A table row with its position, as needed for patch and delete.
#[derive(Debug, Clone)]
struct Row {
    index: u64,
    cells: Vec<Value>,
}

impl Row {
    fn text(&self, col: usize) -> String {
        match self.cells.get(col) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    fn int(&self, col: usize) -> Result<i32, StoreError> {
        match self.cells.get(col) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| StoreError::Decode(format!("column {} is not an integer", col))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| StoreError::Decode(format!("column {} is not an integer: '{}'", col, s))),
            Some(Value::Null) | None => Ok(0),
            Some(other) => Err(StoreError::Decode(format!(
                "column {} is not an integer: {}",
                col, other
            ))),
        }
    }

    fn flag(&self, col: usize) -> bool {
        match self.cells.get(col) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn timestamp(&self, col: usize) -> Result<DateTime<Utc>, StoreError> {
        let raw = self.text(col);
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| StoreError::Decode(format!("column {} is not a timestamp: '{}'", col, raw)))
    }
}

fn bool_cell(value: bool) -> Value {
    Value::String(if value { "TRUE" } else { "FALSE" }.to_string())
}

fn component_from_row(row: &Row) -> Result<Component, StoreError> {
    Ok(Component {
        id: row.text(component_col::ID),
        barcode: row.text(component_col::BARCODE),
        description: row.text(component_col::DESCRIPTION),
        mtd_quantity: row.int(component_col::MTD)?,
        ftp_quantity: row.int(component_col::FTP)?,
        hstd_quantity: row.int(component_col::HSTD)?,
        tpl_quantity: row.int(component_col::TPL)?,
        quarantine_quantity: row.int(component_col::QUARANTINE)?,
        total_quantity: row.int(component_col::TOTAL)?,
    })
}

fn component_cells(component: &Component) -> Vec<Value> {
    vec![
        json!(component.id),
        json!(component.barcode),
        json!(component.description),
        json!(component.mtd_quantity),
        json!(component.ftp_quantity),
        json!(component.hstd_quantity),
        json!(component.tpl_quantity),
        json!(component.total_quantity),
        json!(component.quarantine_quantity),
    ]
}

fn history_from_row(row: &Row) -> Result<HistoryEntry, StoreError> {
    let count_type = row.text(history_col::COUNT_TYPE);
    Ok(HistoryEntry {
        id: Uuid::parse_str(row.text(history_col::ID).trim())
            .map_err(|e| StoreError::Decode(format!("bad history id: {}", e)))?,
        barcode: row.text(history_col::SKU),
        quantity: row.int(history_col::QUANTITY)?,
        session_id: SessionId::new(row.text(history_col::SESSION)),
        count_type: count_type
            .parse::<SessionKind>()
            .map_err(|_| StoreError::Decode(format!("unknown count type '{}'", count_type)))?,
        actor: parse_actor(&row.text(history_col::USER_TYPE))?,
        source: row.text(history_col::SOURCE),
        timestamp: row.timestamp(history_col::TIMESTAMP)?,
        location: parse_location(&row.text(history_col::LOCATION))?,
    })
}

fn history_cells(entry: &HistoryEntry) -> Vec<Value> {
    vec![
        json!(entry.id.to_string()),
        json!(entry.barcode),
        json!(entry.quantity),
        json!(entry.count_type.to_string()),
        json!(entry.session_id.as_str()),
        json!(entry.timestamp.to_rfc3339()),
        json!(entry.actor.to_string()),
        json!(entry.source),
        json!(entry.location.to_string()),
    ]
}

fn session_from_row(kind: SessionKind, row: &Row) -> Result<CountSession, StoreError> {
    let location = parse_location(&row.text(session_col::LOCATION))?;
    let (scope, completed) = match kind {
        SessionKind::Monthly => (
            SessionScope::monthly(location),
            row.flag(session_col::MONTHLY_COMPLETED),
        ),
        SessionKind::Weekly => {
            let raw_day = row.text(session_col::WEEKLY_DAY);
            let day = raw_day
                .parse::<CountDay>()
                .map_err(|_| StoreError::Decode(format!("unknown count day '{}'", raw_day)))?;
            let mut scope = SessionScope::weekly(day);
            scope.location = location;
            (scope, row.flag(session_col::WEEKLY_COMPLETED))
        }
    };
    Ok(CountSession {
        id: SessionId::new(row.text(session_col::ID)),
        scope,
        started_at: row.timestamp(session_col::STARTED)?,
        last_updated: row.timestamp(session_col::LAST_UPDATED)?,
        progress: decode_progress(&row.text(session_col::PROGRESS))?,
        completed,
    })
}

fn session_cells(session: &CountSession, actor: Actor) -> Result<Vec<Value>, StoreError> {
    let progress = encode_progress(&session.progress)?;
    let cells = match session.scope.kind {
        SessionKind::Monthly => vec![
            json!(session.id.as_str()),
            json!(session.started_at.to_rfc3339()),
            json!(session.last_updated.to_rfc3339()),
            json!(progress),
            bool_cell(session.completed),
            json!(actor.to_string()),
            json!(session.scope.location.to_string()),
        ],
        SessionKind::Weekly => vec![
            json!(session.id.as_str()),
            json!(session.started_at.to_rfc3339()),
            json!(session.last_updated.to_rfc3339()),
            json!(progress),
            json!(session.scope.day.map(|d| d.to_string()).unwrap_or_default()),
            bool_cell(session.completed),
            json!(session.scope.location.to_string()),
        ],
    };
    Ok(cells)
}

/// Workbook drive items and table addressing.
#[derive(Debug, Clone)]
struct WorkbookFiles {
    site_id: String,
    components: String,
    history: String,
    cycle_counts: String,
    weekly_counts: String,
    high_volume_skus: String,
}

/// Adapter over spreadsheet tables, authenticated with a delegated bearer token.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    client: Client,
    api_base: String,
    access_token: String,
    files: WorkbookFiles,
}

impl WorkbookStore {
    pub fn from_config(config: &WorkbookConfig) -> Result<Self, ServiceError> {
        let missing = config.missing_settings();
        if !missing.is_empty() {
            return Err(ServiceError::InternalError(format!(
                "workbook store is missing settings: {}",
                missing.join(", ")
            )));
        }
        let setting = |value: &Option<String>| value.clone().unwrap_or_default();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: setting(&config.access_token),
            files: WorkbookFiles {
                site_id: setting(&config.site_id),
                components: setting(&config.components_file_id),
                history: setting(&config.history_file_id),
                cycle_counts: setting(&config.cycle_counts_file_id),
                weekly_counts: setting(&config.weekly_counts_file_id),
                high_volume_skus: setting(&config.high_volume_skus_file_id),
            },
        })
    }

    fn rows_url(&self, file_id: &str, table: &str) -> String {
        format!(
            "{}/sites/{}/drive/items/{}/workbook/tables/{}/rows",
            self.api_base, self.files.site_id, file_id, table
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        warn!(status = %status, "Workbook API call failed");
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    #[instrument(skip(self))]
    async fn list_rows(&self, file_id: &str, table: &str) -> Result<Vec<Row>, StoreError> {
        let url = self.rows_url(file_id, table);
        let page: RowsPage = self
            .send(self.client.request(Method::GET, &url))
            .await?
            .json()
            .await?;

        Ok(page
            .value
            .into_iter()
            .enumerate()
            .map(|(position, row)| Row {
                index: row.index.unwrap_or(position as u64),
                cells: row.values.into_iter().next().unwrap_or_default(),
            })
            .collect())
    }

    async fn add_row(&self, file_id: &str, table: &str, cells: Vec<Value>) -> Result<(), StoreError> {
        let url = format!("{}/add", self.rows_url(file_id, table));
        self.send(self.client.post(&url).json(&json!({ "values": [cells] })))
            .await?;
        Ok(())
    }

    async fn update_row(
        &self,
        file_id: &str,
        table: &str,
        index: u64,
        cells: Vec<Value>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/itemAt(index={})", self.rows_url(file_id, table), index);
        self.send(self.client.patch(&url).json(&json!({ "values": [cells] })))
            .await?;
        Ok(())
    }

    /// Deletes rows from the highest index down so earlier indices stay valid.
    async fn delete_rows(
        &self,
        file_id: &str,
        table: &str,
        mut indices: Vec<u64>,
    ) -> Result<u64, StoreError> {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        for index in &indices {
            let url = format!("{}/itemAt(index={})", self.rows_url(file_id, table), index);
            self.send(self.client.delete(&url)).await?;
        }
        debug!(table, deleted = indices.len(), "Deleted workbook rows");
        Ok(indices.len() as u64)
    }

    async fn component_rows(&self) -> Result<Vec<Row>, StoreError> {
        self.list_rows(&self.files.components, COMPONENTS_TABLE)
            .await
    }

    fn session_table(&self, kind: SessionKind) -> (&str, &'static str) {
        match kind {
            SessionKind::Monthly => (&self.files.cycle_counts, CYCLE_COUNTS_TABLE),
            SessionKind::Weekly => (&self.files.weekly_counts, WEEKLY_COUNTS_TABLE),
        }
    }

    async fn find_session_row(
        &self,
        kind: SessionKind,
        id: &SessionId,
    ) -> Result<Option<Row>, StoreError> {
        let (file, table) = self.session_table(kind);
        Ok(self
            .list_rows(file, table)
            .await?
            .into_iter()
            .find(|row| row.text(session_col::ID) == id.as_str()))
    }

    async fn matching_history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<Vec<(u64, HistoryEntry)>, StoreError> {
        let rows = self
            .list_rows(&self.files.history, HISTORY_TABLE)
            .await?;
        let mut matched = Vec::new();
        for row in rows {
            // Rows with unreadable cells are skipped rather than failing the whole read.
            match history_from_row(&row) {
                Ok(entry) if filter.matches(&entry) => matched.push((row.index, entry)),
                Ok(_) => {}
                Err(e) => debug!(index = row.index, error = %e, "Skipping unreadable history row"),
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl InventoryStore for WorkbookStore {
    async fn get_component(&self, barcode: &str) -> Result<Option<Component>, StoreError> {
        self.component_rows()
            .await?
            .iter()
            .find(|row| row.text(component_col::BARCODE) == barcode)
            .map(component_from_row)
            .transpose()
    }

    async fn get_component_quantity(
        &self,
        barcode: &str,
        location: Location,
    ) -> Result<i32, StoreError> {
        Ok(self
            .get_component(barcode)
            .await?
            .map_or(0, |component| component.quantity_at(location)))
    }

    #[instrument(skip(self))]
    async fn set_component_quantity(
        &self,
        barcode: &str,
        location: Location,
        quantity: i32,
    ) -> Result<Component, StoreError> {
        let rows = self.component_rows().await?;
        match rows
            .iter()
            .find(|row| row.text(component_col::BARCODE) == barcode)
        {
            Some(row) => {
                let updated = component_from_row(row)?.with_quantity(location, quantity);
                self.update_row(
                    &self.files.components,
                    COMPONENTS_TABLE,
                    row.index,
                    component_cells(&updated),
                )
                .await?;
                Ok(updated)
            }
            None => {
                let created = Component::new_counted(barcode, location, quantity);
                self.add_row(
                    &self.files.components,
                    COMPONENTS_TABLE,
                    component_cells(&created),
                )
                .await?;
                Ok(created)
            }
        }
    }

    async fn list_components(&self) -> Result<Vec<Component>, StoreError> {
        let mut components = self
            .component_rows()
            .await?
            .iter()
            .map(component_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        components.sort_by(|a, b| a.barcode.cmp(&b.barcode));
        Ok(components)
    }
}

#[async_trait]
impl SessionStore for WorkbookStore {
    async fn get_session(&self, id: &SessionId) -> Result<Option<CountSession>, StoreError> {
        let Some(kind) = id.kind() else {
            return Ok(None);
        };
        self.find_session_row(kind, id)
            .await?
            .map(|row| session_from_row(kind, &row))
            .transpose()
    }

    async fn get_session_progress(
        &self,
        id: &SessionId,
    ) -> Result<Option<ProgressMap>, StoreError> {
        Ok(self.get_session(id).await?.map(|session| session.progress))
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn put_session(&self, session: &CountSession) -> Result<(), StoreError> {
        let kind = session.scope.kind;
        let (file, table) = self.session_table(kind);
        let cells = session_cells(session, Actor::User)?;
        match self.find_session_row(kind, &session.id).await? {
            Some(row) => self.update_row(file, table, row.index, cells).await,
            None => self.add_row(file, table, cells).await,
        }
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        let Some(kind) = id.kind() else {
            return Ok(());
        };
        let (file, table) = self.session_table(kind);
        let indices = self
            .list_rows(file, table)
            .await?
            .into_iter()
            .filter(|row| row.text(session_col::ID) == id.as_str())
            .map(|row| row.index)
            .collect();
        self.delete_rows(file, table, indices).await?;
        Ok(())
    }

    async fn list_sessions(
        &self,
        kind: SessionKind,
        location: Option<Location>,
    ) -> Result<Vec<CountSession>, StoreError> {
        let (file, table) = self.session_table(kind);
        let mut sessions = Vec::new();
        for row in self.list_rows(file, table).await? {
            let session = session_from_row(kind, &row)?;
            if location.map_or(true, |l| session.scope.location == l) {
                sessions.push(session);
            }
        }
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }
}

#[async_trait]
impl HistoryStore for WorkbookStore {
    async fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.add_row(&self.files.history, HISTORY_TABLE, history_cells(entry))
            .await
    }

    async fn query_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut entries: Vec<HistoryEntry> = self
            .matching_history(filter)
            .await?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn delete_history(&self, filter: &HistoryFilter) -> Result<u64, StoreError> {
        let indices = self
            .matching_history(filter)
            .await?
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        self.delete_rows(&self.files.history, HISTORY_TABLE, indices)
            .await
    }
}

#[async_trait]
impl SkuCatalog for WorkbookStore {
    async fn list_expected_skus(&self, scope: &SessionScope) -> Result<BTreeSet<String>, StoreError> {
        match (scope.kind, scope.day) {
            (SessionKind::Weekly, Some(day)) => {
                let day = day.to_string();
                let location = scope.location.to_string();
                Ok(self
                    .list_rows(&self.files.high_volume_skus, HIGH_VOLUME_TABLE)
                    .await?
                    .iter()
                    .filter(|row| {
                        row.text(high_volume_col::DAY) == day
                            && row.text(high_volume_col::LOCATION) == location
                    })
                    .map(|row| row.text(high_volume_col::SKU))
                    .filter(|sku| !sku.is_empty())
                    .collect())
            }
            (SessionKind::Weekly, None) => Ok(BTreeSet::new()),
            (SessionKind::Monthly, _) => Ok(self
                .component_rows()
                .await?
                .iter()
                .map(|row| row.text(component_col::BARCODE))
                .filter(|barcode| !barcode.is_empty())
                .collect()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.list_rows(&self.files.components, COMPONENTS_TABLE)
            .await
            .map(|_| ())
    }
}
