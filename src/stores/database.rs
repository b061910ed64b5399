use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    decode_progress, encode_progress, parse_actor, parse_location, HistoryStore, InventoryStore,
    SessionStore, SkuCatalog,
};
use crate::entities::{component, count_history, cycle_count, high_volume_sku, weekly_count};
use crate::errors::StoreError;
use crate::models::{
    Component, CountDay, CountSession, HistoryEntry, HistoryFilter, Location, ProgressMap,
    SessionId, SessionKind, SessionScope,
};

/// Relational adapter over sea-orm (SQLite or Postgres).
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    db: Arc<DatabaseConnection>,
}

impl DatabaseStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Inserts or replaces a component row, keyed by barcode.
    pub async fn upsert_component(&self, component: &Component) -> Result<(), StoreError> {
        let model: component::Model = component.clone().into();
        let active: component::ActiveModel = model.into();
        let active = active.reset_all();
        component::Entity::insert(active)
            .on_conflict(
                OnConflict::column(component::Column::Barcode)
                    .update_columns([
                        component::Column::Description,
                        component::Column::MtdQuantity,
                        component::Column::FtpQuantity,
                        component::Column::HstdQuantity,
                        component::Column::TplQuantity,
                        component::Column::QuarantineQuantity,
                        component::Column::TotalQuantity,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await?;
        Ok(())
    }

    /// Adds a barcode to the curated weekly list for `day` at `location`.
    pub async fn add_high_volume_sku(
        &self,
        sku: &str,
        day: CountDay,
        location: Location,
    ) -> Result<(), StoreError> {
        high_volume_sku::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            sku: Set(sku.to_string()),
            day: Set(day.to_string()),
            location: Set(location.to_string()),
        }
        .insert(self.connection())
        .await?;
        Ok(())
    }

    async fn find_component(&self, barcode: &str) -> Result<Option<component::Model>, StoreError> {
        Ok(component::Entity::find()
            .filter(component::Column::Barcode.eq(barcode))
            .one(self.connection())
            .await?)
    }
}

fn monthly_session(row: cycle_count::Model) -> Result<CountSession, StoreError> {
    let location = parse_location(&row.location)?;
    Ok(CountSession {
        id: SessionId::new(row.id),
        scope: SessionScope::monthly(location),
        started_at: row.start_date,
        last_updated: row.last_updated,
        progress: decode_progress(&row.progress)?,
        completed: row.completed,
    })
}

fn weekly_session(row: weekly_count::Model) -> Result<CountSession, StoreError> {
    let day = row
        .day
        .parse::<CountDay>()
        .map_err(|_| StoreError::Decode(format!("unknown count day '{}'", row.day)))?;
    let mut scope = SessionScope::weekly(day);
    scope.location = parse_location(&row.location)?;
    Ok(CountSession {
        id: SessionId::new(row.id),
        scope,
        started_at: row.start_date,
        last_updated: row.last_updated,
        progress: decode_progress(&row.progress)?,
        completed: row.completed,
    })
}

fn history_entry(row: count_history::Model) -> Result<HistoryEntry, StoreError> {
    Ok(HistoryEntry {
        id: row.id,
        barcode: row.barcode,
        quantity: row.quantity,
        session_id: SessionId::new(row.session_id),
        count_type: row
            .count_type
            .parse::<SessionKind>()
            .map_err(|_| StoreError::Decode(format!("unknown count type '{}'", row.count_type)))?,
        actor: parse_actor(&row.actor)?,
        source: row.source,
        timestamp: row.timestamp,
        location: parse_location(&row.location)?,
    })
}

fn history_condition(filter: &HistoryFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(barcode) = &filter.barcode {
        condition = condition.add(count_history::Column::Barcode.eq(barcode.as_str()));
    }
    if let Some(location) = filter.location {
        condition = condition.add(count_history::Column::Location.eq(location.to_string()));
    }
    if let Some(session_id) = &filter.session_id {
        condition = condition.add(count_history::Column::SessionId.eq(session_id.as_str()));
    }
    if let Some(from) = filter.from {
        condition = condition.add(count_history::Column::Timestamp.gte(from));
    }
    if let Some(to) = filter.to {
        condition = condition.add(count_history::Column::Timestamp.lte(to));
    }
    condition
}

#[async_trait]
impl InventoryStore for DatabaseStore {
    #[instrument(skip(self))]
    async fn get_component(&self, barcode: &str) -> Result<Option<Component>, StoreError> {
        Ok(self.find_component(barcode).await?.map(Component::from))
    }

    #[instrument(skip(self))]
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
        match self.find_component(barcode).await? {
            Some(existing) => {
                let updated = Component::from(existing.clone()).with_quantity(location, quantity);
                let mut active: component::ActiveModel = existing.into();
                active.mtd_quantity = Set(updated.mtd_quantity);
                active.ftp_quantity = Set(updated.ftp_quantity);
                active.hstd_quantity = Set(updated.hstd_quantity);
                active.tpl_quantity = Set(updated.tpl_quantity);
                active.total_quantity = Set(updated.total_quantity);
                active.update(self.connection()).await?;
                Ok(updated)
            }
            None => {
                let created = Component::new_counted(barcode, location, quantity);
                debug!(%barcode, %location, "Inserting component first seen by a count");
                let model: component::Model = created.clone().into();
                let active: component::ActiveModel = model.into();
                active.reset_all().insert(self.connection()).await?;
                Ok(created)
            }
        }
    }

    async fn list_components(&self) -> Result<Vec<Component>, StoreError> {
        Ok(component::Entity::find()
            .order_by_asc(component::Column::Barcode)
            .all(self.connection())
            .await?
            .into_iter()
            .map(Component::from)
            .collect())
    }
}

#[async_trait]
impl SessionStore for DatabaseStore {
    #[instrument(skip(self), fields(session_id = %id))]
    async fn get_session(&self, id: &SessionId) -> Result<Option<CountSession>, StoreError> {
        match id.kind() {
            Some(SessionKind::Monthly) => cycle_count::Entity::find_by_id(id.as_str().to_string())
                .one(self.connection())
                .await?
                .map(monthly_session)
                .transpose(),
            Some(SessionKind::Weekly) => weekly_count::Entity::find_by_id(id.as_str().to_string())
                .one(self.connection())
                .await?
                .map(weekly_session)
                .transpose(),
            None => Ok(None),
        }
    }

    async fn get_session_progress(
        &self,
        id: &SessionId,
    ) -> Result<Option<ProgressMap>, StoreError> {
        Ok(self.get_session(id).await?.map(|session| session.progress))
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn put_session(&self, session: &CountSession) -> Result<(), StoreError> {
        let progress = encode_progress(&session.progress)?;
        match session.scope.kind {
            SessionKind::Monthly => {
                let active = cycle_count::ActiveModel {
                    id: Set(session.id.as_str().to_string()),
                    location: Set(session.scope.location.to_string()),
                    start_date: Set(session.started_at),
                    last_updated: Set(session.last_updated),
                    progress: Set(progress),
                    completed: Set(session.completed),
                };
                cycle_count::Entity::insert(active)
                    .on_conflict(
                        OnConflict::column(cycle_count::Column::Id)
                            .update_columns([
                                cycle_count::Column::StartDate,
                                cycle_count::Column::LastUpdated,
                                cycle_count::Column::Progress,
                                cycle_count::Column::Completed,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(self.connection())
                    .await?;
            }
            SessionKind::Weekly => {
                let day = session
                    .scope
                    .day
                    .ok_or_else(|| StoreError::Decode("weekly session without a day".into()))?;
                let active = weekly_count::ActiveModel {
                    id: Set(session.id.as_str().to_string()),
                    location: Set(session.scope.location.to_string()),
                    day: Set(day.to_string()),
                    start_date: Set(session.started_at),
                    last_updated: Set(session.last_updated),
                    progress: Set(progress),
                    completed: Set(session.completed),
                };
                weekly_count::Entity::insert(active)
                    .on_conflict(
                        OnConflict::column(weekly_count::Column::Id)
                            .update_columns([
                                weekly_count::Column::StartDate,
                                weekly_count::Column::LastUpdated,
                                weekly_count::Column::Progress,
                                weekly_count::Column::Completed,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(self.connection())
                    .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        match id.kind() {
            Some(SessionKind::Monthly) => {
                cycle_count::Entity::delete_by_id(id.as_str().to_string())
                    .exec(self.connection())
                    .await?;
            }
            Some(SessionKind::Weekly) => {
                weekly_count::Entity::delete_by_id(id.as_str().to_string())
                    .exec(self.connection())
                    .await?;
            }
            None => {}
        }
        Ok(())
    }

    async fn list_sessions(
        &self,
        kind: SessionKind,
        location: Option<Location>,
    ) -> Result<Vec<CountSession>, StoreError> {
        match kind {
            SessionKind::Monthly => {
                let mut query = cycle_count::Entity::find();
                if let Some(location) = location {
                    query = query.filter(cycle_count::Column::Location.eq(location.to_string()));
                }
                query
                    .order_by_desc(cycle_count::Column::StartDate)
                    .all(self.connection())
                    .await?
                    .into_iter()
                    .map(monthly_session)
                    .collect()
            }
            SessionKind::Weekly => {
                let mut query = weekly_count::Entity::find();
                if let Some(location) = location {
                    query = query.filter(weekly_count::Column::Location.eq(location.to_string()));
                }
                query
                    .order_by_desc(weekly_count::Column::StartDate)
                    .all(self.connection())
                    .await?
                    .into_iter()
                    .map(weekly_session)
                    .collect()
            }
        }
    }
}

#[async_trait]
impl HistoryStore for DatabaseStore {
    #[instrument(skip(self, entry), fields(barcode = %entry.barcode, session_id = %entry.session_id))]
    async fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        let active = count_history::ActiveModel {
            id: Set(entry.id),
            barcode: Set(entry.barcode.clone()),
            quantity: Set(entry.quantity),
            count_type: Set(entry.count_type.to_string()),
            session_id: Set(entry.session_id.as_str().to_string()),
            timestamp: Set(entry.timestamp),
            actor: Set(entry.actor.to_string()),
            source: Set(entry.source.clone()),
            location: Set(entry.location.to_string()),
        };
        count_history::Entity::insert(active)
            .exec_without_returning(self.connection())
            .await?;
        Ok(())
    }

    async fn query_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(count_history::Entity::find()
            .filter(history_condition(filter))
            .order_by_desc(count_history::Column::Timestamp)
            .all(self.connection())
            .await?
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                history_entry(row)
                    .map_err(|e| debug!(%id, error = %e, "Skipping unreadable history row"))
                    .ok()
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn delete_history(&self, filter: &HistoryFilter) -> Result<u64, StoreError> {
        let result = count_history::Entity::delete_many()
            .filter(history_condition(filter))
            .exec(self.connection())
            .await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl SkuCatalog for DatabaseStore {
    #[instrument(skip(self))]
    async fn list_expected_skus(&self, scope: &SessionScope) -> Result<BTreeSet<String>, StoreError> {
        match (scope.kind, scope.day) {
            (SessionKind::Weekly, Some(day)) => Ok(high_volume_sku::Entity::find()
                .filter(high_volume_sku::Column::Day.eq(day.to_string()))
                .filter(high_volume_sku::Column::Location.eq(scope.location.to_string()))
                .all(self.connection())
                .await?
                .into_iter()
                .map(|row| row.sku)
                .collect()),
            (SessionKind::Weekly, None) => Ok(BTreeSet::new()),
            (SessionKind::Monthly, _) => {
                let barcodes: Vec<String> = component::Entity::find()
                    .select_only()
                    .column(component::Column::Barcode)
                    .into_tuple()
                    .all(self.connection())
                    .await?;
                Ok(barcodes.into_iter().collect())
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.connection().ping().await?)
    }
}
