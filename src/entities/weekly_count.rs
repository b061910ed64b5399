use sea_orm::prelude::*;
use serde::{Deserialize, Serialize};

/// Weekly high-volume count session, one row per weekday per ISO week.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weekly_counts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub location: String,
    pub day: String,
    pub start_date: DateTimeUtc,
    pub last_updated: DateTimeUtc,
    #[sea_orm(column_type = "Text")]
    pub progress: String,
    pub completed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
