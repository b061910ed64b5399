use sea_orm::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub barcode: String,
    pub description: String,
    pub mtd_quantity: i32,
    pub ftp_quantity: i32,
    pub hstd_quantity: i32,
    pub tpl_quantity: i32,
    pub quarantine_quantity: i32,
    pub total_quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for models::Component {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            barcode: m.barcode,
            description: m.description,
            mtd_quantity: m.mtd_quantity,
            ftp_quantity: m.ftp_quantity,
            hstd_quantity: m.hstd_quantity,
            tpl_quantity: m.tpl_quantity,
            quarantine_quantity: m.quarantine_quantity,
            total_quantity: m.total_quantity,
        }
    }
}

impl From<models::Component> for Model {
    fn from(c: models::Component) -> Self {
        Self {
            id: c.id,
            barcode: c.barcode,
            description: c.description,
            mtd_quantity: c.mtd_quantity,
            ftp_quantity: c.ftp_quantity,
            hstd_quantity: c.hstd_quantity,
            tpl_quantity: c.tpl_quantity,
            quarantine_quantity: c.quarantine_quantity,
            total_quantity: c.total_quantity,
        }
    }
}
