use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::location::Location;

/// A stocked component, keyed by barcode, with its quantity on hand per location.
///
/// `total_quantity` is derived: the four location quantities plus quarantine.
/// Use [`Component::with_quantity`] to change a location so the total stays in
/// step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Component {
    pub id: String,
    pub barcode: String,
    pub description: String,
    pub mtd_quantity: i32,
    pub ftp_quantity: i32,
    pub hstd_quantity: i32,
    pub tpl_quantity: i32,
    pub quarantine_quantity: i32,
    pub total_quantity: i32,
}

impl Component {
    /// A component first seen through a count: only `location` holds stock.
    pub fn new_counted(barcode: impl Into<String>, location: Location, quantity: i32) -> Self {
        let component = Self {
            id: Uuid::new_v4().to_string(),
            barcode: barcode.into(),
            description: String::new(),
            mtd_quantity: 0,
            ftp_quantity: 0,
            hstd_quantity: 0,
            tpl_quantity: 0,
            quarantine_quantity: 0,
            total_quantity: 0,
        };
        component.with_quantity(location, quantity)
    }

    pub fn quantity_at(&self, location: Location) -> i32 {
        match location {
            Location::MtD => self.mtd_quantity,
            Location::FtP => self.ftp_quantity,
            Location::Hstd => self.hstd_quantity,
            Location::ThirdParty => self.tpl_quantity,
        }
    }

    /// Returns a copy with `location` set to `quantity` and the total recomputed.
    pub fn with_quantity(mut self, location: Location, quantity: i32) -> Self {
        match location {
            Location::MtD => self.mtd_quantity = quantity,
            Location::FtP => self.ftp_quantity = quantity,
            Location::Hstd => self.hstd_quantity = quantity,
            Location::ThirdParty => self.tpl_quantity = quantity,
        }
        self.total_quantity = self.computed_total();
        self
    }

    pub fn computed_total(&self) -> i32 {
        self.mtd_quantity
            + self.ftp_quantity
            + self.hstd_quantity
            + self.tpl_quantity
            + self.quarantine_quantity
    }
}
