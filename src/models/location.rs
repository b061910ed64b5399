use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Physical stock location a component can be counted at.
///
/// The wire form is the short code used on the floor (`MtD`, `FtP`, `HSTD`,
/// `3PL`); parsing is exact.
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
    AsRefStr,
    ToSchema,
)]
pub enum Location {
    #[serde(rename = "MtD")]
    #[strum(serialize = "MtD")]
    MtD,

    #[serde(rename = "FtP")]
    #[strum(serialize = "FtP")]
    FtP,

    #[serde(rename = "HSTD")]
    #[strum(serialize = "HSTD")]
    Hstd,

    #[serde(rename = "3PL")]
    #[strum(serialize = "3PL")]
    ThirdParty,
}

impl Location {
    /// All locations in display order.
    pub fn all() -> Vec<Location> {
        Location::iter().collect()
    }

    /// Whether this location runs the weekly high-volume count.
    pub fn has_weekly_count(&self) -> bool {
        matches!(self, Location::Hstd)
    }

    /// Parses a location code, producing the operator-facing message on failure.
    pub fn parse(raw: Option<&str>) -> Result<Location, ServiceError> {
        let raw = raw.map(str::trim).filter(|value| !value.is_empty());
        match raw {
            None => Err(ServiceError::ValidationError(
                "No location selected. Please select a location (MtD, FtP, HSTD, 3PL).".to_string(),
            )),
            Some(code) => code.parse::<Location>().map_err(|_| {
                ServiceError::ValidationError(format!(
                    "Invalid location: {}. Expected one of: MtD, FtP, HSTD, 3PL",
                    code
                ))
            }),
        }
    }
}
