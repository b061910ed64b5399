//! Domain types shared by the stores, the reconciliation engine and the HTTP layer.

pub mod component;
pub mod history;
pub mod location;
pub mod session;

pub use component::Component;
pub use history::{Actor, HistoryEntry, HistoryFilter};
pub use location::Location;
pub use session::{CountDay, CountSession, ProgressMap, SessionId, SessionKind, SessionScope};
