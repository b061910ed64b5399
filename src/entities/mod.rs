//! sea-orm entities backing the database store.

pub mod component;
pub mod count_history;
pub mod cycle_count;
pub mod high_volume_sku;
pub mod weekly_count;
