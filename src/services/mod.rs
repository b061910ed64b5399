// Count reconciliation
pub mod progress;
pub mod reconciliation;

// Read-side services
pub mod audit;
pub mod dashboard;
pub mod history;

pub use audit::AuditService;
pub use dashboard::DashboardService;
pub use history::HistoryService;
pub use reconciliation::ReconciliationEngine;
