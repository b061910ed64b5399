pub mod audit;
pub mod common;
pub mod components;
pub mod counts;
pub mod dashboard;
pub mod history;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
