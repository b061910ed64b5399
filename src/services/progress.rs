//! Completion and percentage accounting for count sessions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A session is complete once every expected SKU has a count. An empty
/// expected set never completes.
pub fn is_complete(progress_len: usize, expected_len: usize) -> bool {
    expected_len > 0 && progress_len == expected_len
}

/// Share of expected SKUs counted, in percent. 0.0 when nothing is expected.
pub fn percent_complete(progress_len: usize, expected_len: usize) -> f64 {
    if expected_len == 0 {
        return 0.0;
    }
    let percent = progress_len as f64 / expected_len as f64 * 100.0;
    percent.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgressSummary {
    pub counted: usize,
    pub expected: usize,
    pub percent: f64,
    pub completed: bool,
}

impl ProgressSummary {
    pub fn new(counted: usize, expected: usize) -> Self {
        Self {
            counted,
            expected,
            percent: percent_complete(counted, expected),
            completed: is_complete(counted, expected),
        }
    }
}
