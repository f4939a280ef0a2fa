use serde::Serialize;

use super::metrics::TopAuthors;

/// A ranked file with high churn x complexity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hotspot {
    pub file: String,
    pub churn: u64,
    pub complexity: u32,
    pub risk_score: u64,
    /// At most two authors, highest change count first.
    pub top_authors: TopAuthors,
    /// Change events across every author of the file
    pub total_changes: u64,
}

impl Hotspot {
    /// True when the leading author holds more than 80% of all changes.
    pub fn is_bus_factor_risk(&self) -> bool {
        let top = self.top_authors.0.first().map(|(_, n)| *n).unwrap_or(0);
        self.total_changes > 0 && top * 5 > self.total_changes * 4
    }
}
