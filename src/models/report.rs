use serde::Serialize;

use super::coupling::{CouplingEntry, CouplingGraph};
use super::hotspot::Hotspot;

/// The three data products of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub repository: String,
    pub commits_analyzed: usize,
    pub hotspots: Vec<Hotspot>,
    pub coupling: Vec<CouplingEntry>,
    pub graph: CouplingGraph,
}

/// Data summary handed to an external report writer.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub repository_path: String,
    pub total_commits_analyzed: usize,
    pub total_files: usize,
    pub bus_factor: usize,
    pub avg_risk_score: f64,
    pub top_hotspots: Vec<Hotspot>,
    /// Hotspots where one author owns more than 80% of the changes
    pub bus_factor_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_coupling: Option<Vec<CouplingEntry>>,
}
