//! Data summary for an external report writer. No prose is generated here.

use crate::models::report::{AnalysisReport, HealthSummary};

pub const DEFAULT_SUMMARY_HOTSPOTS: usize = 5;
/// Coupling pairs included in the summary.
pub const SUMMARY_COUPLING_LIMIT: usize = 5;

pub fn build_summary(report: &AnalysisReport, top_n: usize, include_coupling: bool) -> HealthSummary {
    let hotspots = &report.hotspots;
    let avg_risk_score = if hotspots.is_empty() {
        0.0
    } else {
        hotspots.iter().map(|h| h.risk_score as f64).sum::<f64>() / hotspots.len() as f64
    };
    let bus_factor_files: Vec<String> = hotspots
        .iter()
        .filter(|h| h.is_bus_factor_risk())
        .map(|h| h.file.clone())
        .collect();
    let logical_coupling = (include_coupling && !report.coupling.is_empty()).then(|| {
        report
            .coupling
            .iter()
            .take(SUMMARY_COUPLING_LIMIT)
            .cloned()
            .collect()
    });

    HealthSummary {
        repository_path: report.repository.clone(),
        total_commits_analyzed: report.commits_analyzed,
        total_files: hotspots.len(),
        bus_factor: bus_factor_files.len(),
        avg_risk_score,
        top_hotspots: hotspots.iter().take(top_n).cloned().collect(),
        bus_factor_files,
        logical_coupling,
    }
}
