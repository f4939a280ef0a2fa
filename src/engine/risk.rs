use std::collections::HashMap;

use rayon::prelude::*;

use crate::engine::churn::{TrackedFile, top_authors};
use crate::engine::complexity::ComplexityEvaluator;
use crate::models::hotspot::Hotspot;
use crate::models::metrics::{FileMetrics, TopAuthors};

/// Binding size of the hotspot list.
pub const HOTSPOT_LIMIT: usize = 10;
/// Authors reported per hotspot.
pub const TOP_AUTHOR_LIMIT: usize = 2;

/// A tracked file that still exists and has a complexity score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredFile {
    pub filename: String,
    pub metrics: FileMetrics,
}

/// Attach complexity to every tracked file that still exists on disk.
///
/// Files are evaluated in parallel; output keeps the input (first-seen) order.
pub fn score_files(files: Vec<TrackedFile>, evaluator: &ComplexityEvaluator) -> Vec<ScoredFile> {
    files
        .into_par_iter()
        .filter_map(|file| {
            let complexity = evaluator.evaluate(&file.filename, file.relative_path.as_deref())?;
            Some(ScoredFile {
                filename: file.filename,
                metrics: FileMetrics {
                    churn: file.churn,
                    author_counts: file.authors,
                    complexity,
                },
            })
        })
        .collect()
}

/// Risk score for every scored file, ungated by rank.
pub fn risk_map(scored: &[ScoredFile]) -> HashMap<String, u64> {
    scored
        .iter()
        .map(|f| (f.filename.clone(), f.metrics.risk_score()))
        .collect()
}

/// Highest risk first, at most `limit`; equal scores keep input order.
pub fn rank_hotspots(scored: &[ScoredFile], limit: usize) -> Vec<Hotspot> {
    let mut ranked: Vec<&ScoredFile> = scored.iter().collect();
    ranked.sort_by(|a, b| b.metrics.risk_score().cmp(&a.metrics.risk_score()));
    ranked
        .into_iter()
        .take(limit)
        .map(|f| Hotspot {
            file: f.filename.clone(),
            churn: f.metrics.churn,
            complexity: f.metrics.complexity,
            risk_score: f.metrics.risk_score(),
            top_authors: TopAuthors(top_authors(&f.metrics.author_counts, TOP_AUTHOR_LIMIT)),
            total_changes: f.metrics.total_changes(),
        })
        .collect()
}
