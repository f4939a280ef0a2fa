use anyhow::{Result, bail};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::engine::analysis::{self, AnalysisOptions, CancellationToken};
use crate::engine::complexity::ComplexityEvaluator;
use crate::engine::history::GitHistory;
use crate::engine::summary::{self, DEFAULT_SUMMARY_HOTSPOTS};
use crate::error::{ChurnError, ErrorCode};
use crate::models::coupling::{CouplingEntry, CouplingGraph};
use crate::models::hotspot::Hotspot;
use crate::models::report::{AnalysisReport, HealthSummary};

// ---------------------------------------------------------------------------
// AppService: unified core logic for CLI / Session / MCP
// ---------------------------------------------------------------------------

pub struct AppService {
    workspace_root: Option<PathBuf>,
    defaults: AnalysisOptions,
}

/// Per-call overrides of the service's default analysis options.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOverrides {
    pub commits: Option<usize>,
    pub min_shared_commits: Option<u64>,
    pub graph_min_shared_commits: Option<u64>,
    pub mass_update_threshold: Option<usize>,
}

impl Default for AppService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppService {
    /// Create an unrestricted service (CLI mode).
    pub fn new() -> Self {
        Self {
            workspace_root: None,
            defaults: AnalysisOptions::default(),
        }
    }

    /// Create a sandboxed service (MCP mode) that restricts repositories to `root`.
    /// The root is canonicalized and must be a valid, non-empty directory.
    pub fn sandboxed(root: PathBuf) -> Result<Self> {
        let canonical_root = std::fs::canonicalize(&root).map_err(|_| {
            ChurnError::invalid_request(format!("Invalid workspace root: {}", root.display()))
        })?;
        if canonical_root.as_os_str().is_empty() {
            bail!(ChurnError::invalid_request("Workspace root must not be empty"));
        }
        Ok(Self {
            workspace_root: Some(canonical_root),
            defaults: AnalysisOptions::default(),
        })
    }

    /// Create a service sandboxed to `CHURNSCOPE_WORKSPACE` if set (Session mode).
    pub fn from_env() -> Self {
        match std::env::var("CHURNSCOPE_WORKSPACE") {
            Ok(ws) if !ws.is_empty() => {
                Self::sandboxed(PathBuf::from(ws)).unwrap_or_else(|_| Self::new())
            }
            _ => Self::new(),
        }
    }

    /// Replace the defaults that overrides are applied on top of.
    pub fn with_defaults(mut self, defaults: AnalysisOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &AnalysisOptions {
        &self.defaults
    }

    /// Merge per-call overrides onto the service defaults.
    pub fn options(&self, overrides: &AnalysisOverrides) -> AnalysisOptions {
        AnalysisOptions {
            commit_limit: overrides.commits.unwrap_or(self.defaults.commit_limit),
            min_shared_commits: overrides
                .min_shared_commits
                .unwrap_or(self.defaults.min_shared_commits),
            graph_min_shared_commits: overrides
                .graph_min_shared_commits
                .unwrap_or(self.defaults.graph_min_shared_commits),
            mass_update_threshold: overrides
                .mass_update_threshold
                .unwrap_or(self.defaults.mass_update_threshold),
        }
    }

    // -----------------------------------------------------------------------
    // Validation helpers
    // -----------------------------------------------------------------------

    /// Validate and canonicalize a repository directory. Returns the canonical path.
    fn validate_dir(&self, dir: &str) -> Result<PathBuf> {
        let canonical = std::fs::canonicalize(dir).map_err(|e| {
            warn!(dir = dir, "validate_dir: directory not found");
            ChurnError::repository_access(dir, e)
        })?;
        if let Some(root) = &self.workspace_root
            && !canonical.starts_with(root)
        {
            warn!(dir = dir, "validate_dir: path outside workspace boundary");
            bail!(ChurnError::new(
                ErrorCode::PathOutOfBounds,
                format!("Path outside workspace boundary: {dir}"),
            ));
        }
        Ok(canonical)
    }

    // -----------------------------------------------------------------------
    // Analyses
    // -----------------------------------------------------------------------

    /// Run one full analysis of the repository containing `dir`.
    pub fn analyze(&self, dir: &str, options: &AnalysisOptions) -> Result<AnalysisReport> {
        self.analyze_cancellable(dir, options, &CancellationToken::new())
    }

    pub fn analyze_cancellable(
        &self,
        dir: &str,
        options: &AnalysisOptions,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport> {
        debug!(dir = dir, options = ?options, "analyze called");
        options.validate()?;

        let canonical_dir = self.validate_dir(dir)?;
        let history = GitHistory::open(&canonical_dir)?;
        let repository = history.root().display().to_string();
        let commits = history.commits(options.commit_limit)?;
        let evaluator = ComplexityEvaluator::with_defaults(history.root());

        let report = analysis::run_analysis(&repository, commits, &evaluator, options, cancel)?;
        debug!(
            dir = dir,
            commits_analyzed = report.commits_analyzed,
            hotspots = report.hotspots.len(),
            coupling = report.coupling.len(),
            graph_edges = report.graph.stats.total_edges,
            "analyze completed"
        );
        Ok(report)
    }

    pub fn hotspots(&self, dir: &str, options: &AnalysisOptions) -> Result<Vec<Hotspot>> {
        Ok(self.analyze(dir, options)?.hotspots)
    }

    pub fn coupling(&self, dir: &str, options: &AnalysisOptions) -> Result<Vec<CouplingEntry>> {
        Ok(self.analyze(dir, options)?.coupling)
    }

    pub fn graph(&self, dir: &str, options: &AnalysisOptions) -> Result<CouplingGraph> {
        Ok(self.analyze(dir, options)?.graph)
    }

    /// Health summary over one run; `top` defaults to five hotspots.
    pub fn summary(
        &self,
        dir: &str,
        options: &AnalysisOptions,
        top: Option<usize>,
        include_coupling: bool,
    ) -> Result<HealthSummary> {
        let report = self.analyze(dir, options)?;
        let top = top.unwrap_or(DEFAULT_SUMMARY_HOTSPOTS);
        let summary = summary::build_summary(&report, top, include_coupling);
        debug!(
            dir = dir,
            bus_factor = summary.bus_factor,
            avg_risk_score = summary.avg_risk_score,
            "summary completed"
        );
        Ok(summary)
    }
}
