//! One analysis run: traverse once, aggregate, then derive every view.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::churn::{ChurnAggregator, TrackedFile};
use crate::engine::cochange::{CoChangeTracker, DEFAULT_MASS_UPDATE_THRESHOLD, FilePair};
use crate::engine::complexity::ComplexityEvaluator;
use crate::engine::coupling::{self, COUPLING_LIMIT};
use crate::engine::filter::should_ignore;
use crate::engine::risk::{self, HOTSPOT_LIMIT};
use crate::error::ChurnError;
use crate::models::commit::Commit;
use crate::models::report::AnalysisReport;

pub const DEFAULT_COMMIT_LIMIT: usize = 100;

/// Parameters of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub commit_limit: usize,
    /// Threshold for the ranked coupling list
    pub min_shared_commits: u64,
    /// Threshold for the coupling graph
    pub graph_min_shared_commits: u64,
    pub mass_update_threshold: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            commit_limit: DEFAULT_COMMIT_LIMIT,
            min_shared_commits: coupling::DEFAULT_MIN_SHARED_COMMITS,
            graph_min_shared_commits: coupling::DEFAULT_GRAPH_MIN_SHARED_COMMITS,
            mass_update_threshold: DEFAULT_MASS_UPDATE_THRESHOLD,
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> Result<()> {
        if self.commit_limit == 0 {
            bail!(ChurnError::invalid_request("commit_limit must be at least 1"));
        }
        if self.min_shared_commits == 0 {
            bail!(ChurnError::invalid_request("min_shared_commits must be at least 1"));
        }
        if self.graph_min_shared_commits == 0 {
            bail!(ChurnError::invalid_request(
                "graph_min_shared_commits must be at least 1"
            ));
        }
        if self.mass_update_threshold < 2 {
            bail!(ChurnError::invalid_request(
                "mass_update_threshold must be at least 2"
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation, checked between commits.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Aggregation state owned by exactly one run.
///
/// Commits go in whole through [`AnalysisContext::ingest`]; the state can
/// only be read by consuming the context with [`AnalysisContext::finish`].
pub struct AnalysisContext {
    churn: ChurnAggregator,
    cochange: CoChangeTracker,
    commits_analyzed: usize,
}

/// Final aggregate of a traversal.
#[derive(Debug)]
pub struct Traversal {
    pub commits_analyzed: usize,
    pub files: Vec<TrackedFile>,
    pub pairs: HashMap<FilePair, u64>,
    pub mass_updates_skipped: usize,
}

impl AnalysisContext {
    pub fn new(mass_update_threshold: usize) -> Self {
        Self {
            churn: ChurnAggregator::new(),
            cochange: CoChangeTracker::new(mass_update_threshold),
            commits_analyzed: 0,
        }
    }

    /// Book every non-ignored file of one commit.
    pub fn ingest(&mut self, commit: &Commit) {
        self.commits_analyzed += 1;

        let mut touched: Vec<&str> = Vec::with_capacity(commit.changes.len());
        for change in &commit.changes {
            if change.filename.is_empty() || should_ignore(&change.filename) {
                continue;
            }
            self.churn.record(change, &commit.author);
            touched.push(&change.filename);
        }
        self.cochange.record_commit(&touched);
    }

    pub fn finish(self) -> Traversal {
        Traversal {
            commits_analyzed: self.commits_analyzed,
            mass_updates_skipped: self.cochange.skipped_commits(),
            files: self.churn.into_files(),
            pairs: self.cochange.into_pairs(),
        }
    }
}

/// Run a full analysis over `commits`, newest first.
///
/// At most `options.commit_limit` commits are read whatever the provider
/// yields. Any provider error or cancellation aborts the run before a report
/// exists.
pub fn run_analysis<I>(
    repository: &str,
    commits: I,
    evaluator: &ComplexityEvaluator,
    options: &AnalysisOptions,
    cancel: &CancellationToken,
) -> Result<AnalysisReport>
where
    I: IntoIterator<Item = Result<Commit>>,
{
    options.validate()?;

    let mut ctx = AnalysisContext::new(options.mass_update_threshold);
    for commit in commits.into_iter().take(options.commit_limit) {
        if cancel.is_cancelled() {
            bail!(ChurnError::cancelled());
        }
        ctx.ingest(&commit?);
    }
    if cancel.is_cancelled() {
        bail!(ChurnError::cancelled());
    }

    let traversal = ctx.finish();
    info!(
        repository,
        commits = traversal.commits_analyzed,
        files = traversal.files.len(),
        pairs = traversal.pairs.len(),
        mass_updates_skipped = traversal.mass_updates_skipped,
        "traversal complete"
    );

    Ok(derive_report(repository, traversal, evaluator, options))
}

fn derive_report(
    repository: &str,
    traversal: Traversal,
    evaluator: &ComplexityEvaluator,
    options: &AnalysisOptions,
) -> AnalysisReport {
    let Traversal {
        commits_analyzed,
        files,
        pairs,
        ..
    } = traversal;

    let scored = risk::score_files(files, evaluator);
    let risks = risk::risk_map(&scored);
    let hotspots = risk::rank_hotspots(&scored, HOTSPOT_LIMIT);
    let ranked_pairs = coupling::rank_pairs(
        &pairs,
        commits_analyzed,
        options.min_shared_commits,
        COUPLING_LIMIT,
    );
    let graph = coupling::build_graph(&pairs, &risks, options.graph_min_shared_commits);

    debug!(
        scored = scored.len(),
        hotspots = hotspots.len(),
        coupling = ranked_pairs.len(),
        graph_nodes = graph.stats.total_nodes,
        "report derived"
    );

    AnalysisReport {
        repository: repository.to_string(),
        commits_analyzed,
        hotspots,
        coupling: ranked_pairs,
        graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::commit::ChangeRecord;

    fn commit(author: &str, files: &[(&str, u64, u64)]) -> Commit {
        Commit {
            hash: String::new(),
            author: author.to_string(),
            changes: files
                .iter()
                .map(|(p, a, d)| ChangeRecord::from_path(p, *a, *d))
                .collect(),
        }
    }

    fn ok(commits: Vec<Commit>) -> Vec<Result<Commit>> {
        commits.into_iter().map(Ok).collect()
    }

    fn run(dir: &std::path::Path, commits: Vec<Commit>, options: &AnalysisOptions) -> AnalysisReport {
        let evaluator = ComplexityEvaluator::with_defaults(dir);
        run_analysis("repo", ok(commits), &evaluator, options, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn ignored_files_never_enter_tallies() {
        let mut ctx = AnalysisContext::new(50);
        ctx.ingest(&commit(
            "X",
            &[("a.py", 1, 1), ("yarn.lock", 500, 0), ("logo.png", 0, 0), ("b.py", 2, 0)],
        ));
        let t = ctx.finish();
        let names: Vec<&str> = t.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.py", "b.py"]);
        assert_eq!(t.pairs.len(), 1);
        assert_eq!(t.commits_analyzed, 1);
    }

    #[test]
    fn churn_conservation() {
        let commits = vec![
            commit("X", &[("a.py", 3, 1), ("data.json", 90, 9)]),
            commit("Y", &[("b.py", 4, 4), ("a.py", 0, 2)]),
            commit("Z", &[("c.py", 7, 0)]),
        ];
        let expected: u64 = commits
            .iter()
            .flat_map(|c| &c.changes)
            .filter(|r| !should_ignore(&r.filename))
            .map(|r| r.churn())
            .sum();

        let mut ctx = AnalysisContext::new(50);
        for c in &commits {
            ctx.ingest(c);
        }
        let booked: u64 = ctx.finish().files.iter().map(|f| f.churn).sum();
        assert_eq!(booked, expected);
    }

    #[test]
    fn ignored_files_do_not_count_toward_mass_update() {
        let mut changes: Vec<(String, u64, u64)> =
            (0..60).map(|i| (format!("img{i}.png"), 1, 0)).collect();
        changes.push(("a.py".into(), 1, 0));
        changes.push(("b.py".into(), 1, 0));
        let refs: Vec<(&str, u64, u64)> =
            changes.iter().map(|(p, a, d)| (p.as_str(), *a, *d)).collect();

        let mut ctx = AnalysisContext::new(50);
        ctx.ingest(&commit("X", &refs));
        let t = ctx.finish();
        assert_eq!(t.mass_updates_skipped, 0);
        assert_eq!(t.pairs.len(), 1);
    }

    #[test]
    fn commit_limit_bounds_traversal() {
        let dir = tempfile::TempDir::new().unwrap();
        let commits: Vec<Commit> = (0..8).map(|_| commit("X", &[("a.py", 1, 0)])).collect();
        let options = AnalysisOptions {
            commit_limit: 5,
            ..AnalysisOptions::default()
        };
        let report = run(dir.path(), commits, &options);
        assert_eq!(report.commits_analyzed, 5);
    }

    #[test]
    fn provider_error_aborts_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let evaluator = ComplexityEvaluator::with_defaults(dir.path());
        let commits: Vec<Result<Commit>> = vec![
            Ok(commit("X", &[("a.py", 1, 0)])),
            Err(ChurnError::repository_access("repo", "broken pipe").into()),
        ];
        let err = run_analysis(
            "repo",
            commits,
            &evaluator,
            &AnalysisOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ChurnError>().unwrap().code,
            ErrorCode::RepositoryAccess
        );
    }

    #[test]
    fn cancelled_run_returns_no_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let evaluator = ComplexityEvaluator::with_defaults(dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_analysis(
            "repo",
            ok(vec![commit("X", &[("a.py", 1, 0)])]),
            &evaluator,
            &AnalysisOptions::default(),
            &cancel,
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ChurnError>().unwrap().code,
            ErrorCode::Cancelled
        );
    }

    #[test]
    fn invalid_options_are_rejected() {
        let bad = [
            AnalysisOptions { commit_limit: 0, ..AnalysisOptions::default() },
            AnalysisOptions { min_shared_commits: 0, ..AnalysisOptions::default() },
            AnalysisOptions { graph_min_shared_commits: 0, ..AnalysisOptions::default() },
            AnalysisOptions { mass_update_threshold: 1, ..AnalysisOptions::default() },
        ];
        for options in bad {
            let err = options.validate().unwrap_err();
            assert_eq!(
                err.downcast_ref::<ChurnError>().unwrap().code,
                ErrorCode::InvalidRequest
            );
        }
    }

    #[test]
    fn separate_runs_share_no_state() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "").unwrap();
        let history = vec![commit("X", &[("a.py", 4, 0)])];

        let first = run(dir.path(), history.clone(), &AnalysisOptions::default());
        let second = run(dir.path(), history, &AnalysisOptions::default());
        assert_eq!(first.hotspots, second.hotspots);
        assert_eq!(second.hotspots[0].churn, 4);
    }

    #[test]
    fn end_to_end_scenario() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/a.py"),
            "def f(x):\n    if x:\n        return 1\n    while x:\n        x -= 1\n    return 0\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("src/b.py"), "VALUE = 1\n").unwrap();

        let mut history = vec![
            commit("X", &[("src/a.py", 10, 2), ("src/b.py", 3, 0)]),
            commit("X", &[("src/a.py", 5, 5), ("src/b.py", 1, 1)]),
            commit("Y", &[("src/a.py", 2, 0), ("src/b.py", 2, 2)]),
            commit("X", &[("src/a.py", 1, 1)]),
            commit("Z", &[("src/a.py", 1, 0)]),
        ];
        // a.py author events so far: X:3 Y:1 Z:1; top up to X:5 Y:3 Z:1
        history.push(commit("X", &[("src/a.py", 1, 0)]));
        history.push(commit("X", &[("src/a.py", 1, 0)]));
        history.push(commit("Y", &[("src/a.py", 1, 0)]));
        history.push(commit("Y", &[("src/a.py", 1, 0)]));

        let expected_churn: u64 = history
            .iter()
            .flat_map(|c| &c.changes)
            .filter(|r| r.filename == "a.py")
            .map(|r| r.churn())
            .sum();

        let options = AnalysisOptions {
            min_shared_commits: 3,
            ..AnalysisOptions::default()
        };
        let report = run(dir.path(), history.clone(), &options);

        let a = report.hotspots.iter().find(|h| h.file == "a.py").unwrap();
        assert_eq!(a.complexity, 3);
        assert_eq!(a.churn, expected_churn);
        assert_eq!(a.risk_score, expected_churn * 3);
        assert_eq!(a.top_authors.0, vec![("X".to_string(), 5), ("Y".to_string(), 3)]);

        assert_eq!(report.coupling.len(), 1);
        let pair = &report.coupling[0];
        assert_eq!((pair.file_a.as_str(), pair.file_b.as_str()), ("a.py", "b.py"));
        assert_eq!(pair.shared_commits, 3);

        let stricter = AnalysisOptions {
            min_shared_commits: 4,
            ..AnalysisOptions::default()
        };
        assert!(run(dir.path(), history, &stricter).coupling.is_empty());
    }

    #[test]
    fn deleted_file_leaves_hotspots_but_stays_coupled() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("kept.py"), "").unwrap();
        let history: Vec<Commit> = (0..3)
            .map(|_| commit("X", &[("kept.py", 1, 0), ("gone.py", 5, 0)]))
            .collect();

        let report = run(dir.path(), history, &AnalysisOptions::default());
        let files: Vec<&str> = report.hotspots.iter().map(|h| h.file.as_str()).collect();
        assert_eq!(files, vec!["kept.py"]);
        assert_eq!(report.coupling[0].file_a, "gone.py");
        assert_eq!(report.graph.stats.total_nodes, 2);
        let gone = report.graph.nodes.iter().find(|n| n.id == "gone.py").unwrap();
        assert_eq!(gone.size, coupling::NODE_SIZE_MIN);
    }

    #[test]
    fn graph_sizes_non_hotspot_files_from_all_scores() {
        let dir = tempfile::TempDir::new().unwrap();
        // twelve heavy files fill the hotspot list; low.py ranks below them
        let mut history = Vec::new();
        for i in 0..12 {
            let name = format!("heavy{i:02}.py");
            std::fs::write(dir.path().join(&name), "").unwrap();
            history.push(commit("X", &[(name.as_str(), 100, 0)]));
        }
        std::fs::write(dir.path().join("low.py"), "").unwrap();
        std::fs::write(dir.path().join("peer.py"), "").unwrap();
        for _ in 0..2 {
            history.push(commit("X", &[("low.py", 10, 0), ("peer.py", 10, 0)]));
        }

        let report = run(dir.path(), history, &AnalysisOptions::default());
        assert_eq!(report.hotspots.len(), 10);
        assert!(report.hotspots.iter().all(|h| h.file != "low.py"));

        let low = report.graph.nodes.iter().find(|n| n.id == "low.py").unwrap();
        // risk 20 against a maximum of 100
        assert!((low.size - 18.0).abs() < 1e-9);
    }
}
