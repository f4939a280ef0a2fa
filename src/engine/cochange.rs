use std::collections::HashMap;

/// Commits touching more files than this are treated as bulk operations.
pub const DEFAULT_MASS_UPDATE_THRESHOLD: usize = 50;

/// Unordered file pair; `a <= b` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePair {
    a: String,
    b: String,
}

impl FilePair {
    pub fn new(x: &str, y: &str) -> Self {
        if x <= y {
            Self {
                a: x.to_string(),
                b: y.to_string(),
            }
        } else {
            Self {
                a: y.to_string(),
                b: x.to_string(),
            }
        }
    }

    pub fn first(&self) -> &str {
        &self.a
    }

    pub fn second(&self) -> &str {
        &self.b
    }
}

/// Shared-commit counts per file pair.
#[derive(Debug)]
pub struct CoChangeTracker {
    mass_update_threshold: usize,
    pairs: HashMap<FilePair, u64>,
    skipped_commits: usize,
}

impl CoChangeTracker {
    pub fn new(mass_update_threshold: usize) -> Self {
        Self {
            mass_update_threshold,
            pairs: HashMap::new(),
            skipped_commits: 0,
        }
    }

    /// Record every unordered pair among one commit's non-ignored files.
    ///
    /// Duplicate names within the commit collapse first. Commits above the
    /// mass-update threshold contribute nothing.
    pub fn record_commit(&mut self, files: &[&str]) {
        let mut touched: Vec<&str> = files.to_vec();
        touched.sort_unstable();
        touched.dedup();

        if touched.len() > self.mass_update_threshold {
            self.skipped_commits += 1;
            return;
        }
        if touched.len() < 2 {
            return;
        }

        for i in 0..touched.len() {
            for j in (i + 1)..touched.len() {
                *self
                    .pairs
                    .entry(FilePair::new(touched[i], touched[j]))
                    .or_insert(0) += 1;
            }
        }
    }

    /// Commits excluded as mass updates.
    pub fn skipped_commits(&self) -> usize {
        self.skipped_commits
    }

    pub fn into_pairs(self) -> HashMap<FilePair, u64> {
        self.pairs
    }
}

impl Default for CoChangeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MASS_UPDATE_THRESHOLD)
    }
}
