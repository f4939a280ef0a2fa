use serde::{Deserialize, Serialize};

/// One commit as yielded by a history provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    /// Per-file deltas; empty for merge commits.
    pub changes: Vec<ChangeRecord>,
}

/// A single file modified by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Base file name, the aggregation key across renames.
    pub filename: String,
    /// Path in the commit's tree, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    pub added_lines: u64,
    pub deleted_lines: u64,
}

impl ChangeRecord {
    /// Build a record from a tree path, deriving the base name.
    pub fn from_path(path: &str, added_lines: u64, deleted_lines: u64) -> Self {
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        Self {
            filename,
            relative_path: (!path.is_empty()).then(|| path.to_string()),
            added_lines,
            deleted_lines,
        }
    }

    pub fn churn(&self) -> u64 {
        self.added_lines + self.deleted_lines
    }
}
