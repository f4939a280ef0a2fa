use serde::{Deserialize, Serialize};

/// A request to the churnscope engine (session mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub command: Command,
    /// Repository directory
    #[serde(default = "default_dir")]
    pub dir: String,
    /// Number of recent commits to analyze
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commits: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_shared_commits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_min_shared_commits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass_update_threshold: Option<usize>,
    /// Hotspots included in a summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
    /// Include coupling pairs in a summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_coupling: Option<bool>,
}

fn default_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Analyze,
    Hotspots,
    Coupling,
    Graph,
    Summary,
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_request_uses_defaults() {
        let req: AnalysisRequest = serde_json::from_str(r#"{"command":"hotspots"}"#).unwrap();
        assert_eq!(req.command, Command::Hotspots);
        assert_eq!(req.dir, ".");
        assert!(req.commits.is_none());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_str::<AnalysisRequest>(r#"{"command":"ast"}"#).is_err());
    }
}
