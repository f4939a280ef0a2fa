use serde::{Deserialize, Serialize};

/// A ranked pair of files that change together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingEntry {
    pub file_a: String,
    pub file_b: String,
    /// Commits in which both files changed
    pub shared_commits: u64,
    /// shared_commits / commits analyzed, e.g. "6.0%"
    pub strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub size: f64,
    pub color: String,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: u64,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub max_weight: u64,
    pub avg_weight: f64,
}

/// Graph-ready view of logical coupling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
}
