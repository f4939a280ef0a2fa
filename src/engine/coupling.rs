//! Logical coupling views over co-change counts.

use std::collections::{HashMap, HashSet};

use crate::engine::cochange::FilePair;
use crate::models::coupling::{CouplingEntry, CouplingGraph, GraphEdge, GraphNode, GraphStats};

/// Binding size of the ranked coupling list.
pub const COUPLING_LIMIT: usize = 10;
pub const DEFAULT_MIN_SHARED_COMMITS: u64 = 3;
/// The graph is exploratory, so it keeps weaker pairs than the ranked list.
pub const DEFAULT_GRAPH_MIN_SHARED_COMMITS: u64 = 2;

pub const NODE_SIZE_MIN: f64 = 10.0;
pub const NODE_SIZE_MAX: f64 = 50.0;

/// Pairs with at least `min_shared` commits, strongest first.
///
/// Equal counts are ordered by file names so output is reproducible.
fn retained_pairs(pairs: &HashMap<FilePair, u64>, min_shared: u64) -> Vec<(&FilePair, u64)> {
    let mut kept: Vec<(&FilePair, u64)> = pairs
        .iter()
        .filter(|&(_, &count)| count >= min_shared)
        .map(|(pair, &count)| (pair, count))
        .collect();
    kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    kept
}

/// `shared / total` as a percentage with one decimal, e.g. `"6.0%"`.
pub fn format_strength(shared_commits: u64, total_commits: usize) -> String {
    if total_commits == 0 {
        return "0.0%".to_string();
    }
    format!(
        "{:.1}%",
        shared_commits as f64 / total_commits as f64 * 100.0
    )
}

/// Flat ranked list of the strongest couplings.
pub fn rank_pairs(
    pairs: &HashMap<FilePair, u64>,
    total_commits: usize,
    min_shared: u64,
    limit: usize,
) -> Vec<CouplingEntry> {
    retained_pairs(pairs, min_shared)
        .into_iter()
        .take(limit)
        .map(|(pair, count)| CouplingEntry {
            file_a: pair.first().to_string(),
            file_b: pair.second().to_string(),
            shared_commits: count,
            strength: format_strength(count, total_commits),
        })
        .collect()
}

/// Node size interpolated linearly between the min and max visual size.
pub fn node_size(risk: Option<u64>, max_risk: u64) -> f64 {
    match risk {
        Some(r) if max_risk > 0 => {
            let ratio = (r as f64 / max_risk as f64).clamp(0.0, 1.0);
            NODE_SIZE_MIN + ratio * (NODE_SIZE_MAX - NODE_SIZE_MIN)
        }
        _ => NODE_SIZE_MIN,
    }
}

/// Category color by file extension.
pub fn node_color(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "py" | "pyi" => "#3776AB",
        "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => "#F1C40F",
        "rs" => "#DEA584",
        "go" => "#00ADD8",
        "java" | "kt" | "kts" | "scala" => "#B07219",
        "html" | "vue" | "svelte" | "scss" => "#E34C26",
        "md" | "rst" | "txt" => "#7F8C8D",
        "yml" | "yaml" | "toml" | "ini" | "cfg" | "env" => "#9B59B6",
        "sh" | "bash" | "zsh" => "#27AE60",
        _ => "#95A5A6",
    }
}

/// Graph of retained pairs with nodes sized by risk score.
///
/// `risk` holds every scored file of the run, not only ranked hotspots.
pub fn build_graph(
    pairs: &HashMap<FilePair, u64>,
    risk: &HashMap<String, u64>,
    min_shared: u64,
) -> CouplingGraph {
    let kept = retained_pairs(pairs, min_shared);
    let max_risk = risk.values().copied().max().unwrap_or(0);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::with_capacity(kept.len());

    for &(pair, count) in &kept {
        for file in [pair.first(), pair.second()] {
            if seen.insert(file) {
                let file_risk = risk.get(file).copied();
                let tooltip = match file_risk {
                    Some(r) => format!("{file}\nRisk score: {r}"),
                    None => format!("{file}\nno risk score"),
                };
                nodes.push(GraphNode {
                    id: file.to_string(),
                    label: file.to_string(),
                    size: node_size(file_risk, max_risk),
                    color: node_color(file).to_string(),
                    tooltip,
                });
            }
        }
        edges.push(GraphEdge {
            source: pair.first().to_string(),
            target: pair.second().to_string(),
            weight: count,
            tooltip: format!(
                "{} <-> {}: {count} shared commits",
                pair.first(),
                pair.second()
            ),
        });
    }

    let max_weight = edges.iter().map(|e| e.weight).max().unwrap_or(0);
    let avg_weight = if edges.is_empty() {
        0.0
    } else {
        let mean = edges.iter().map(|e| e.weight).sum::<u64>() as f64 / edges.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    CouplingGraph {
        stats: GraphStats {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            max_weight,
            avg_weight,
        },
        nodes,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str, u64)]) -> HashMap<FilePair, u64> {
        entries
            .iter()
            .map(|(a, b, n)| (FilePair::new(a, b), *n))
            .collect()
    }

    #[test]
    fn strength_has_one_decimal() {
        assert_eq!(format_strength(6, 100), "6.0%");
        assert_eq!(format_strength(1, 3), "33.3%");
        assert_eq!(format_strength(2, 3), "66.7%");
        assert_eq!(format_strength(0, 0), "0.0%");
    }

    #[test]
    fn rank_pairs_filters_sorts_and_truncates() {
        let mut entries = vec![("a.py", "b.py", 3), ("c.py", "d.py", 7), ("e.py", "f.py", 2)];
        let extra: Vec<(String, String)> = (0..15)
            .map(|i| (format!("x{i:02}.py"), format!("y{i:02}.py")))
            .collect();
        for (x, y) in &extra {
            entries.push((x.as_str(), y.as_str(), 4));
        }
        let ranked = rank_pairs(&pairs(&entries), 100, 3, COUPLING_LIMIT);

        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].file_a, "c.py");
        assert_eq!(ranked[0].strength, "7.0%");
        assert!(ranked.iter().all(|e| e.shared_commits >= 3));
        // equal counts fall back to name order
        assert_eq!(ranked[1].file_a, "x00.py");
        assert_eq!(ranked[9].file_a, "x08.py");
    }

    #[test]
    fn rank_pairs_threshold_is_inclusive() {
        let p = pairs(&[("a.py", "b.py", 3)]);
        assert_eq!(rank_pairs(&p, 5, 3, COUPLING_LIMIT).len(), 1);
        assert!(rank_pairs(&p, 5, 4, COUPLING_LIMIT).is_empty());
    }

    #[test]
    fn node_size_bounds() {
        assert_eq!(node_size(Some(200), 200), NODE_SIZE_MAX);
        assert_eq!(node_size(None, 200), NODE_SIZE_MIN);
        assert_eq!(node_size(Some(0), 200), NODE_SIZE_MIN);
        assert_eq!(node_size(Some(100), 200), 30.0);
        assert_eq!(node_size(Some(5), 0), NODE_SIZE_MIN);
    }

    #[test]
    fn node_color_by_category() {
        assert_eq!(node_color("a.py"), "#3776AB");
        assert_eq!(node_color("App.TSX"), "#F1C40F");
        assert_eq!(node_color("Makefile"), "#95A5A6");
    }

    #[test]
    fn graph_uses_looser_threshold_and_all_file_risks() {
        let p = pairs(&[("a.py", "b.py", 3), ("b.py", "c.py", 2), ("c.py", "d.py", 1)]);
        let risk: HashMap<String, u64> = [("a.py".to_string(), 40), ("z.py".to_string(), 80)]
            .into_iter()
            .collect();

        let graph = build_graph(&p, &risk, DEFAULT_GRAPH_MIN_SHARED_COMMITS);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a.py", "b.py", "c.py"]);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].weight, 3);
        assert_eq!(graph.nodes[0].size, 30.0);
        assert_eq!(graph.nodes[1].size, NODE_SIZE_MIN);
        assert!(graph.nodes[1].tooltip.contains("no risk score"));

        assert_eq!(graph.stats.total_nodes, 3);
        assert_eq!(graph.stats.total_edges, 2);
        assert_eq!(graph.stats.max_weight, 3);
        assert_eq!(graph.stats.avg_weight, 2.5);
    }

    #[test]
    fn max_risk_file_gets_max_size() {
        let p = pairs(&[("a.py", "b.py", 2)]);
        let risk: HashMap<String, u64> = [("a.py".to_string(), 90), ("b.py".to_string(), 30)]
            .into_iter()
            .collect();
        let graph = build_graph(&p, &risk, 2);
        assert_eq!(graph.nodes[0].size, NODE_SIZE_MAX);
    }

    #[test]
    fn empty_graph_has_zero_stats() {
        let graph = build_graph(&HashMap::new(), &HashMap::new(), 2);
        assert!(graph.nodes.is_empty());
        assert_eq!(graph.stats.max_weight, 0);
        assert_eq!(graph.stats.avg_weight, 0.0);
    }

    #[test]
    fn avg_weight_rounds_to_two_decimals() {
        let p = pairs(&[("a.py", "b.py", 2), ("a.py", "c.py", 2), ("a.py", "d.py", 3)]);
        let graph = build_graph(&p, &HashMap::new(), 2);
        assert_eq!(graph.stats.avg_weight, 2.33);
    }
}
