//! Structural complexity of a file's current content.
//!
//! Complexity never fails a run: unsupported languages score 1, and read or
//! parse failures are logged and also score 1. Only a file that cannot be
//! found on disk at all is reported as missing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Result, bail};
use camino::Utf8Path;
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::engine::parser;
use crate::error::ChurnError;
use crate::language::LangId;

/// Score given to files without a usable measurement.
pub const DEFAULT_COMPLEXITY: u32 = 1;

/// A per-language complexity metric.
pub trait ComplexityStrategy: Send + Sync {
    fn language(&self) -> LangId;

    /// Score `source`; errors are complexity-computation failures.
    fn measure(&self, source: &[u8]) -> Result<u32>;
}

/// Cyclomatic complexity summed over every Python function and method.
///
/// Each `def` is a block worth 1 plus its decision points. Decision points
/// belong to the nearest enclosing `def`; module-level code forms no block.
pub struct PythonCyclomatic;

impl ComplexityStrategy for PythonCyclomatic {
    fn language(&self) -> LangId {
        LangId::Python
    }

    fn measure(&self, source: &[u8]) -> Result<u32> {
        if let Err(e) = std::str::from_utf8(source) {
            bail!(ChurnError::complexity("<source>", format!("not valid UTF-8: {e}")));
        }
        let tree = parser::parse_source(source, LangId::Python)?;
        let root = tree.root_node();
        if root.has_error() {
            bail!(ChurnError::complexity("<source>", "syntax error"));
        }

        Ok(sum_blocks(root).max(DEFAULT_COMPLEXITY))
    }
}

/// Sum of every `def` block's score, walking the tree without recursion.
///
/// Decision points belong to the nearest enclosing `def`. `enclosing` holds,
/// per open ancestor level, the block its children report to.
fn sum_blocks(root: Node<'_>) -> u32 {
    let mut blocks: Vec<u32> = Vec::new();
    let mut enclosing: Vec<Option<usize>> = Vec::new();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        let parent = enclosing.last().copied().flatten();
        let current = if node.kind() == "function_definition" {
            blocks.push(1);
            Some(blocks.len() - 1)
        } else {
            if let Some(idx) = parent {
                blocks[idx] += decision_points(node);
            }
            parent
        };

        if cursor.goto_first_child() {
            enclosing.push(current);
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return blocks.iter().sum();
            }
            enclosing.pop();
        }
    }
}

fn decision_points(node: Node<'_>) -> u32 {
    match node.kind() {
        "if_statement" | "elif_clause" | "conditional_expression" | "with_statement"
        | "boolean_operator" | "for_in_clause" | "if_clause" | "case_clause"
        | "except_clause" | "except_group_clause" | "assert_statement" => 1,
        "for_statement" | "while_statement" => 1 + u32::from(has_else(node)),
        "try_statement" => u32::from(has_else(node)),
        _ => 0,
    }
}

fn has_else(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| child.kind() == "else_clause")
}

/// Locates files under a repository root and scores them.
pub struct ComplexityEvaluator {
    root: PathBuf,
    strategies: Vec<Box<dyn ComplexityStrategy>>,
    name_index: OnceLock<HashMap<String, PathBuf>>,
}

impl ComplexityEvaluator {
    /// An evaluator with no strategies: every existing file scores 1.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strategies: Vec::new(),
            name_index: OnceLock::new(),
        }
    }

    /// An evaluator with the built-in Python strategy.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        Self::new(root).with_strategy(Box::new(PythonCyclomatic))
    }

    /// Register a strategy; a later registration for the same language wins.
    pub fn with_strategy(mut self, strategy: Box<dyn ComplexityStrategy>) -> Self {
        self.strategies
            .retain(|s| s.language() != strategy.language());
        self.strategies.push(strategy);
        self
    }

    pub fn languages(&self) -> Vec<LangId> {
        self.strategies.iter().map(|s| s.language()).collect()
    }

    /// Find the current content of `filename`.
    ///
    /// Tries `<root>/<relative_path>` first, then the first file with the same
    /// base name anywhere under the root. Same-named files in different
    /// directories are not disambiguated.
    pub fn locate(&self, filename: &str, relative_path: Option<&str>) -> Option<PathBuf> {
        if let Some(rel) = relative_path {
            let candidate = self.root.join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        self.name_index().get(filename).cloned()
    }

    /// Score a file, or `None` when it no longer exists on disk.
    pub fn evaluate(&self, filename: &str, relative_path: Option<&str>) -> Option<u32> {
        match self.locate(filename, relative_path) {
            Some(path) => Some(self.complexity_of(&path)),
            None => {
                let err = ChurnError::content_lookup(filename);
                debug!(file = filename, error = %err, "excluding file without current content");
                None
            }
        }
    }

    /// Score an existing file, degrading to 1 on any failure.
    pub fn complexity_of(&self, path: &Path) -> u32 {
        match self.measure_file(path) {
            Ok(Some(score)) => score,
            Ok(None) => DEFAULT_COMPLEXITY,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "complexity computation failed, using default"
                );
                DEFAULT_COMPLEXITY
            }
        }
    }

    /// `Ok(None)` when no strategy covers the file's language.
    pub fn measure_file(&self, path: &Path) -> Result<Option<u32>> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let Ok(lang) = LangId::from_path(Utf8Path::new(name)) else {
            return Ok(None);
        };
        let Some(strategy) = self.strategies.iter().find(|s| s.language() == lang) else {
            return Ok(None);
        };

        let display = path.display().to_string();
        let source = parser::load_source(path)
            .map_err(|e| ChurnError::complexity(&display, e))?;
        strategy
            .measure(&source)
            .map(Some)
            .map_err(|e| ChurnError::complexity(&display, e).into())
    }

    fn name_index(&self) -> &HashMap<String, PathBuf> {
        self.name_index
            .get_or_init(|| build_name_index(&self.root))
    }
}

/// Base name -> first path in a sorted, .gitignore-aware walk of `root`.
fn build_name_index(root: &Path) -> HashMap<String, PathBuf> {
    use ignore::WalkBuilder;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut index = HashMap::new();
    for entry in builder.build().flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            index
                .entry(name.to_string())
                .or_insert_with(|| entry.path().to_path_buf());
        }
    }
    debug!(root = %root.display(), files = index.len(), "built file-name index");
    index
}
