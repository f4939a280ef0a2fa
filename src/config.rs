//! Configuration loading and generation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::analysis::AnalysisOptions;

/// Contents of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enable debug logging to file
    pub debug: bool,

    /// Path to log directory
    pub log_path: PathBuf,

    /// Default analysis parameters
    pub analysis: AnalysisConfig,
}

/// `[analysis]` table; every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of recent commits to analyze
    pub commits: usize,
    /// Minimum shared commits for the ranked coupling list
    pub min_shared_commits: u64,
    /// Minimum shared commits for the coupling graph
    pub graph_min_shared_commits: u64,
    /// Commits touching more files than this are ignored for coupling
    pub mass_update_threshold: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let defaults = AnalysisOptions::default();
        Self {
            commits: defaults.commit_limit,
            min_shared_commits: defaults.min_shared_commits,
            graph_min_shared_commits: defaults.graph_min_shared_commits,
            mass_update_threshold: defaults.mass_update_threshold,
        }
    }
}

impl AnalysisConfig {
    pub fn to_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            commit_limit: self.commits,
            min_shared_commits: self.min_shared_commits,
            graph_min_shared_commits: self.graph_min_shared_commits,
            mass_update_threshold: self.mass_update_threshold,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            log_path: config_dir().join("logs"),
            analysis: AnalysisConfig::default(),
        }
    }
}

/// ~/.config/churnscope
fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("churnscope")
}

/// Reads and writes the TOML configuration file.
pub struct ConfigService;

impl ConfigService {
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load `path` (or the default path).
    ///
    /// A missing file yields defaults. Unless `log_path` is set explicitly,
    /// logs go to a `logs` directory next to the file. An `[analysis]` table
    /// with out-of-range values is rejected.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        if config.log_path == Config::default().log_path
            && let Some(dir) = path.parent()
        {
            config.log_path = dir.join("logs");
        }
        config
            .analysis
            .to_options()
            .validate()
            .with_context(|| format!("Invalid [analysis] table in {}", path.display()))?;

        Ok(config)
    }

    pub fn generate_default() -> Result<()> {
        Self::generate_at(&Self::default_path())
    }

    /// Write the commented default file, creating parent directories.
    pub fn generate_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    fn default_config_content() -> &'static str {
        r#"# churnscope configuration file

# Enable debug logging to file (default: false)
debug = false

# Path to log directory (default: ~/.config/churnscope/logs)
# log_path = "~/.config/churnscope/logs"

[analysis]
# Number of recent commits to analyze (default: 100)
commits = 100

# Minimum shared commits for a pair to enter the ranked coupling list (default: 3)
min_shared_commits = 3

# Minimum shared commits for a pair to enter the coupling graph (default: 2)
graph_min_shared_commits = 2

# Commits touching more files than this are skipped for coupling (default: 50)
mass_update_threshold = 50
"#
    }
}
