use clap::{Args, Parser, Subcommand};

use crate::service::AnalysisOverrides;

#[derive(Parser)]
#[command(
    name = "churnscope",
    version,
    about = "Git history mining: churn, complexity hotspots, bus factor and logical coupling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pretty-print JSON output (default: compact)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

/// Repository and analysis parameters shared by every analysis command.
///
/// Unset values fall back to the `[analysis]` table of the config file.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Repository directory (any path inside the working tree)
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Number of recent commits to analyze (default: 100)
    #[arg(short = 'n', long)]
    pub commits: Option<usize>,

    /// Minimum shared commits for a pair in the coupling list (default: 3)
    #[arg(long)]
    pub min_shared_commits: Option<u64>,

    /// Minimum shared commits for a pair in the coupling graph (default: 2)
    #[arg(long)]
    pub graph_min_shared_commits: Option<u64>,

    /// Skip commits touching more files than this for coupling (default: 50)
    #[arg(long)]
    pub mass_update_threshold: Option<usize>,
}

impl ScanArgs {
    pub fn overrides(&self) -> AnalysisOverrides {
        AnalysisOverrides {
            commits: self.commits,
            min_shared_commits: self.min_shared_commits,
            graph_min_shared_commits: self.graph_min_shared_commits,
            mass_update_threshold: self.mass_update_threshold,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full report: hotspots, coupling list and coupling graph
    Analyze {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Files with the highest churn x complexity risk
    Hotspots {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// File pairs most often committed together
    Coupling {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Logical coupling as a node/edge graph
    Graph {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Repository health summary (top hotspots, bus factor, average risk)
    Summary {
        #[command(flatten)]
        scan: ScanArgs,

        /// Number of hotspots in the summary (default: 5)
        #[arg(long)]
        top: Option<usize>,

        /// Leave the coupling pairs out of the summary
        #[arg(long)]
        no_coupling: bool,
    },

    /// Check git availability and supported complexity languages
    Doctor,

    /// Start NDJSON streaming session (stdin -> stdout)
    Session,

    /// Start MCP server (stdio transport)
    Mcp,

    /// Generate default configuration file
    Init {
        /// Custom path for configuration file (default: ~/.config/churnscope/config.toml)
        #[arg(long)]
        path: Option<std::path::PathBuf>,
    },
}
