use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::schemars;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_router};

use schemars::JsonSchema;
use serde::Deserialize;

use crate::doctor;
use crate::service::{AnalysisOverrides, AppService};

// ---------------------------------------------------------------------------
// Tool parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalysisParams {
    /// Git repository directory (default: ".")
    #[serde(default = "default_dir")]
    pub dir: String,
    /// Number of recent commits to analyze (default: 100)
    #[serde(default)]
    pub commits: Option<usize>,
    /// Minimum shared commits for the ranked coupling list (default: 3)
    #[serde(default)]
    pub min_shared_commits: Option<u64>,
    /// Minimum shared commits for the coupling graph (default: 2)
    #[serde(default)]
    pub graph_min_shared_commits: Option<u64>,
    /// Commits touching more files than this are skipped for coupling (default: 50)
    #[serde(default)]
    pub mass_update_threshold: Option<usize>,
}

impl AnalysisParams {
    fn overrides(&self) -> AnalysisOverrides {
        AnalysisOverrides {
            commits: self.commits,
            min_shared_commits: self.min_shared_commits,
            graph_min_shared_commits: self.graph_min_shared_commits,
            mass_update_threshold: self.mass_update_threshold,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SummaryParams {
    #[serde(flatten)]
    pub analysis: AnalysisParams,
    /// Number of hotspots in the summary (default: 5)
    #[serde(default)]
    pub top: Option<usize>,
    /// Include the strongest coupling pairs (default: true)
    #[serde(default = "default_include_coupling")]
    pub include_coupling: bool,
}

fn default_dir() -> String {
    ".".to_string()
}

fn default_include_coupling() -> bool {
    true
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

#[derive(Clone)]
#[allow(dead_code)]
pub struct ChurnscopeServer {
    tool_router: ToolRouter<Self>,
    service: std::sync::Arc<AppService>,
}

impl Default for ChurnscopeServer {
    fn default() -> Self {
        Self::new(AppService::new())
    }
}

#[tool_router]
impl ChurnscopeServer {
    /// Serve with the defaults of `base`, sandboxed to the working directory.
    pub fn new(base: AppService) -> Self {
        let defaults = *base.defaults();
        let cwd = std::env::current_dir().unwrap_or_default();
        let service = AppService::sandboxed(cwd).unwrap_or(base);
        Self {
            tool_router: Self::tool_router(),
            service: std::sync::Arc::new(service.with_defaults(defaults)),
        }
    }

    #[tool(
        name = "repo_analyze",
        description = "Run a full churn analysis of a git repository: hotspots, logical coupling and coupling graph"
    )]
    async fn repo_analyze(
        &self,
        params: Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let options = self.service.options(&p.overrides());
        Self::to_tool_result(self.service.analyze(&p.dir, &options))
    }

    #[tool(
        name = "hotspots_analyze",
        description = "Rank the files with the highest churn x complexity risk, with their top authors"
    )]
    async fn hotspots_analyze(
        &self,
        params: Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let options = self.service.options(&p.overrides());
        Self::to_tool_result(self.service.hotspots(&p.dir, &options))
    }

    #[tool(
        name = "coupling_analyze",
        description = "List file pairs that are frequently committed together"
    )]
    async fn coupling_analyze(
        &self,
        params: Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let options = self.service.options(&p.overrides());
        Self::to_tool_result(self.service.coupling(&p.dir, &options))
    }

    #[tool(
        name = "coupling_graph",
        description = "Build a node/edge graph of logical coupling with nodes sized by risk score"
    )]
    async fn coupling_graph(
        &self,
        params: Parameters<AnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let options = self.service.options(&p.overrides());
        Self::to_tool_result(self.service.graph(&p.dir, &options))
    }

    #[tool(
        name = "health_summary",
        description = "Summarize repository health: top hotspots, bus factor and average risk"
    )]
    async fn health_summary(
        &self,
        params: Parameters<SummaryParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let options = self.service.options(&p.analysis.overrides());
        Self::to_tool_result(self.service.summary(
            &p.analysis.dir,
            &options,
            p.top,
            p.include_coupling,
        ))
    }

    #[tool(
        name = "doctor",
        description = "Check git availability and supported complexity languages"
    )]
    async fn doctor_tool(&self) -> Result<CallToolResult, McpError> {
        let report = doctor::run_doctor();
        let json = serde_json::to_string(&report)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

impl ChurnscopeServer {
    fn to_tool_result<T: serde::Serialize>(
        result: anyhow::Result<T>,
    ) -> Result<CallToolResult, McpError> {
        match result {
            Ok(value) => {
                let json = serde_json::to_string(&value)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(e) => match e.downcast_ref::<crate::error::ChurnError>() {
                Some(ce) if ce.code == crate::error::ErrorCode::InvalidRequest => {
                    Err(McpError::invalid_params(ce.to_string(), None))
                }
                _ => Err(McpError::internal_error(e.to_string(), None)),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ServerHandler implementation
// ---------------------------------------------------------------------------

impl ServerHandler for ChurnscopeServer {
    fn get_info(&self) -> ServerInfo {
        let mut capabilities = ServerCapabilities::default();
        capabilities.tools = Some(ToolsCapability::default());
        let mut server_info = Implementation::default();
        server_info.name = "churnscope".into();
        server_info.version = env!("CARGO_PKG_VERSION").into();
        let mut info = ServerInfo::default();
        info.protocol_version = ProtocolVersion::V_2024_11_05;
        info.capabilities = capabilities;
        info.server_info = server_info;
        info
    }
}
