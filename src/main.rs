use anyhow::Result;
use clap::Parser;

use churnscope::cli::{Cli, Commands, ScanArgs};
use churnscope::config::ConfigService;
use churnscope::doctor;
use churnscope::engine::analysis::AnalysisOptions;
use churnscope::error::ChurnError;
use churnscope::models::request::{AnalysisRequest, Command};
use churnscope::service::{AnalysisOverrides, AppService};
use churnscope::session;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let (code, message) = classify_error(&e);
        let error = serde_json::json!({
            "error": { "code": code, "message": message }
        });
        println!("{error}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn classify_error(e: &anyhow::Error) -> (String, String) {
    if let Some(ce) = e.downcast_ref::<ChurnError>() {
        (ce.code.to_string(), ce.message.clone())
    } else {
        ("IO_ERROR".to_string(), e.to_string())
    }
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

fn run(cli: Cli) -> Result<()> {
    let pretty = cli.pretty;

    // Handle early-exit commands before loading configuration
    if let Commands::Init { path } = &cli.command {
        let config_path = if let Some(p) = path {
            ConfigService::generate_at(p)?;
            p.clone()
        } else {
            ConfigService::generate_default()?;
            ConfigService::default_path()
        };
        eprintln!("Configuration file created at: {}", config_path.display());
        return Ok(());
    }

    let config = ConfigService::load(cli.config.as_deref())?;

    // Initialize logging if debug mode (CLI flag or config)
    if cli.debug || config.debug {
        churnscope::logger::init(&config)?;
    }

    let defaults = config.analysis.to_options();
    let service = AppService::new().with_defaults(defaults);

    match cli.command {
        Commands::Analyze { scan } => {
            let (dir, options) = resolve(&service, &scan);
            print_json(&service.analyze(dir, &options)?, pretty)
        }
        Commands::Hotspots { scan } => {
            let (dir, options) = resolve(&service, &scan);
            print_json(&service.hotspots(dir, &options)?, pretty)
        }
        Commands::Coupling { scan } => {
            let (dir, options) = resolve(&service, &scan);
            print_json(&service.coupling(dir, &options)?, pretty)
        }
        Commands::Graph { scan } => {
            let (dir, options) = resolve(&service, &scan);
            print_json(&service.graph(dir, &options)?, pretty)
        }
        Commands::Summary {
            scan,
            top,
            no_coupling,
        } => {
            let (dir, options) = resolve(&service, &scan);
            print_json(&service.summary(dir, &options, top, !no_coupling)?, pretty)
        }
        Commands::Doctor => print_json(&doctor::run_doctor(), pretty),
        Commands::Session => cmd_session(defaults),
        Commands::Mcp => cmd_mcp(service),
        Commands::Init { .. } => unreachable!("handled above"),
    }
}

fn resolve<'a>(
    service: &AppService,
    scan: &'a ScanArgs,
) -> (&'a str, AnalysisOptions) {
    (scan.dir.as_str(), service.options(&scan.overrides()))
}

fn cmd_session(defaults: AnalysisOptions) -> Result<()> {
    let service = AppService::from_env().with_defaults(defaults);
    session::run_session(|req| handle_request(&service, req))
}

fn cmd_mcp(service: AppService) -> Result<()> {
    use rmcp::ServiceExt;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server = churnscope::mcp::ChurnscopeServer::new(service);
        let transport = rmcp::transport::io::stdio();
        let running = server
            .serve(transport)
            .await
            .map_err(|e| anyhow::anyhow!("MCP server initialization failed: {e}"))?;
        running
            .waiting()
            .await
            .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))?;
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Session handler
// ---------------------------------------------------------------------------

fn handle_request(service: &AppService, req: AnalysisRequest) -> Result<serde_json::Value> {
    let options = service.options(&AnalysisOverrides {
        commits: req.commits,
        min_shared_commits: req.min_shared_commits,
        graph_min_shared_commits: req.graph_min_shared_commits,
        mass_update_threshold: req.mass_update_threshold,
    });
    let dir = req.dir.as_str();

    match req.command {
        Command::Analyze => Ok(serde_json::to_value(service.analyze(dir, &options)?)?),
        Command::Hotspots => Ok(serde_json::to_value(service.hotspots(dir, &options)?)?),
        Command::Coupling => Ok(serde_json::to_value(service.coupling(dir, &options)?)?),
        Command::Graph => Ok(serde_json::to_value(service.graph(dir, &options)?)?),
        Command::Summary => {
            let include_coupling = req.include_coupling.unwrap_or(true);
            let summary = service.summary(dir, &options, req.top, include_coupling)?;
            Ok(serde_json::to_value(summary)?)
        }
        Command::Doctor => Ok(serde_json::to_value(doctor::run_doctor())?),
    }
}
