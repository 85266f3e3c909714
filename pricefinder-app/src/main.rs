use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pricefinder_app::server::{self, AppState, PriceFinderServer, SearchResponse};
use pricefinder_app::wiring::build_from_config;
use pricefinder_common::observability::{LogConfig, LogFormat, init_logging};
use pricefinder_config::{PriceFinderConfig, PriceFinderConfigLoader, default_config_path};
use pricefinder_search::SearchRequest;

/// Shopping price comparison over text queries and product photos.
#[derive(Parser)]
#[command(name = "pricefinder", version, about)]
struct Cli {
    /// Path to a YAML config file (default: the user config dir, if present).
    #[arg(short, long, env = "PRICEFINDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default).
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one search and print the JSON response.
    Search {
        #[arg(short, long)]
        query: Option<String>,
        /// Product photo to describe and search for.
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Print which collaborators are configured, probing vision.
    Health,
    /// Print the effective configuration with credentials redacted.
    Config,
}

fn load_config(explicit: Option<&PathBuf>) -> Result<PriceFinderConfig> {
    let loader = match (explicit, default_config_path()) {
        (Some(path), _) => PriceFinderConfigLoader::new().with_file(path),
        (None, Some(path)) => PriceFinderConfigLoader::new().with_optional_file(path),
        (None, None) => PriceFinderConfigLoader::new(),
    };
    loader.load().context("loading configuration")
}

fn log_config(cfg: &PriceFinderConfig) -> LogConfig {
    LogConfig {
        app_name: "pricefinder",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format.parse().unwrap_or(LogFormat::Text),
        default_filter: cfg.logging.level.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg = load_config(cli.config.as_ref())?;
    init_logging(log_config(&cfg))?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => serve(&cfg, host, port).await,
        Command::Search { query, image } => search_once(&cfg, query, image).await,
        Command::Health => health(&cfg).await,
        Command::Config => {
            print!("{}", cfg.to_redacted_yaml()?);
            Ok(())
        }
    }
}

async fn serve(cfg: &PriceFinderConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let orchestrator = build_from_config(cfg)?;
    let state = AppState {
        orchestrator,
        request_timeout: Duration::from_secs(cfg.server.request_timeout_secs),
        max_body_bytes: cfg.server.max_body_bytes,
    };
    let host = host.unwrap_or_else(|| cfg.server.host.clone());
    let port = port.unwrap_or_else(|| cfg.server.resolved_port());

    let server = PriceFinderServer::start(state, &host, port).await?;
    println!("pricefinder listening on http://{}", server.addr());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    tracing::info!("server.shutdown_requested");
    server.shutdown().await;
    Ok(())
}

async fn search_once(
    cfg: &PriceFinderConfig,
    query: Option<String>,
    image: Option<PathBuf>,
) -> Result<()> {
    let image = match image {
        Some(path) => Some(
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading image {}", path.display()))?,
        ),
        None => None,
    };
    let orchestrator = build_from_config(cfg)?;
    let request = orchestrator
        .validate_request(SearchRequest { text: query, image })
        .context("invalid search input")?;

    let budget = Duration::from_secs(cfg.server.request_timeout_secs);
    let outcome = match tokio::time::timeout(budget, orchestrator.search(request.clone())).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!("cli.search.timeout");
            orchestrator.fallback_outcome(&request)
        }
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&SearchResponse::from(outcome))?
    );
    Ok(())
}

async fn health(cfg: &PriceFinderConfig) -> Result<()> {
    let orchestrator = build_from_config(cfg)?;
    let mut body = server::health_body(&orchestrator);
    if let Some(reachable) = orchestrator.vision_healthy().await {
        body["vision_reachable"] = reachable.into();
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
