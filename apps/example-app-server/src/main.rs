use anyhow::{Context, Result};
use appkit_bootstrap::{
    default_logging_config, init_logging, shutdown_signal, AppConfig, AppConfigProvider, CliArgs,
};
use axum::Router;
use clap::{Parser, Subcommand};
use example_app::ExampleAppModule;
use mimalloc::MiMalloc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use std::path::{Path, PathBuf};
use std::time::Duration;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// The Example App server - course and lesson pages from a headless CMS
#[derive(Parser)]
#[command(name = "example-app-server")]
#[command(about = "The Example App server - course and lesson pages from a headless CMS")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // defaults -> YAML (if provided) -> env (EXAMPLE_APP__*) -> CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(default_logging_config);
    init_logging(&logging_config, Path::new(&config.server.home_dir));

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("The Example App server starting");

    let module = ExampleAppModule::default();
    module.init(&AppConfigProvider::new(config.clone()))?;
    let router = with_http_layers(module.router()?, config.server.timeout_sec);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Request ids, request tracing and the optional request timeout.
fn with_http_layers(router: Router, timeout_sec: u64) -> Router {
    let router = if timeout_sec > 0 {
        router.layer(TimeoutLayer::new(Duration::from_secs(timeout_sec)))
    } else {
        router
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration…");

    // Module config must deserialize and pass startup checks.
    ExampleAppModule::default().init(&AppConfigProvider::new(config.clone()))?;

    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}
