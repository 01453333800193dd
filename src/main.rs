use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edu_pdf_store::api::{build_router, state::AppState};
use edu_pdf_store::config::AppConfig;
use edu_pdf_store::library::Library;

#[derive(Parser)]
#[command(name = "edu-pdf-store")]
#[command(about = "Catalog and file storage backend for educational PDFs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,

        /// Log all HTTP requests
        #[arg(long)]
        access_log: bool,
    },

    /// Insert the configured default mediums if missing
    SeedMediums,

    /// Report catalog rows without files and files without rows
    Doctor,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_tracing(&level, cli.json_logs);

    tracing::info!("Starting edu-pdf-store v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Configuration: {:?}", config);

    let library = Library::open(&config.storage(), config.normalizer())
        .context("opening the catalog")?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            access_log,
        } => {
            let seeded = library.seed_mediums(&config.mediums.defaults).await?;
            tracing::info!("{} default mediums present", seeded.len());

            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = format!("{}:{}", config.server.host, config.server.port);

            let state = AppState::new(library, config);
            let mut app = build_router(state);
            if access_log {
                app = app.layer(TraceLayer::new_for_http());
            }

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::SeedMediums => {
            let mediums = library.seed_mediums(&config.mediums.defaults).await?;
            for medium in &mediums {
                println!("{}\t{}\t{}", medium.id, medium.slug, medium.name);
            }
            tracing::info!("Seeded {} mediums", mediums.len());
        }
        Commands::Doctor => {
            let report = library.check_drift().await?;
            if report.is_clean() {
                println!("Catalog and storage agree.");
                return Ok(());
            }
            println!("Orphaned rows ({}):", report.orphaned_rows.len());
            for pdf in &report.orphaned_rows {
                println!("  {}\t{}\t{}", pdf.id, pdf.name, pdf.file_path.display());
            }
            println!("Untracked files ({}):", report.untracked_files.len());
            for path in &report.untracked_files {
                println!("  {}", path);
            }
            anyhow::bail!(
                "found {} orphaned rows and {} untracked files",
                report.orphaned_rows.len(),
                report.untracked_files.len()
            );
        }
    }

    Ok(())
}
