use anyhow::Result;
use clap::{Parser, Subcommand};
use multibrain::{create_router, AnalysisService, ServiceConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "multibrain")]
#[command(about = "Multi-brain analysis coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Run {
        #[arg(short, long, default_value = "multibrain.toml")]
        config: PathBuf,
    },
    /// Write a default config file
    Init {
        #[arg(short, long, default_value = "multibrain.toml")]
        config: PathBuf,
    },
    /// Run one analysis and print it as JSON
    Analyze {
        #[arg(short, long, default_value = "multibrain.toml")]
        config: PathBuf,

        request: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multibrain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => serve(&config).await?,
        Commands::Init { config } => init_config(&config)?,
        Commands::Analyze { config, request } => analyze_once(&config, request).await?,
    }

    Ok(())
}

fn load_config(config_path: &Path) -> Result<ServiceConfig> {
    if config_path.exists() {
        info!("Loading config from {:?}", config_path);
        ServiceConfig::load(config_path)
    } else {
        info!("Config file not found, using defaults");
        Ok(ServiceConfig::default())
    }
}

async fn serve(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let listen_addr = config.listen_addr();
    let service = Arc::new(AnalysisService::new(config)?);

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("API server listening on {}", listen_addr);

    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}

async fn analyze_once(config_path: &Path, request: String) -> Result<()> {
    let service = AnalysisService::new(load_config(config_path)?)?;

    match service.coordinator().analyze(request).await {
        Ok(analysis) => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
        Err(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure.partial)?);
            Err(failure.into())
        }
    }
}

fn init_config(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        anyhow::bail!("Config file already exists: {:?}", config_path);
    }

    let config = ServiceConfig::default();
    config.save(config_path)?;
    println!("Created config file: {:?}", config_path);
    println!("\nEdit the config file to:");
    println!("  - Enable the LLM backend and point api_key_env at your key");
    println!("  - List the expert domains to register");
    println!("  - Adjust run and stage timeouts");

    Ok(())
}
