//! ML service binary
//!
//! Run with: cargo run -p hqbms-ml --bin hqbms-ml-server -- --config hqbms-ml.toml

use clap::Parser;
use hqbms_ml::{
    config::{ServiceConfig, CONFIG_PATH_ENV},
    server::MlServer,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "hqbms-ml-server", version, about = "HQBMS ML service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: PathBuf,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hqbms_ml=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ServiceConfig::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded from {}", cli.config.display());
    tracing::info!("  - Ollama: {}", config.llm.base_url);
    tracing::info!("  - Embeddings: {:?} ({} dims)", config.embeddings.backend, config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunking: {} graphemes, {} overlap",
        config.chunking.chunk_size,
        config.chunking.overlap()
    );
    tracing::info!(
        "  - Wait time: blend weight {}, window {}",
        config.wait_time.blend_weight,
        config.wait_time.window
    );

    let server = MlServer::new(config).await?;

    let health = server.state().health().await;
    if health.ollama_status != "ok" {
        tracing::warn!(
            "Ollama is {} at {}; RAG queries will fail until it is available",
            health.ollama_status,
            server.state().config().llm.base_url
        );
    }
    if !health.models_loaded {
        tracing::warn!("No wait-time model loaded; /predict/waittime returns 503 until one is");
    }

    tracing::info!("Listening on http://{}", server.address());
    server.start().await?;

    Ok(())
}
