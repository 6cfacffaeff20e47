//! docq server entry point

use std::path::PathBuf;

use docq_rag::config::RagConfig;
use docq_rag::server::RagServer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docq_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("╔══════════════════════════════════════╗");
    println!("║      docq - document Q&A server      ║");
    println!("╚══════════════════════════════════════╝");
    println!();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        tracing::info!("Loading configuration from {}", path.display());
    }
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration:");
    tracing::info!(
        "  - Embedding model: {} ({} dims, batches of {})",
        config.embedding.model,
        config.embedding.dimensions,
        config.embedding.batch_size
    );
    tracing::info!("  - Chat model: {}", config.generation.model);
    tracing::info!(
        "  - Chunking: {} chars with {} overlap",
        config.chunking.chunk_size,
        config.chunking.overlap
    );
    tracing::info!(
        "  - Retrieval: top {} above threshold {:.2}",
        config.retrieval.top_k,
        config.retrieval.similarity_threshold
    );
    tracing::info!("  - Data dir: {}", config.storage.data_dir.display());

    if config.embedding.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set");
        tracing::warn!("Uploads and questions will fail until it is exported:");
        tracing::warn!("  export OPENAI_API_KEY=sk-...");
    }

    let server = RagServer::new(config.clone()).await?;

    println!("Endpoints:");
    println!("  GET  /         - chat page");
    println!("  POST /upload   - multipart document upload");
    println!("  POST /chat     - ask a question");
    println!("  GET  /health   - service health");
    println!();
    println!("Open http://{} in a browser", config.server.bind_address());
    println!();

    server.start().await?;
    Ok(())
}
