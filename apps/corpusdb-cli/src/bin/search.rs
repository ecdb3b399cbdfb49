use anyhow::Context;
use corpusdb_core::config::EngineConfig;
use corpusdb_core::traits::EmbeddingBackend;
use corpusdb_core::usage::UsageTracker;
use corpusdb_embed::{HashingEmbedder, RemoteEmbedder};
use corpusdb_hybrid::HybridStore;
use corpusdb_pipeline::SearchPipeline;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [snapshot_dir] [k]", args[0]);
        eprintln!("Example: {} 'machine learning' corpusdb_snapshot 10", args[0]);
        std::process::exit(1);
    }
    let query = &args[1];
    let snapshot_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("corpusdb_snapshot"));
    let k = args
        .get(3)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10);

    let config = Arc::new(EngineConfig::load().context("loading configuration")?);
    let embedder = backend_from_env(&config)?;

    println!("corpusdb search\n===============");
    println!("Query: {query}");
    println!("Snapshot: {}", snapshot_dir.display());

    let store = HybridStore::load(&snapshot_dir, Arc::clone(&config), embedder)
        .context("loading snapshot")?;
    let rerank = env::var("CORPUSDB_API_KEY").is_ok();
    let outcome = SearchPipeline::new(Arc::new(Mutex::new(store)))
        .execute(query, k, None, rerank)
        .await;

    if !outcome.summary.success {
        eprintln!(
            "Search failed at {}: {:?}",
            outcome.summary.stage, outcome.summary.errors
        );
        std::process::exit(1);
    }

    println!(
        "\n🔍 Found {} results in {:.3}s",
        outcome.results.len(),
        outcome.summary.duration_seconds
    );
    for (i, result) in outcome.results.iter().enumerate() {
        let preview: String = result.content.chars().take(120).collect();
        println!("\n  {}. score={:.4}  id={}", i + 1, result.score, result.doc_id);
        println!("     {preview}");
    }
    Ok(())
}

fn backend_from_env(config: &Arc<EngineConfig>) -> anyhow::Result<Arc<dyn EmbeddingBackend>> {
    match (env::var("CORPUSDB_API_URL"), env::var("CORPUSDB_API_KEY")) {
        (Ok(url), Ok(key)) => {
            let embedder = RemoteEmbedder::new(
                Arc::clone(config),
                &url,
                &key,
                Arc::new(UsageTracker::new()),
            )
            .context("constructing remote embedder")?;
            Ok(Arc::new(embedder))
        }
        _ => Ok(Arc::new(HashingEmbedder::new(config.embedding_dimension))),
    }
}
