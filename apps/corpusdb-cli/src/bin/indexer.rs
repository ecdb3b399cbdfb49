use anyhow::Context;
use corpusdb_core::config::EngineConfig;
use corpusdb_core::traits::EmbeddingBackend;
use corpusdb_core::types::Document;
use corpusdb_core::usage::UsageTracker;
use corpusdb_embed::{HashingEmbedder, RemoteEmbedder};
use corpusdb_hybrid::HybridStore;
use corpusdb_pipeline::DocumentPipeline;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None;
    let mut snapshot_dir = PathBuf::from("corpusdb_snapshot");
    let mut limit = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--snapshot" => {
                if i + 1 < args.len() {
                    snapshot_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                } else {
                    eprintln!("Error: --snapshot requires a directory");
                    std::process::exit(1);
                }
            }
            "--limit" => {
                if let Some(n) = args.get(i + 1).and_then(|s| s.parse::<usize>().ok()) {
                    limit = Some(n);
                    i += 1;
                } else {
                    eprintln!("Error: --limit requires a number");
                    std::process::exit(1);
                }
            }
            _ if !args[i].starts_with('-') => data_dir = Some(PathBuf::from(&args[i])),
            _ => {}
        }
        i += 1;
    }
    let Some(data_dir) = data_dir else {
        eprintln!("Usage: corpusdb-indexer <data_dir> [--snapshot <dir>] [--limit <n>]");
        std::process::exit(1);
    };

    let config = Arc::new(EngineConfig::load().context("loading configuration")?);
    let embedder = backend_from_env(&config)?;

    println!("corpusdb indexer\n================");
    println!("Data directory: {}", data_dir.display());
    println!("Snapshot directory: {}", snapshot_dir.display());

    let mut files = list_text_files(&data_dir);
    if files.is_empty() {
        println!("No .txt or .md files found under {}.", data_dir.display());
        return Ok(());
    }
    if let Some(limit) = limit {
        if files.len() > limit {
            files.truncate(limit);
            println!("Limited to first {limit} files");
        }
    }

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .context("progress template")?,
    );
    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        bar.set_message(path.display().to_string());
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(
            Document::new(id, content)
                .with_metadata("path", serde_json_path(path)),
        );
        bar.inc(1);
    }
    bar.finish_with_message("read");

    let store = HybridStore::new(Arc::clone(&config), embedder)
        .context("constructing hybrid store")?;
    let store = Arc::new(Mutex::new(store));
    let result = DocumentPipeline::new(Arc::clone(&store))
        .execute(documents)
        .await;

    if !result.success {
        eprintln!("Indexing failed at {}: {:?}", result.stage, result.errors);
        std::process::exit(1);
    }
    store
        .lock()
        .await
        .save(&snapshot_dir)
        .context("saving snapshot")?;

    println!("\n✅ Indexed {} documents ({} failed)", result.processed_items, result.failed_items);
    println!("💡 Search with: cargo run --bin corpusdb-search '<query>' {}", snapshot_dir.display());
    Ok(())
}

fn backend_from_env(config: &Arc<EngineConfig>) -> anyhow::Result<Arc<dyn EmbeddingBackend>> {
    match (env::var("CORPUSDB_API_URL"), env::var("CORPUSDB_API_KEY")) {
        (Ok(url), Ok(key)) => {
            println!("Embedding backend: remote ({url})");
            let embedder = RemoteEmbedder::new(
                Arc::clone(config),
                &url,
                &key,
                Arc::new(UsageTracker::new()),
            )
            .context("constructing remote embedder")?;
            Ok(Arc::new(embedder))
        }
        _ => {
            println!("Embedding backend: local hashing (set CORPUSDB_API_URL and CORPUSDB_API_KEY for remote)");
            Ok(Arc::new(HashingEmbedder::new(config.embedding_dimension)))
        }
    }
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            matches!(
                p.extension().and_then(|s| s.to_str()),
                Some("txt" | "md")
            )
        })
        .collect();
    files.sort();
    files
}

fn serde_json_path(path: &Path) -> serde_json::Value {
    serde_json::Value::String(path.display().to_string())
}
