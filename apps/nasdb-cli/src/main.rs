mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use nasdb_core::chunker::Chunker;
use nasdb_core::config::{resolve_with_base, Config, Settings};
use nasdb_core::source::LocalFolderSource;
use nasdb_core::traits::{FileSource, VectorStore};
use nasdb_core::types::SearchResult;
use nasdb_index::{IndexManager, IndexWorker, JobHandle, JobOutcome, Retriever};
use nasdb_vector::table::{open_db, stored_dim};
use nasdb_vector::LanceStore;

use cli::{Cli, Commands};

/// Long-lived handles shared by the index and search commands.
struct Services {
    manager: Arc<IndexManager>,
    retriever: Retriever,
}

impl Services {
    async fn open(settings: &Settings, store_path: &str) -> Result<Self> {
        let embedder = nasdb_embed::load_embedder(&settings.embedding)?;
        let store: Arc<dyn VectorStore> = Arc::new(LanceStore::open(store_path, &settings.store.table, embedder.dim()).await?);
        let chunker = Chunker::new(settings.chunking)?;
        let manager = Arc::new(IndexManager::new(chunker, Arc::clone(&embedder), Arc::clone(&store)));
        let retriever = Retriever::new(embedder, store, settings.search);
        Ok(Self { manager, retriever })
    }
}

/// The configured table at whatever width it was created with, if it exists.
async fn open_existing(store_path: &str, table: &str) -> Result<Option<LanceStore>> {
    let conn = open_db(store_path).await?;
    let Some(dim) = stored_dim(&conn, table).await? else { return Ok(None) };
    Ok(Some(LanceStore::open(store_path, table, dim).await?))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn normalize_folder(folder: &str) -> String {
    let trimmed = folder.trim_end_matches('/');
    if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") }
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

fn print_results(query: &str, results: &[SearchResult]) {
    if results.is_empty() {
        println!("No matches for \"{query}\"");
        return;
    }
    println!("Top {} files for \"{query}\":", results.len());
    for (rank, r) in results.iter().enumerate() {
        println!("{:>2}. {}  {:.1}% (distance {:.4}, chunk {})", rank + 1, r.file_path, r.similarity_percent(), r.distance, r.chunk_number);
        println!("    {}", snippet(&r.content_snippet, 160));
    }
}

async fn wait_with_spinner(handle: JobHandle, message: String) -> Result<JobOutcome> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    let outcome = handle.wait().await;
    pb.finish_and_clear();
    Ok(outcome?)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;
    let base = std::env::current_dir().context("resolving working directory")?;
    let store_path = resolve_with_base(&base, &settings.store.path);
    let store_path = store_path.to_string_lossy().to_string();
    let root: PathBuf = resolve_with_base(&base, &settings.source.root_dir);
    tracing::debug!(store = %store_path, root = %root.display(), "configuration loaded");

    match cli.command {
        Commands::Ls { path } => {
            let source = LocalFolderSource::new(&root)?;
            for item in source.list(&path)? {
                let size = item.size.map_or_else(|| "-".to_string(), |s| s.to_string());
                let marker = if item.is_directory { "/" } else { "" };
                println!("{size:>12}  {}{marker}", item.path);
            }
        }
        Commands::Index { folder } => {
            let folder = normalize_folder(&folder);
            let source = LocalFolderSource::new(&root)?;
            let files = source.read_folder(&folder)?;
            if files.is_empty() {
                println!("No text files under {folder}");
                return Ok(());
            }
            let services = Services::open(&settings, &store_path).await?;
            let worker = IndexWorker::spawn(Arc::clone(&services.manager));
            let count = files.len();
            let handle = worker.submit_index(&folder, files).await?;
            let outcome = wait_with_spinner(handle, format!("Indexing {count} files under {folder}")).await;
            worker.shutdown().await?;
            let JobOutcome::Indexed(report) = outcome? else { bail!("unexpected job outcome") };
            println!("Indexed {} files ({} chunks) under {folder}", report.indexed_files, report.indexed_chunks);
            for (path, reason) in &report.failed_files {
                println!("  skipped {path}: {reason}");
            }
        }
        Commands::Delete { folder } => {
            let folder = normalize_folder(&folder);
            let services = Services::open(&settings, &store_path).await?;
            let worker = IndexWorker::spawn(Arc::clone(&services.manager));
            let outcome = worker.submit_delete(&folder).await?.wait().await;
            worker.shutdown().await?;
            let JobOutcome::Deleted(report) = outcome? else { bail!("unexpected job outcome") };
            if report.deleted {
                println!("Removed {} chunks under {folder}", report.removed_chunks);
            } else {
                println!("Nothing indexed under {folder}");
            }
        }
        Commands::Search { query, n_results, candidates } => {
            let services = Services::open(&settings, &store_path).await?;
            let n = n_results.unwrap_or(settings.search.n_results);
            let m = candidates.unwrap_or(settings.search.candidate_n_results);
            let results = services.retriever.search(&query, n, m).await?;
            print_results(&query, &results);
        }
        Commands::Files => {
            let Some(store) = open_existing(&store_path, &settings.store.table).await? else {
                println!("Index is empty");
                return Ok(());
            };
            let files = store.file_paths().await?;
            for path in &files {
                println!("{path}");
            }
            println!("{} files, {} chunks", files.len(), store.count().await?);
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("reset deletes every indexed chunk; pass --yes to confirm");
            }
            // Opened at the stored width; no model load needed.
            let Some(store) = open_existing(&store_path, &settings.store.table).await? else {
                println!("Index is empty");
                return Ok(());
            };
            store.reset().await?;
            println!("Index reset");
        }
    }
    Ok(())
}
