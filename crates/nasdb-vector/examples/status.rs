use nasdb_core::config::Config;
use nasdb_core::traits::VectorStore;
use nasdb_vector::table::{open_db, stored_dim};
use nasdb_vector::LanceStore;

/// Prints row and file counts of the configured chunk table.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let conn = open_db(&settings.store.path).await?;
    let Some(dim) = stored_dim(&conn, &settings.store.table).await? else {
        println!("table '{}' does not exist yet", settings.store.table);
        return Ok(());
    };
    let store = LanceStore::open(&settings.store.path, &settings.store.table, dim).await?;
    let files = store.file_paths().await?;
    println!("table={} dim={dim} chunks={} files={}", settings.store.table, store.count().await?, files.len());
    for path in files.iter().take(20) { println!("  {path}"); }
    Ok(())
}
