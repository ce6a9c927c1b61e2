use nasdb_core::config::Config;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = nasdb_embed::load_embedder(&settings.embedding)?;
    let texts = vec!["안녕하세요 세계".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("model={} B={} dim={}", embedder.model_id(), embs.len(), embedder.dim());
    Ok(())
}
