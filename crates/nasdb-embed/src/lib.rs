//! Sentence embeddings for chunks and queries.
//!
//! `XlmRobertaEmbedder` runs a RoBERTa-family encoder (KoSimCSE by default)
//! through candle with masked mean pooling. `FakeEmbedder` is a hashing
//! stand-in selected by `embedding.use_fake` or `APP_USE_FAKE_EMBEDDINGS=1`.

mod device;
mod fake;
mod pool;
mod tokenize;

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XlmRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use nasdb_core::config::{expand_path, EmbeddingSettings};
use nasdb_core::error::Error;
use nasdb_core::traits::Embedder;

pub use device::select_device;
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

const BATCH_SIZE: usize = 16;

pub struct XlmRobertaEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl XlmRobertaEmbedder {
    /// Loads tokenizer, config and weights from the resolved model directory.
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let started = Instant::now();
        let model_dir = resolve_model_dir(settings)?;
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: XlmRobertaConfig = serde_json::from_str(&raw_config).context("parsing model config")?;
        let raw: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = raw["hidden_size"].as_u64().and_then(|d| usize::try_from(d).ok()).ok_or_else(|| anyhow!("config.json has no hidden_size"))?;
        let pad_id = raw["pad_token_id"].as_u64().and_then(|p| u32::try_from(p).ok()).unwrap_or(1);
        let positions = raw["max_position_embeddings"].as_u64().and_then(|p| usize::try_from(p).ok()).unwrap_or(514);
        // RoBERTa offsets positions by pad_id + 1.
        let max_len = settings.max_len.min(positions.saturating_sub(2));

        let weights = load_weights(&model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).context("building encoder")?;

        tracing::info!(model = %settings.model_id, dir = %model_dir.display(), dim, max_len, elapsed_ms = started.elapsed().as_millis(), "embedding model loaded");
        Ok(Self { model, tokenizer, device, model_id: settings.model_id.clone(), dim, max_len, pad_id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?)
    }
}

impl Embedder for XlmRobertaEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let started = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_chunk(batch)?);
        }
        tracing::debug!(texts = texts.len(), elapsed_ms = started.elapsed().as_millis(), "embedded batch");
        Ok(out)
    }
}

/// Safetensors when present, otherwise a PyTorch pickle. A leading
/// `roberta.` prefix (checkpoints exported with a task head) is stripped.
fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    let weights: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let pickle = model_dir.join("pytorch_model.bin");
        candle_core::pickle::read_all(&pickle).with_context(|| format!("reading {}", pickle.display()))?.into_iter().collect()
    };
    Ok(weights
        .into_iter()
        .map(|(name, t)| match name.strip_prefix("roberta.") {
            Some(stripped) => (stripped.to_string(), t),
            None => (name, t),
        })
        .collect())
}

/// Model directory lookup order: `embedding.model_dir`, `APP_MODEL_DIR`,
/// `MODEL_DIR`, then `models/<model name>` relative to the working directory.
pub fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    let configured = settings.model_dir.iter().cloned();
    let from_env = ["APP_MODEL_DIR", "MODEL_DIR"].into_iter().filter_map(|k| std::env::var(k).ok());
    for candidate in configured.chain(from_env) {
        let p = expand_path(&candidate);
        if p.is_dir() { return Ok(p); }
        tracing::warn!(dir = %p.display(), "model directory does not exist");
    }
    let name = settings.model_id.rsplit('/').next().unwrap_or(&settings.model_id);
    let local = Path::new("models").join(name);
    if local.is_dir() { return Ok(local); }
    Err(anyhow!("could not locate model directory for {} (set embedding.model_dir or APP_MODEL_DIR)", settings.model_id))
}

fn fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Builds the embedder described by `settings`.
pub fn load_embedder(settings: &EmbeddingSettings) -> nasdb_core::error::Result<Arc<dyn Embedder>> {
    if fake_requested(settings) {
        tracing::info!(dim = settings.fake_dim, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let model = XlmRobertaEmbedder::load(settings).map_err(|e| Error::InvalidConfig(format!("loading embedding model: {e:#}")))?;
    Ok(Arc::new(model))
}
