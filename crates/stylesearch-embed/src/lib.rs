//! Text embedding capability for the semantic side of the search.
//!
//! [`SentenceEmbedder`] runs a BERT sentence encoder (MiniLM family) with
//! candle; [`FakeEmbedder`] is a deterministic feature-hashing stand-in for
//! tests and development. Both return L2-normalised vectors.
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{info, warn};
use twox_hash::XxHash64;

use stylesearch_core::config::{expand_path, EmbeddingSettings};
pub use stylesearch_core::traits::Embedder;

pub mod input;
pub mod pool;

pub use input::EncodedInput;
pub use pool::masked_mean_l2;

/// Dimensionality of the hashing embedder, matching MiniLM-L6.
pub const FAKE_DIM: usize = 384;

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl SentenceEmbedder {
    /// Load tokenizer, config and weights from a local model directory.
    ///
    /// Weights are read from `model.safetensors` when present, otherwise from
    /// the PyTorch `pytorch_model.bin` pickle.
    pub fn new(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = input::select_device();
        info!(model_dir = %model_dir.display(), "loading sentence encoder");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let config: BertConfig = serde_json::from_value(raw)?;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is only read while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, &device)? }
        } else {
            let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
            let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, DTYPE, &device)
        };
        let model = BertModel::load(vb, &config)?;
        info!(dim, max_len, "sentence encoder loaded");
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let input = EncodedInput::new(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&input.input_ids, &input.token_type_ids()?, Some(&input.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &input.attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { bail!("encoder produced {} dims, expected {}", emb.len(), self.dim); }
        if start.elapsed().as_millis() > 100 { warn!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { texts.iter().map(|t| self.embed_one(t)).collect() }
}

/// Feature-hashing bag-of-words embedder.
///
/// Lowercased alphanumeric words are hashed into `dim` buckets, so texts
/// sharing words have a positive cosine similarity. Output depends only on
/// the input text.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lower = text.to_lowercase();
        for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + 0.5 * val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_one(t)).collect()) }
}

fn fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Pick the embedder for this process: the hashing embedder when requested
/// through settings or `APP_USE_FAKE_EMBEDDINGS`, the sentence encoder otherwise.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if fake_requested(settings) {
        info!(dim = FAKE_DIM, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(FAKE_DIM)));
    }
    let model_dir = resolve_model_dir(&settings.model_dir)?;
    Ok(Box::new(SentenceEmbedder::new(&model_dir, settings.max_len)?))
}

fn resolve_model_dir(configured: &str) -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(&dir);
            if p.exists() { info!(var, path = %p.display(), "using model dir from environment"); return Ok(p); }
        }
    }
    let configured = expand_path(configured);
    if configured.exists() { return Ok(configured); }
    let parent = Path::new("..").join(&configured);
    if parent.exists() { return Ok(parent); }
    Err(anyhow!("Could not locate sentence encoder model directory ({})", configured.display()))
}
