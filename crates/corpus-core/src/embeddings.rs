//! Embedding model integration using Hugging Face Candle
//!
//! Provides local embedding generation with the pinned all-MiniLM-L6-v2
//! sentence transformer, plus a deterministic hashing embedder for offline
//! runs and tests. Index and query vectors must come from the same model, so
//! every embedder reports a stable `model_id` that is persisted with the index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{layer_norm, linear, Activation, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokenizers::{Tokenizer, TruncationParams};

use crate::config::EmbeddingBackend;
use crate::error::{CorpusError, Result};

/// Embedding dimension for all-MiniLM-L6-v2
pub const MINILM_DIM: usize = 384;

/// Maximum sequence length used by the sentence-transformers pipeline
pub const MAX_SEQ_LEN: usize = 256;

/// A text embedding backend.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model; persisted alongside the index
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. Processes sequentially unless overridden.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Instantiate the configured embedding backend.
///
/// The MiniLM weights are fetched from the Hugging Face Hub on first use and
/// cached by `hf-hub`.
pub async fn load_embedder(backend: &EmbeddingBackend) -> Result<Arc<dyn Embedder>> {
    match backend {
        EmbeddingBackend::Hashing { dimension } => Ok(Arc::new(HashingEmbedder::new(*dimension))),
        EmbeddingBackend::MiniLm { model_id } => {
            let model_id = model_id.clone();
            let model = tokio::task::spawn_blocking(move || {
                let files = EmbeddingModel::download(&model_id)?;
                EmbeddingModel::load(&model_id, &files)
            })
            .await
            .map_err(|e| CorpusError::Embedding(format!("model loading task failed: {}", e)))??;
            Ok(Arc::new(model))
        }
    }
}

/// Model configuration loaded from config.json
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub hidden_act: String,
    #[serde(default)]
    pub hidden_dropout_prob: f64,
    #[serde(default)]
    pub attention_probs_dropout_prob: f64,
    pub max_position_embeddings: usize,
    pub type_vocab_size: usize,
    pub layer_norm_eps: f64,
    #[serde(default)]
    pub pad_token_id: usize,
}

impl Default for Config {
    fn default() -> Self {
        // all-MiniLM-L6-v2 (BERT, 6 layers)
        Self {
            vocab_size: 30522,
            hidden_size: 384,
            num_hidden_layers: 6,
            num_attention_heads: 12,
            intermediate_size: 1536,
            hidden_act: "gelu".to_string(),
            hidden_dropout_prob: 0.1,
            attention_probs_dropout_prob: 0.1,
            max_position_embeddings: 512,
            type_vocab_size: 2,
            layer_norm_eps: 1e-12,
            pad_token_id: 0,
        }
    }
}

/// Local file locations of a downloaded model
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Files laid out in one directory (`config.json`, `tokenizer.json`, `model.safetensors`)
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
        }
    }
}

/// BERT Embeddings layer
struct BertEmbeddings {
    word_embeddings: candle_nn::Embedding,
    position_embeddings: candle_nn::Embedding,
    token_type_embeddings: candle_nn::Embedding,
    layer_norm: LayerNorm,
}

impl BertEmbeddings {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let word_embeddings = candle_nn::embedding(
            config.vocab_size,
            config.hidden_size,
            vb.pp("word_embeddings"),
        )?;
        let position_embeddings = candle_nn::embedding(
            config.max_position_embeddings,
            config.hidden_size,
            vb.pp("position_embeddings"),
        )?;
        let token_type_embeddings = candle_nn::embedding(
            config.type_vocab_size,
            config.hidden_size,
            vb.pp("token_type_embeddings"),
        )?;
        let layer_norm = layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            layer_norm,
        })
    }

    fn forward(&self, input_ids: &Tensor, token_type_ids: &Tensor, position_ids: &Tensor) -> Result<Tensor> {
        let word_embeds = self.word_embeddings.forward(input_ids)?;
        let position_embeds = self.position_embeddings.forward(position_ids)?;
        let token_type_embeds = self.token_type_embeddings.forward(token_type_ids)?;

        let embeddings = ((word_embeds + position_embeds)? + token_type_embeds)?;
        Ok(self.layer_norm.forward(&embeddings)?)
    }
}

/// BERT Self-Attention layer
struct BertSelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    num_attention_heads: usize,
    attention_head_size: usize,
}

impl BertSelfAttention {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let attention_head_size = config.hidden_size / config.num_attention_heads;
        let all_head_size = config.num_attention_heads * attention_head_size;

        Ok(Self {
            query: linear(config.hidden_size, all_head_size, vb.pp("query"))?,
            key: linear(config.hidden_size, all_head_size, vb.pp("key"))?,
            value: linear(config.hidden_size, all_head_size, vb.pp("value"))?,
            num_attention_heads: config.num_attention_heads,
            attention_head_size,
        })
    }

    /// [batch, seq, hidden] -> [batch, heads, seq, head_size]
    fn transpose_for_scores(&self, x: &Tensor) -> Result<Tensor> {
        let mut new_shape = x.dims().to_vec();
        new_shape.pop();
        new_shape.push(self.num_attention_heads);
        new_shape.push(self.attention_head_size);
        Ok(x.reshape(new_shape)?.transpose(1, 2)?.contiguous()?)
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let query_layer = self.transpose_for_scores(&self.query.forward(hidden_states)?)?;
        let key_layer = self.transpose_for_scores(&self.key.forward(hidden_states)?)?;
        let value_layer = self.transpose_for_scores(&self.value.forward(hidden_states)?)?;

        let attention_scores = query_layer.matmul(&key_layer.t()?)?;
        let attention_scores = (attention_scores / (self.attention_head_size as f64).sqrt())?;
        let attention_scores = attention_scores.broadcast_add(attention_mask)?;
        let attention_probs = candle_nn::ops::softmax_last_dim(&attention_scores)?;

        let context_layer = attention_probs.matmul(&value_layer)?;
        let context_layer = context_layer.transpose(1, 2)?.contiguous()?;

        let mut new_shape = context_layer.dims().to_vec();
        new_shape.pop();
        new_shape.pop();
        new_shape.push(self.num_attention_heads * self.attention_head_size);

        Ok(context_layer.reshape(new_shape)?)
    }
}

/// Dense + residual + LayerNorm, shared by the attention and feed-forward outputs
struct BertResidualOutput {
    dense: Linear,
    layer_norm: LayerNorm,
}

impl BertResidualOutput {
    fn load(vb: VarBuilder, in_dim: usize, config: &Config) -> Result<Self> {
        Ok(Self {
            dense: linear(in_dim, config.hidden_size, vb.pp("dense"))?,
            layer_norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, input_tensor: &Tensor) -> Result<Tensor> {
        let hidden_states = self.dense.forward(hidden_states)?;
        Ok(self.layer_norm.forward(&(hidden_states + input_tensor)?)?)
    }
}

/// BERT Layer (one transformer block)
struct BertLayer {
    self_attention: BertSelfAttention,
    attention_output: BertResidualOutput,
    intermediate: Linear,
    activation: Activation,
    output: BertResidualOutput,
}

impl BertLayer {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let activation = match config.hidden_act.as_str() {
            "relu" => Activation::Relu,
            _ => Activation::Gelu,
        };

        Ok(Self {
            self_attention: BertSelfAttention::load(vb.pp("attention").pp("self"), config)?,
            attention_output: BertResidualOutput::load(
                vb.pp("attention").pp("output"),
                config.hidden_size,
                config,
            )?,
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            activation,
            output: BertResidualOutput::load(vb.pp("output"), config.intermediate_size, config)?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let attended = self.self_attention.forward(hidden_states, attention_mask)?;
        let attention_output = self.attention_output.forward(&attended, hidden_states)?;
        let intermediate = self.activation.forward(&self.intermediate.forward(&attention_output)?)?;
        self.output.forward(&intermediate, &attention_output)
    }
}

/// Full BERT encoder
struct BertModel {
    embeddings: BertEmbeddings,
    layers: Vec<BertLayer>,
}

impl BertModel {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let embeddings = BertEmbeddings::load(vb.pp("embeddings"), config)?;
        let vb_l = vb.pp("encoder").pp("layer");
        let layers = (0..config.num_hidden_layers)
            .map(|i| BertLayer::load(vb_l.pp(i), config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { embeddings, layers })
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        position_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let mut hidden_states = self.embeddings.forward(input_ids, token_type_ids, position_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, attention_mask)?;
        }
        Ok(hidden_states)
    }
}

/// Sentence embedding model (MiniLM / BERT family) with mean pooling
pub struct EmbeddingModel {
    model_id: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl EmbeddingModel {
    /// Fetch the model files from the Hugging Face Hub (cached after the first call)
    pub fn download(model_id: &str) -> Result<ModelFiles> {
        use hf_hub::api::sync::Api;

        tracing::info!("Fetching embedding model {} from Hugging Face Hub...", model_id);

        let hub_error = |e: hf_hub::api::sync::ApiError| CorpusError::Embedding(e.to_string());
        let api = Api::new().map_err(hub_error)?;
        let repo = api.model(model_id.to_string());

        Ok(ModelFiles {
            config: repo.get("config.json").map_err(hub_error)?,
            tokenizer: repo.get("tokenizer.json").map_err(hub_error)?,
            weights: repo.get("model.safetensors").map_err(hub_error)?,
        })
    }

    /// Load the model from local files
    pub fn load(model_id: &str, files: &ModelFiles) -> Result<Self> {
        let device = Device::Cpu;

        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.exists() {
                return Err(CorpusError::Embedding(format!(
                    "Model file not found at {}",
                    path.display()
                )));
            }
        }

        let config_str = std::fs::read_to_string(&files.config)?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| CorpusError::Embedding(format!("Failed to parse config.json: {}", e)))?;

        tracing::info!(
            "Loaded config: {} layers, {} hidden size, {} attention heads",
            config.num_hidden_layers,
            config.hidden_size,
            config.num_attention_heads
        );

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| CorpusError::Embedding(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| CorpusError::Embedding(format!("Failed to configure tokenizer: {}", e)))?;

        tracing::info!("Loading model weights from {}", files.weights.display());

        // SAFETY: the weights file is not modified while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)?
        };

        // sentence-transformers exports have no prefix, raw BERT checkpoints use "bert."
        let vb = if vb.contains_tensor("embeddings.word_embeddings.weight") {
            vb
        } else {
            vb.pp("bert")
        };
        let model = BertModel::load(vb, &config)?;

        tracing::info!("Model loaded successfully");

        Ok(Self {
            model_id: model_id.to_string(),
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
        })
    }

    /// Additive attention mask: 0 for tokens, -10000 for padding; [1, 1, 1, seq]
    fn extended_attention_mask(&self, attention_mask: &Tensor) -> Result<Tensor> {
        let mask = attention_mask.to_dtype(DType::F32)?;
        let mask = mask.affine(-1.0, 1.0)?.affine(-10000.0, 0.0)?;
        Ok(mask.unsqueeze(1)?.unsqueeze(1)?)
    }

    /// Mean over non-padding tokens, then L2 normalisation
    fn pool(&self, output: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let sum = output.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?;
        let mean = sum.broadcast_div(&count)?.squeeze(0)?;

        let norm = (mean.sqr()?.sum_all()?.sqrt()? + 1e-12)?;
        Ok(mean.broadcast_div(&norm)?)
    }
}

impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| CorpusError::Embedding(format!("Tokenization failed: {}", e)))?;

        let ids = encoding.get_ids();
        let seq_len = ids.len();
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::zeros((1, seq_len), DType::U32, &self.device)?;
        let position_ids = Tensor::arange(0u32, seq_len as u32, &self.device)?.unsqueeze(0)?;

        let extended_mask = self.extended_attention_mask(&attention_mask)?;
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, &position_ids, &extended_mask)?;

        Ok(self.pool(&output, &attention_mask)?.to_vec1::<f32>()?)
    }
}

/// Deterministic bag-of-words feature hashing.
///
/// Each lower-cased alphanumeric token is hashed with SHA-256 into a signed
/// bucket; the resulting vector is L2-normalised. Texts sharing vocabulary
/// land close together, which is enough for citation lookup without a model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("hashing-sha256-{}", dimension),
        }
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dimension];

        let lower = text.to_lowercase();
        for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::vector::cosine_similarity;

    #[test]
    fn test_minilm_defaults() {
        let config = Config::default();
        assert_eq!(config.hidden_size, MINILM_DIM);
        assert_eq!(config.hidden_size % config.num_attention_heads, 0);
    }

    #[test]
    fn test_config_parses_hub_json() {
        let json = r#"{"vocab_size": 30522, "hidden_size": 384, "num_hidden_layers": 6,
            "num_attention_heads": 12, "intermediate_size": 1536, "hidden_act": "gelu",
            "max_position_embeddings": 512, "type_vocab_size": 2, "layer_norm_eps": 1e-12,
            "architectures": ["BertModel"]}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.num_hidden_layers, 6);
    }

    #[test]
    fn test_missing_model_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmbeddingModel::load("local", &ModelFiles::in_dir(dir.path()))
            .err()
            .unwrap();
        assert!(matches!(err, CorpusError::Embedding(msg) if msg.contains("config.json")));
    }

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("ADGM Courts jurisdiction").unwrap();
        let b = embedder.embed("ADGM Courts jurisdiction").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(embedder.model_id(), "hashing-sha256-64");
    }

    #[test]
    fn test_hashing_embedder_ranks_shared_vocabulary_higher() {
        let embedder = HashingEmbedder::new(384);
        let query = embedder.embed("signature block template").unwrap();
        let close = embedder.embed("The signature block of this template").unwrap();
        let far = embedder.embed("data protection policy retention").unwrap();
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let v = HashingEmbedder::new(8).embed("  ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
