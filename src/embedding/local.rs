//! Local ONNX Runtime embedder.
//!
//! Implements [`Embedder`] for the BERT-style models in the catalog via `ort`.
//! Handles tokenization, inference, CLS or mean pooling, and optional L2
//! normalization. The session is loaded lazily on first compute.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::models::{ModelSpec, Pooling};
use super::{l2_normalize, Embedder};
use crate::namespace::Namespace;

/// Maximum sequence length fed to the model.
const MAX_SEQ_LEN: usize = 512;

struct LoadedModel {
    session: Session,
    tokenizer: Tokenizer,
}

/// ONNX-based embedder for one catalog entry.
pub struct LocalEmbedder {
    spec: ModelSpec,
    namespace: Namespace,
    model_dir: PathBuf,
    model: Mutex<Option<LoadedModel>>,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for LocalEmbedder {}
unsafe impl Sync for LocalEmbedder {}

impl LocalEmbedder {
    pub fn new(spec: ModelSpec, cache_dir: &Path) -> crate::Result<Self> {
        let namespace = spec.descriptor().resolve()?;
        let model_dir = spec.model_dir(cache_dir);
        Ok(Self {
            spec,
            namespace,
            model_dir,
            model: Mutex::new(None),
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Whether both model files are present on disk.
    pub fn is_downloaded(&self) -> bool {
        self.model_dir.join("model.onnx").exists() && self.model_dir.join("tokenizer.json").exists()
    }
}

impl LoadedModel {
    fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `embd model download` first.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Run `embd model download` first.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self { session, tokenizer })
    }
}

impl Embedder for LocalEmbedder {
    fn namespace(&self) -> Namespace {
        self.namespace.clone()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.spec.dimension)
    }

    fn compute(&self, text: &str) -> Result<Vec<f32>> {
        self.compute_batch(&[text])?
            .into_iter()
            .next()
            .context("model returned no embedding")
    }

    fn compute_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut guard = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("model lock poisoned: {e}"))?;
        if guard.is_none() {
            *guard = Some(LoadedModel::load(&self.model_dir)?);
        }
        let LoadedModel { session, tokenizer } =
            guard.as_mut().context("model failed to load")?;

        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut input_ids_flat = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask_flat = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids_flat.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask_flat.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor =
            Tensor::from_array((shape.clone(), input_ids_flat.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask_flat.clone().into_boxed_slice()))?;

        let outputs = if self.spec.token_type_ids {
            // single sentence, no segment B
            let token_type_ids = vec![0i64; batch_size * seq_len];
            let token_type_ids_tensor =
                Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;
            session.run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            })?
        } else {
            session.run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
            })?
        };

        // Output name varies by export; fall back to the first output.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (out_shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings tensor")?;

        let dims: &[i64] = &out_shape;
        let expected = self.spec.dimension;
        anyhow::ensure!(
            dims.len() == 3 && dims[2] == expected as i64,
            "unexpected token embeddings shape: {dims:?}, expected [batch, seq, {expected}]"
        );
        let hidden_dim = dims[2] as usize;
        let actual_seq_len = dims[1] as usize;

        let mut results = Vec::with_capacity(batch_size);
        for b in 0..batch_size {
            let pooled = match self.spec.pooling {
                Pooling::Cls => {
                    let offset = b * actual_seq_len * hidden_dim;
                    data[offset..offset + hidden_dim].to_vec()
                }
                Pooling::Mean => {
                    let mut sum = vec![0.0f32; hidden_dim];
                    let mut count = 0.0f32;
                    for s in 0..actual_seq_len {
                        let mask = attention_mask_flat[b * seq_len + s] as f32;
                        if mask > 0.0 {
                            let offset = (b * actual_seq_len + s) * hidden_dim;
                            for (acc, x) in sum.iter_mut().zip(&data[offset..offset + hidden_dim]) {
                                *acc += x * mask;
                            }
                            count += mask;
                        }
                    }
                    if count > 0.0 {
                        for x in &mut sum {
                            *x /= count;
                        }
                    }
                    sum
                }
            };

            if self.spec.normalized {
                results.push(l2_normalize(&pooled));
            } else {
                results.push(pooled);
            }
        }

        Ok(results)
    }
}
