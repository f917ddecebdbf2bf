//! Text-to-vector embedders.
//!
//! Provides the [`Embedder`] contract consumed by the content cache, a local
//! ONNX implementation for the sentence-embedding models in [`models`], and a
//! model-free [`hash::HashEmbedder`]. Embedders are created via
//! [`create_embedder`] from configuration.

pub mod hash;
pub mod local;
pub mod models;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{expand_tilde, EmbeddingConfig};
use crate::namespace::Namespace;

/// Anything that maps text to a vector.
///
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait Embedder: Send + Sync {
    /// Deterministic, config-derived scope for this embedder's vectors.
    fn namespace(&self) -> Namespace;

    /// Output dimension, or `None` if only known after the first compute.
    fn dimension(&self) -> Option<usize>;

    /// Embed a single text.
    fn compute(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch. Implementations may override for batched inference.
    fn compute_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.compute(t)).collect()
    }
}

/// Create an embedder from config.
///
/// Model files are not touched here; ONNX models load on first compute, so a
/// fully cached workload never needs them.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if config.family == models::HASH_FAMILY {
        return Ok(Arc::new(hash::HashEmbedder::new(config.dimension)?));
    }
    let spec = models::ModelSpec::lookup(&config.family, &config.size, config.normalized)?;
    let cache_dir = expand_tilde(&config.cache_dir);
    Ok(Arc::new(local::LocalEmbedder::new(spec, &cache_dir)?))
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub(crate) fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(family: &str, size: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            family: family.into(),
            size: size.into(),
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_l2_normalize() {
        let normalized = l2_normalize(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn creates_local_embedder_without_model_files() {
        let embedder = create_embedder(&config("minilm", "base")).unwrap();
        assert_eq!(embedder.namespace().as_str(), "embed/minilm/base");
        assert_eq!(embedder.dimension(), Some(384));
    }

    #[test]
    fn creates_hash_embedder() {
        let mut c = config("hash", "-");
        c.dimension = 32;
        let embedder = create_embedder(&c).unwrap();
        assert_eq!(embedder.namespace().as_str(), "embed/hash/32");
        assert_eq!(embedder.compute("hello").unwrap().len(), 32);
    }

    #[test]
    fn unknown_family_fails() {
        let err = create_embedder(&config("glove", "base")).err().unwrap();
        assert!(err.to_string().contains("glove"));
    }
}
