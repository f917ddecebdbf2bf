//! Catalog of supported sentence-embedding models.
//!
//! Each entry pins the Hugging Face repository, output dimension, pooling
//! strategy, and ONNX input signature of one family/size pair. The namespace
//! of an embedder is derived from the catalog key, never from file paths.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::namespace::Descriptor;

/// How token embeddings are reduced to one sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pooling {
    /// Hidden state of the first (`[CLS]`) token.
    Cls,
    /// Attention-masked mean over all tokens.
    Mean,
}

/// A fully resolved model choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub family: &'static str,
    pub size: &'static str,
    pub repo: &'static str,
    pub dimension: usize,
    pub pooling: Pooling,
    /// Whether the ONNX export expects a `token_type_ids` input.
    pub token_type_ids: bool,
    pub normalized: bool,
    /// Whether `normalized` is a user choice that belongs in the namespace.
    normalization_configurable: bool,
}

struct CatalogEntry {
    family: &'static str,
    size: &'static str,
    repo: &'static str,
    dimension: usize,
    pooling: Pooling,
    token_type_ids: bool,
    normalization_configurable: bool,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry { family: "flag", size: "small", repo: "BAAI/bge-small-en-v1.5", dimension: 384, pooling: Pooling::Cls, token_type_ids: true, normalization_configurable: true },
    CatalogEntry { family: "flag", size: "base", repo: "BAAI/bge-base-en-v1.5", dimension: 768, pooling: Pooling::Cls, token_type_ids: true, normalization_configurable: true },
    CatalogEntry { family: "flag", size: "large", repo: "BAAI/bge-large-en-v1.5", dimension: 1024, pooling: Pooling::Cls, token_type_ids: true, normalization_configurable: true },
    CatalogEntry { family: "minilm", size: "base", repo: "sentence-transformers/all-MiniLM-L6-v2", dimension: 384, pooling: Pooling::Mean, token_type_ids: true, normalization_configurable: false },
    CatalogEntry { family: "minilm", size: "large", repo: "sentence-transformers/all-MiniLM-L12-v2", dimension: 384, pooling: Pooling::Mean, token_type_ids: true, normalization_configurable: false },
    CatalogEntry { family: "mpnet", size: "base", repo: "sentence-transformers/all-mpnet-base-v2", dimension: 768, pooling: Pooling::Mean, token_type_ids: false, normalization_configurable: false },
];

/// Family served by [`HashEmbedder`](super::hash::HashEmbedder) rather than ONNX.
pub const HASH_FAMILY: &str = "hash";

impl ModelSpec {
    /// Resolve a family/size pair. `normalized` only matters for families
    /// that expose it; the sentence-transformers exports always normalize.
    pub fn lookup(family: &str, size: &str, normalized: bool) -> Result<Self> {
        let entry = CATALOG
            .iter()
            .find(|e| e.family == family && e.size == size)
            .ok_or_else(|| {
                let sizes: Vec<&str> = CATALOG
                    .iter()
                    .filter(|e| e.family == family)
                    .map(|e| e.size)
                    .collect();
                if sizes.is_empty() {
                    Error::UnknownModel(format!("family `{family}`"))
                } else {
                    Error::UnknownModel(format!(
                        "size `{size}` for {family}; sizes: {}",
                        sizes.join(", ")
                    ))
                }
            })?;

        Ok(Self {
            family: entry.family,
            size: entry.size,
            repo: entry.repo,
            dimension: entry.dimension,
            pooling: entry.pooling,
            token_type_ids: entry.token_type_ids,
            normalized: if entry.normalization_configurable { normalized } else { true },
            normalization_configurable: entry.normalization_configurable,
        })
    }

    pub fn descriptor(&self) -> Descriptor {
        let d = Descriptor::new(self.family).field(self.size);
        if self.normalization_configurable {
            d.normalized(self.normalized)
        } else {
            d
        }
    }

    /// Directory holding `model.onnx` and `tokenizer.json` for this model.
    pub fn model_dir(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(format!("{}-{}", self.family, self.size))
    }

    pub fn onnx_url(&self) -> String {
        format!("https://huggingface.co/{}/resolve/main/onnx/model.onnx", self.repo)
    }

    pub fn tokenizer_url(&self) -> String {
        format!("https://huggingface.co/{}/resolve/main/tokenizer.json", self.repo)
    }
}

/// One row of `embd models` output.
#[derive(Debug, Clone)]
pub struct ModelListing {
    pub family: &'static str,
    pub size: &'static str,
    pub repo: &'static str,
    pub dimension: Option<usize>,
}

/// Every catalog entry, plus the model-free hash family.
pub fn list_models() -> Vec<ModelListing> {
    let mut out: Vec<ModelListing> = CATALOG
        .iter()
        .map(|e| ModelListing {
            family: e.family,
            size: e.size,
            repo: e.repo,
            dimension: Some(e.dimension),
        })
        .collect();
    out.push(ModelListing {
        family: HASH_FAMILY,
        size: "-",
        repo: "(built in, no model files)",
        dimension: None,
    });
    out
}
