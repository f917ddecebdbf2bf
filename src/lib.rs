//! Content-addressed embedding cache with namespace isolation and centered
//! similarity ranking.
//!
//! Text (or any byte blob) is embedded once per namespace and cached by the
//! SHA-256 of its bytes. Batches of vectors are wrapped in labeled frames and
//! ranked against each other under nine centering conventions.
//!
//! | Convention | Query side | Key side |
//! |------------|------------|----------|
//! | `a @ b` (default) | raw | raw |
//! | `a(a) @ b(a)` | centered at queries | centered at queries |
//! | `a(b) @ b(b)` | centered at keys | centered at keys |
//! | ... | all nine combinations | |
//!
//! # Architecture
//!
//! - **Storage**: SQLite, one `contents` table keyed by (namespace, content key)
//!   and one `names` table of immutable aliases
//! - **Embeddings**: local ONNX Runtime sentence models, or a model-free
//!   token-hashing embedder
//! - **Cache**: a `moka` memo in front of the store with single-flight misses
//! - **Ranking**: `ndarray` matrix products with stable tie-breaking
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite schema and the namespace-scoped [`db::BlobStore`]
//! - [`embedding`]: The [`embedding::Embedder`] contract and its implementations
//! - [`namespace`]: Deterministic namespace strings from embedder configuration
//! - [`tensor`]: Raw little-endian `f32` transport encoding
//! - [`space`]: The content cache
//! - [`frame`]: Labeled vector batches, centering, and ranking
//! - [`promote`]: Input classification into frames

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod frame;
pub mod namespace;
pub mod promote;
pub mod space;
pub mod tensor;

pub use error::{Error, Result};
pub use frame::{Convention, Frame, Ranking};
pub use promote::Input;
pub use space::{Blob, ContentKey, Space, Thought, Vector};
