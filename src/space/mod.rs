//! Content-addressed embedding cache.
//!
//! A [`Space`] pairs one [`Embedder`] with a [`BlobStore`] scoped to the
//! embedder's namespace. Vectors are looked up by the SHA-256 of their input
//! bytes, first in an in-process memo, then in the store, and only computed
//! when both miss. Names are immutable aliases onto content keys.

mod blob;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use moka::sync::Cache;
use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use blob::{Blob, ContentKey};

use crate::db::{BlobStore, Bound};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::namespace::Namespace;
use crate::promote::Input;
use crate::tensor;

/// A computed embedding in transport precision.
pub type Vector = Vec<f32>;

/// Output of [`Space::think`], shaped like its input.
#[derive(Debug, Clone, PartialEq)]
pub enum Thought {
    Vector(Vector),
    /// One row per input item, in input order.
    Batch(Array2<f32>),
    Mapping(IndexMap<String, Vector>),
}

impl Thought {
    /// Raw transport bytes: row-major f32, no header.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Thought::Vector(v) => tensor::encode(v),
            Thought::Batch(m) => tensor::encode_matrix(m),
            Thought::Mapping(map) => map.values().flat_map(|v| tensor::encode(v)).collect(),
        }
    }
}

/// Counters for one process's view of a space.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpaceStats {
    pub namespace: String,
    pub dimension: Option<usize>,
    pub memo_entries: u64,
    /// Embedder invocations made by this space since construction.
    pub computed: u64,
}

pub struct Space {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn BlobStore>,
    namespace: Namespace,
    memo: Cache<ContentKey, Vector>,
    dimension: OnceLock<usize>,
    computed: AtomicU64,
}

impl Space {
    /// Build a space with an unbounded memo.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn BlobStore>) -> Result<Self> {
        Self::with_memo_capacity(embedder, store, 0)
    }

    /// Build a space whose memo holds at most `capacity` vectors (0 = unbounded).
    pub fn with_memo_capacity(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn BlobStore>,
        capacity: u64,
    ) -> Result<Self> {
        let namespace = embedder.namespace();
        if store.namespace() != &namespace {
            return Err(Error::NamespaceMismatch {
                store: store.namespace().to_string(),
                embedder: namespace.to_string(),
            });
        }

        let memo = if capacity > 0 {
            Cache::builder().max_capacity(capacity).build()
        } else {
            Cache::builder().build()
        };

        let dimension = OnceLock::new();
        if let Some(d) = embedder.dimension() {
            let _ = dimension.set(d);
        }

        debug!(namespace = %namespace, capacity, "space opened");
        Ok(Self {
            embedder,
            store,
            namespace,
            memo,
            dimension,
            computed: AtomicU64::new(0),
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Vector width, if declared by the embedder or already observed.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    /// Vector for `blob`, computing and storing it on a miss.
    ///
    /// Concurrent callers asking for the same content share one computation.
    /// The caller that ran it gets its error back as raised; callers that
    /// waited get [`Error::Shared`].
    pub fn get_or_compute_by_content(&self, blob: &Blob) -> Result<Vector> {
        let key = blob.key();
        let mut failure = None;
        let shared = self.memo.try_get_with(key.clone(), || {
            self.load_or_compute(&key, blob).map_err(|err| {
                let echo = err.echo();
                failure = Some(err);
                echo
            })
        });
        shared.map_err(|err| failure.take().unwrap_or(Error::Shared(err)))
    }

    /// Vector bound to `name`, binding it to `blob` if the name is new.
    ///
    /// An existing binding always wins; `blob` is then ignored.
    pub fn get_or_compute_by_name(&self, name: &str, blob: &Blob) -> Result<Vector> {
        if let Some(key) = self.store.get_name(name)? {
            return self.resolve(name, &key);
        }
        let vector = self.get_or_compute_by_content(blob)?;
        match self.bind(name, &blob.key())? {
            Bound::Created => Ok(vector),
            // Lost a race with another binder; report what the name now means.
            Bound::AlreadyExists => match self.store.get_name(name)? {
                Some(key) if key != blob.key() => self.resolve(name, &key),
                _ => Ok(vector),
            },
        }
    }

    /// Make sure `blob` is cached and bind `name` to it if unbound.
    pub fn bind_name(&self, name: &str, blob: &Blob) -> Result<Bound> {
        self.get_or_compute_by_content(blob)?;
        self.bind(name, &blob.key())
    }

    /// Vector bound to `name`, or `None` if the name is unbound.
    pub fn lookup_name(&self, name: &str) -> Result<Option<Vector>> {
        match self.store.get_name(name)? {
            Some(key) => self.resolve(name, &key).map(Some),
            None => Ok(None),
        }
    }

    /// Embed text-like input, keeping its shape.
    pub fn think(&self, input: Input) -> Result<Thought> {
        match input {
            Input::Item(blob) => self.get_or_compute_by_content(&blob).map(Thought::Vector),
            Input::Sequence(blobs) => {
                let vectors = blobs
                    .iter()
                    .map(|b| self.get_or_compute_by_content(b))
                    .collect::<Result<Vec<_>>>()?;
                stack(&vectors).map(Thought::Batch)
            }
            Input::Mapping(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (label, blob) in map {
                    let vector = self.get_or_compute_by_content(&blob)?;
                    out.insert(label, vector);
                }
                Ok(Thought::Mapping(out))
            }
            other => Err(Error::UnsupportedInputType(other.describe())),
        }
    }

    /// Read a file and embed its bytes.
    pub fn get_from_path(&self, path: impl AsRef<Path>) -> Result<Vector> {
        let blob = Blob::from(std::fs::read(path)?);
        self.get_or_compute_by_content(&blob)
    }

    /// Like [`get_or_compute_by_name`](Self::get_or_compute_by_name), reading
    /// `path` only when `name` is unbound.
    pub fn get_from_name_and_path(&self, name: &str, path: impl AsRef<Path>) -> Result<Vector> {
        if let Some(key) = self.store.get_name(name)? {
            return self.resolve(name, &key);
        }
        let blob = Blob::from(std::fs::read(path)?);
        self.get_or_compute_by_name(name, &blob)
    }

    pub fn stats(&self) -> SpaceStats {
        self.memo.run_pending_tasks();
        SpaceStats {
            namespace: self.namespace.to_string(),
            dimension: self.dimension(),
            memo_entries: self.memo.entry_count(),
            computed: self.computed.load(Ordering::Relaxed),
        }
    }

    fn load_or_compute(&self, key: &ContentKey, blob: &Blob) -> Result<Vector> {
        if let Some(bytes) = self.store.get_content(key)? {
            let vector = tensor::decode(&bytes)?;
            self.check_dimension(vector.len())?;
            debug!(key = %key, "store hit");
            return Ok(vector);
        }

        let vector = self
            .embedder
            .compute(&blob.as_text())
            .map_err(Error::Embedder)?;
        self.computed.fetch_add(1, Ordering::Relaxed);
        self.check_dimension(vector.len())?;

        self.store.put_content(key, &tensor::encode(&vector))?;
        debug!(key = %key, dimension = vector.len(), "computed");
        Ok(vector)
    }

    fn resolve(&self, name: &str, key: &ContentKey) -> Result<Vector> {
        if let Some(vector) = self.memo.get(key) {
            return Ok(vector);
        }
        let bytes = self
            .store
            .get_content(key)?
            .ok_or_else(|| Error::BrokenAlias {
                namespace: self.namespace.to_string(),
                name: name.to_string(),
                key: key.to_string(),
            })?;
        let vector = tensor::decode(&bytes)?;
        self.check_dimension(vector.len())?;
        self.memo.insert(key.clone(), vector.clone());
        Ok(vector)
    }

    fn bind(&self, name: &str, key: &ContentKey) -> Result<Bound> {
        let bound = self.store.put_name(name, key)?;
        match bound {
            Bound::Created => debug!(name, key = %key, "name bound"),
            Bound::AlreadyExists => {
                if let Some(existing) = self.store.get_name(name)? {
                    if &existing != key {
                        warn!(name, existing = %existing, ignored = %key, "name already bound, rebinding ignored");
                    }
                }
            }
        }
        Ok(bound)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        let expected = *self.dimension.get_or_init(|| {
            info!(namespace = %self.namespace, dimension = actual, "dimension discovered");
            actual
        });
        if expected != actual {
            return Err(Error::DimensionMismatch { expected, actual });
        }
        Ok(())
    }
}

/// Stack equal-length vectors as the rows of a matrix.
pub(crate) fn stack(vectors: &[Vector]) -> Result<Array2<f32>> {
    let width = vectors.first().map_or(0, Vec::len);
    let mut flat = Vec::with_capacity(width * vectors.len());
    for v in vectors {
        if v.len() != width {
            return Err(Error::DimensionMismatch {
                expected: width,
                actual: v.len(),
            });
        }
        flat.extend_from_slice(v);
    }
    Array2::from_shape_vec((vectors.len(), width), flat).map_err(|_| Error::MalformedTensor {
        len: width * vectors.len() * tensor::ELEMENT_WIDTH,
        width: tensor::ELEMENT_WIDTH,
    })
}
