//! Error taxonomy for the cache, promotion, and ranking layers.
//!
//! Miss-like conditions never appear here: store lookups return `Option` and
//! name binding returns [`Bound`](crate::db::store::Bound). Everything in this
//! enum is surfaced to the caller unmodified.

use std::sync::Arc;

use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A name resolves to a content key whose vector is absent from the store.
    #[error("name `{name}` points at content {key} which is missing from namespace {namespace}")]
    BrokenAlias {
        namespace: String,
        name: String,
        key: String,
    },

    /// Byte length is not a whole number of elements (or rows).
    #[error("malformed tensor: {len} bytes is not a multiple of {width}")]
    MalformedTensor { len: usize, width: usize },

    /// `think` only accepts text-like inputs.
    #[error("can't think about {0}")]
    UnsupportedInputType(String),

    /// Dynamic input whose shape is not one of the promotable shapes.
    #[error("can't promote {0} to a frame")]
    UnpromotableType(String),

    /// Ranking requested against zero candidates.
    #[error("cannot rank against an empty key set")]
    EmptyKeySet,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("duplicate column label `{0}`")]
    DuplicateLabel(String),

    #[error("no column labelled `{0}`")]
    UnknownLabel(String),

    #[error("invalid namespace field `{0}`: must be non-empty and contain no `/`")]
    InvalidNamespaceField(String),

    #[error("invalid dimension {0}: must be at least 1")]
    InvalidDimension(usize),

    #[error("store is scoped to {store} but embedder namespace is {embedder}")]
    NamespaceMismatch { store: String, embedder: String },

    #[error("unknown similarity convention `{0}`")]
    UnknownConvention(String),

    #[error("unknown model {0}")]
    UnknownModel(String),

    /// The embedder failed; nothing was cached.
    #[error("embedder failed: {0:#}")]
    Embedder(anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error raised by a concurrent computation of the same content key,
    /// as seen by the callers that waited on it.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    /// A copy of this error for callers that waited on someone else's
    /// computation. Variants whose payload cannot be cloned keep their
    /// message.
    pub(crate) fn echo(&self) -> Error {
        match self {
            Error::BrokenAlias {
                namespace,
                name,
                key,
            } => Error::BrokenAlias {
                namespace: namespace.clone(),
                name: name.clone(),
                key: key.clone(),
            },
            Error::MalformedTensor { len, width } => Error::MalformedTensor {
                len: *len,
                width: *width,
            },
            Error::UnsupportedInputType(s) => Error::UnsupportedInputType(s.clone()),
            Error::UnpromotableType(s) => Error::UnpromotableType(s.clone()),
            Error::EmptyKeySet => Error::EmptyKeySet,
            Error::DimensionMismatch { expected, actual } => Error::DimensionMismatch {
                expected: *expected,
                actual: *actual,
            },
            Error::DuplicateLabel(s) => Error::DuplicateLabel(s.clone()),
            Error::UnknownLabel(s) => Error::UnknownLabel(s.clone()),
            Error::InvalidNamespaceField(s) => Error::InvalidNamespaceField(s.clone()),
            Error::InvalidDimension(d) => Error::InvalidDimension(*d),
            Error::NamespaceMismatch { store, embedder } => Error::NamespaceMismatch {
                store: store.clone(),
                embedder: embedder.clone(),
            },
            Error::UnknownConvention(s) => Error::UnknownConvention(s.clone()),
            Error::UnknownModel(s) => Error::UnknownModel(s.clone()),
            Error::Embedder(e) => Error::Embedder(anyhow::anyhow!("{e:#}")),
            Error::Database(rusqlite::Error::SqliteFailure(code, msg)) => {
                Error::Database(rusqlite::Error::SqliteFailure(*code, msg.clone()))
            }
            Error::Database(e) => Error::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(e.to_string()),
            )),
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::Json(e) => Error::Json(serde_json::Error::io(std::io::Error::other(
                e.to_string(),
            ))),
            Error::Shared(inner) => Error::Shared(Arc::clone(inner)),
        }
    }

    /// The underlying error, looking through [`Error::Shared`].
    pub fn root(&self) -> &Error {
        match self {
            Error::Shared(inner) => inner.root(),
            other => other,
        }
    }
}
