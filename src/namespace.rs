//! Namespace derivation from an embedder's identity and configuration.
//!
//! Every cache entry is scoped by a [`Namespace`]. The string is recomputed
//! from configuration on every run and is never negotiated or migrated: change
//! a config field and the namespace changes, leaving older entries orphaned.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Root segment shared by every embedding namespace.
pub const ROOT: &str = "embed";

/// A canonical, config-derived scope for cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Family identifier plus ordered configuration fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    family: String,
    fields: Vec<String>,
}

impl Descriptor {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            fields: Vec::new(),
        }
    }

    /// Append a configuration field.
    pub fn field(mut self, value: impl ToString) -> Self {
        self.fields.push(value.to_string());
        self
    }

    /// Append a normalization flag, rendered as `normalized` / `unnormalized`.
    pub fn normalized(self, normalized: bool) -> Self {
        self.field(if normalized { "normalized" } else { "unnormalized" })
    }

    /// Render `embed/<family>/<field1>/<field2>/...`.
    ///
    /// Segments must be non-empty and free of `/`, which keeps the mapping
    /// from descriptors to strings injective.
    pub fn resolve(&self) -> Result<Namespace> {
        let mut out = String::from(ROOT);
        for segment in std::iter::once(&self.family).chain(self.fields.iter()) {
            if segment.is_empty() || segment.contains('/') {
                return Err(Error::InvalidNamespaceField(segment.clone()));
            }
            out.push('/');
            out.push_str(segment);
        }
        Ok(Namespace(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_family_and_fields_in_order() {
        let ns = Descriptor::new("flag")
            .field("large")
            .normalized(true)
            .resolve()
            .unwrap();
        assert_eq!(ns.as_str(), "embed/flag/large/normalized");
    }

    #[test]
    fn identical_descriptors_give_identical_namespaces() {
        let a = Descriptor::new("minilm").field("base").resolve().unwrap();
        let b = Descriptor::new("minilm").field("base").resolve().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn any_field_difference_changes_namespace() {
        let base = Descriptor::new("flag").field("small");
        let a = base.clone().normalized(true).resolve().unwrap();
        let b = base.normalized(false).resolve().unwrap();
        assert_ne!(a, b);
        assert_eq!(b.as_str(), "embed/flag/small/unnormalized");

        let c = Descriptor::new("flag").field("base").normalized(true).resolve().unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn slash_in_field_is_rejected() {
        // "a/b" would otherwise collide with the two fields "a", "b"
        let err = Descriptor::new("hash").field("a/b").resolve().unwrap_err();
        assert!(matches!(err, Error::InvalidNamespaceField(f) if f == "a/b"));
    }

    #[test]
    fn empty_family_is_rejected() {
        assert!(Descriptor::new("").resolve().is_err());
    }
}
