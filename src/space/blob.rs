//! Cache inputs and their content keys.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw content whose exact bytes determine its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Blob(Vec<u8>);

impl Blob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The blob as text, replacing invalid UTF-8 sequences.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// SHA-256 of the bytes. Byte-equal blobs always share a key.
    pub fn key(&self) -> ContentKey {
        ContentKey(hex::encode(Sha256::digest(&self.0)))
    }
}

impl From<&str> for Blob {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Blob {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&String> for Blob {
    fn from(s: &String) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Lowercase hex SHA-256 digest of a [`Blob`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    /// Wrap a key read back from the store.
    pub(crate) fn from_stored(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_sha256_hex() {
        assert_eq!(
            Blob::from("").key().as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            Blob::from("abc").key().as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn text_and_bytes_with_same_content_share_key() {
        assert_eq!(Blob::from("hello").key(), Blob::from(b"hello".to_vec()).key());
    }

    #[test]
    fn one_byte_difference_changes_key() {
        assert_ne!(Blob::from("hello").key(), Blob::from("hello ").key());
    }

    #[test]
    fn invalid_utf8_is_replaced_in_text_view() {
        let blob = Blob::from(vec![b'a', 0xff, b'b']);
        assert_eq!(blob.as_text(), "a\u{fffd}b");
    }
}
