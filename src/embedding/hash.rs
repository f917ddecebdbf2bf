//! Model-free embedder based on FNV-1a token hashing.
//!
//! Each lowercase alphanumeric token adds one unit to the bucket its hash
//! selects, and the result is L2-normalized. Texts sharing words end up with a
//! positive dot product. Useful offline and wherever a deterministic embedder
//! is needed without model files.

use anyhow::Result;

use super::{l2_normalize, Embedder};
use crate::namespace::{Descriptor, Namespace};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct HashEmbedder {
    dimension: usize,
    namespace: Namespace,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> crate::Result<Self> {
        if dimension == 0 {
            return Err(crate::Error::InvalidDimension(dimension));
        }
        let namespace = Descriptor::new(super::models::HASH_FAMILY)
            .field(dimension)
            .resolve()?;
        Ok(Self {
            dimension,
            namespace,
        })
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl Embedder for HashEmbedder {
    fn namespace(&self) -> Namespace {
        self.namespace.clone()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn compute(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(token.to_lowercase().as_bytes()) % self.dimension as u64) as usize;
            v[bucket] += 1.0;
        }
        Ok(l2_normalize(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn fnv1a_matches_reference_values() {
        assert_eq!(fnv1a(b""), FNV_OFFSET);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn namespace_carries_dimension() {
        let e = HashEmbedder::new(64).unwrap();
        assert_eq!(e.namespace().as_str(), "embed/hash/64");
        assert_eq!(e.dimension(), Some(64));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            HashEmbedder::new(0),
            Err(crate::Error::InvalidDimension(0))
        ));
    }

    #[test]
    fn output_is_deterministic_and_normalized() {
        let e = HashEmbedder::new(256).unwrap();
        let a = e.compute("Red cow, red barn").unwrap();
        let b = e.compute("red COW red barn").unwrap();
        assert_eq!(a, b);
        let norm = dot(&a, &a).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_words_score_higher_than_disjoint() {
        let e = HashEmbedder::new(1024).unwrap();
        let phrase = e.compute("red cow").unwrap();
        let same = e.compute("red cow").unwrap();
        let word = e.compute("red").unwrap();
        assert!(dot(&phrase, &word) > 0.5);
        assert!((dot(&phrase, &same) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8).unwrap();
        assert_eq!(e.compute("  ,, ").unwrap(), vec![0.0; 8]);
    }
}
