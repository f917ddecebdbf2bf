#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use embd::db::Database;
use embd::embedding::Embedder;
use embd::namespace::{Descriptor, Namespace};
use embd::Space;

pub const COLORS: [&str; 6] = ["red", "orange", "yellow", "green", "blue", "purple"];
pub const ANIMALS: [&str; 6] = ["cow", "dog", "horse", "chicken", "cat", "rabbit"];

/// `"red cow"`, `"orange dog"`, ... pairing each color with an animal.
pub fn phrases() -> Vec<String> {
    COLORS
        .iter()
        .zip(ANIMALS)
        .map(|(c, a)| format!("{c} {a}"))
        .collect()
}

/// Bag-of-words embedder over a fixed vocabulary.
///
/// Each vocabulary word owns one axis; a text's vector counts the vocabulary
/// words it contains. Every call to `compute` is counted.
pub struct VocabEmbedder {
    vocab: Vec<String>,
    namespace: Namespace,
    scale: f32,
    delay: Duration,
    calls: AtomicUsize,
}

impl VocabEmbedder {
    pub fn new(vocab: &[&str]) -> Self {
        Self {
            vocab: vocab.iter().map(|w| w.to_string()).collect(),
            namespace: Descriptor::new("vocab").field(vocab.len()).resolve().unwrap(),
            scale: 1.0,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Colors and animals.
    pub fn colors_and_animals() -> Self {
        let vocab: Vec<&str> = COLORS.iter().chain(ANIMALS.iter()).copied().collect();
        Self::new(&vocab)
    }

    /// Same vocabulary under a different configuration field.
    pub fn with_variant(mut self, variant: &str) -> Self {
        self.namespace = Descriptor::new("vocab")
            .field(self.vocab.len())
            .field(variant)
            .resolve()
            .unwrap();
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for VocabEmbedder {
    fn namespace(&self) -> Namespace {
        self.namespace.clone()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.vocab.len())
    }

    fn compute(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        anyhow::ensure!(!text.contains("boom"), "refusing to embed {text:?}");
        let mut v = vec![0.0f32; self.vocab.len()];
        for word in text.split_whitespace() {
            if let Some(i) = self.vocab.iter().position(|w| w.eq_ignore_ascii_case(word)) {
                v[i] += self.scale;
            }
        }
        Ok(v)
    }
}

/// Embedder whose output width is the text's byte length, declared nowhere.
pub struct LengthEmbedder;

impl Embedder for LengthEmbedder {
    fn namespace(&self) -> Namespace {
        Descriptor::new("length").resolve().unwrap()
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    fn compute(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![1.0; text.len()])
    }
}

/// A space over `embedder` backed by `db`, scoped to the embedder's namespace.
pub fn space_on<E: Embedder + 'static>(db: &Database, embedder: Arc<E>) -> Space {
    let store = Arc::new(db.scoped(embedder.namespace()));
    Space::new(embedder, store).unwrap()
}

/// A fresh in-memory space over the color/animal vocabulary.
pub fn test_space() -> (Arc<VocabEmbedder>, Space) {
    let db = Database::open_in_memory().unwrap();
    let embedder = Arc::new(VocabEmbedder::colors_and_animals());
    let space = space_on(&db, Arc::clone(&embedder));
    (embedder, space)
}
