//! Labeled batches of vectors and the similarity engine over them.
//!
//! A [`Frame`] stores one vector per column with a unique label per column.
//! Everything here is pure: no caching, no I/O. Ranking lives in [`rank`].

pub mod rank;

use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1, Axis};

pub use rank::{greps, rank, top, top_k, Centering, Convention, Ranking, Similarity};

use crate::error::{Error, Result};

/// Column-labeled matrix of shape `(dimension, columns)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    data: Array2<f64>,
    labels: Vec<String>,
}

impl Frame {
    /// Build a frame from `(dimension, columns)` data.
    pub fn new(labels: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if data.ncols() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: labels.len(),
                actual: data.ncols(),
            });
        }
        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(Error::DuplicateLabel(label.clone()));
            }
        }
        Ok(Self { data, labels })
    }

    /// Build a frame from transport-precision vectors, one per label.
    pub fn from_columns(labels: Vec<String>, columns: &[Vec<f32>]) -> Result<Self> {
        if columns.len() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: labels.len(),
                actual: columns.len(),
            });
        }
        let dimension = columns.first().map_or(0, Vec::len);
        let mut data = Array2::zeros((dimension, columns.len()));
        for (j, column) in columns.iter().enumerate() {
            if column.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: column.len(),
                });
            }
            for (i, x) in column.iter().enumerate() {
                data[[i, j]] = f64::from(*x);
            }
        }
        Self::new(labels, data)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.data.nrows()
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn column(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.len()).then(|| self.data.column(index))
    }

    pub fn column_by_label(&self, label: &str) -> Result<ArrayView1<'_, f64>> {
        self.position(label)
            .map(|j| self.data.column(j))
            .ok_or_else(|| Error::UnknownLabel(label.to_string()))
    }

    /// A new frame holding the named columns, in the order given.
    pub fn select(&self, labels: &[&str]) -> Result<Frame> {
        let indices = labels
            .iter()
            .map(|l| self.position(l).ok_or_else(|| Error::UnknownLabel(l.to_string())))
            .collect::<Result<Vec<_>>>()?;
        let data = self.data.select(Axis(1), &indices);
        Frame::new(labels.iter().map(|l| l.to_string()).collect(), data)
    }

    /// Mean of all columns. A frame without columns has a zero centroid.
    pub fn centroid(&self) -> Array1<f64> {
        self.data
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(self.dimension()))
    }

    /// Subtract `reference`'s centroid from every column.
    pub fn center_at(&self, reference: &Frame) -> Result<Frame> {
        if reference.dimension() != self.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                actual: reference.dimension(),
            });
        }
        let centroid = reference.centroid().insert_axis(Axis(1));
        Ok(Frame {
            data: &self.data - &centroid,
            labels: self.labels.clone(),
        })
    }

    /// Subtract this frame's own centroid.
    pub fn centered(&self) -> Frame {
        let centroid = self.centroid().insert_axis(Axis(1));
        Frame {
            data: &self.data - &centroid,
            labels: self.labels.clone(),
        }
    }

    /// `selfᵗ · other`: one row per column of `self`, one column per column of `other`.
    pub fn similarity(&self, other: &Frame) -> Result<Similarity> {
        if other.dimension() != self.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        Ok(Similarity {
            queries: self.labels.clone(),
            keys: other.labels.clone(),
            scores: self.data.t().dot(&other.data),
        })
    }
}
