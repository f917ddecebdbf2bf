//! Fixed-width transport encoding for vectors.
//!
//! Vectors travel between processes and into the blob store as raw
//! little-endian `f32`, with no header and no length prefix: the dimension is
//! `bytes.len() / 4`. Compute precision is up to the embedder; anything wider
//! than `f32` is narrowed on encode and does not survive a cache round trip.

use ndarray::Array2;

use crate::error::{Error, Result};

/// Width in bytes of one transported element.
pub const ELEMENT_WIDTH: usize = std::mem::size_of::<f32>();

/// Encode a vector as little-endian `f32` bytes.
pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * ELEMENT_WIDTH);
    for x in vector {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

/// Encode a wider-precision vector, narrowing each element to `f32`.
pub fn encode_f64(vector: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * ELEMENT_WIDTH);
    for x in vector {
        bytes.extend_from_slice(&(*x as f32).to_le_bytes());
    }
    bytes
}

/// Decode little-endian `f32` bytes. Never truncates a trailing partial element.
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % ELEMENT_WIDTH != 0 {
        return Err(Error::MalformedTensor {
            len: bytes.len(),
            width: ELEMENT_WIDTH,
        });
    }
    Ok(bytes
        .chunks_exact(ELEMENT_WIDTH)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Encode a stacked batch (one row per item) as row-major bytes.
pub fn encode_matrix(matrix: &Array2<f32>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(matrix.len() * ELEMENT_WIDTH);
    for row in matrix.rows() {
        for x in row {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
    }
    bytes
}

/// Decode a stacked batch of `dimension`-wide rows.
pub fn decode_matrix(bytes: &[u8], dimension: usize) -> Result<Array2<f32>> {
    let row_width = dimension * ELEMENT_WIDTH;
    if row_width == 0 {
        if bytes.is_empty() {
            return Ok(Array2::zeros((0, 0)));
        }
        return Err(Error::MalformedTensor {
            len: bytes.len(),
            width: row_width,
        });
    }
    if bytes.len() % row_width != 0 {
        return Err(Error::MalformedTensor {
            len: bytes.len(),
            width: row_width,
        });
    }
    let values = decode(bytes)?;
    let rows = values.len() / dimension;
    Array2::from_shape_vec((rows, dimension), values).map_err(|_| Error::MalformedTensor {
        len: bytes.len(),
        width: row_width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn encode_is_four_bytes_per_element_little_endian() {
        let bytes = encode(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..], &(-2.5f32).to_le_bytes());
    }

    #[test]
    fn decode_round_trips() {
        let v = vec![0.0, 1.5, -3.25, f32::MIN_POSITIVE, 1e30];
        assert_eq!(decode(&encode(&v)).unwrap(), v);
    }

    #[test]
    fn decode_empty_is_empty_vector() {
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_partial_element() {
        let err = decode(&[0, 0, 128, 63, 1]).unwrap_err();
        assert!(matches!(err, Error::MalformedTensor { len: 5, width: 4 }));
    }

    #[test]
    fn f64_is_narrowed_to_f32() {
        let precise = 0.1f64 + 0.2f64;
        let back = decode(&encode_f64(&[precise])).unwrap();
        assert_eq!(back, vec![precise as f32]);
        assert_ne!(back[0] as f64, precise);
    }

    #[test]
    fn matrix_round_trips_row_major() {
        let m = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let bytes = encode_matrix(&m);
        assert_eq!(decode(&bytes).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(decode_matrix(&bytes, 3).unwrap(), m);
    }

    #[test]
    fn matrix_rejects_partial_row() {
        let bytes = encode(&[1.0, 2.0, 3.0, 4.0]);
        let err = decode_matrix(&bytes, 3).unwrap_err();
        assert!(matches!(err, Error::MalformedTensor { len: 16, width: 12 }));
    }
}
