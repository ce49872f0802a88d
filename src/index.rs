//! Flat inner-product vector index.
//!
//! Vectors are L2-normalized before they enter the index, so inner product
//! equals cosine similarity and every score lies in [-1, 1]. The index is
//! exact: ranking is by true descending inner product with ties broken by
//! ascending row position, which both search strategies share.
//!
//! Binary layout (little endian):
//! - 4 bytes: row count (u32)
//! - 4 bytes: dimension (u32)
//! - rows * dim * 4 bytes: f32 values in row-major order

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Header size: 4 bytes row count + 4 bytes dimension.
const HEADER_SIZE: usize = 8;

/// L2-normalize a vector in place.
///
/// A vector whose norm is exactly zero is left untouched (the norm is
/// substituted with 1.0), yielding a deterministic zero vector rather
/// than NaN.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    for x in vector.iter_mut() {
        *x /= norm;
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Ordering shared by every search strategy: descending score, then
/// ascending row position.
pub fn by_score_then_row(a: &(usize, f32), b: &(usize, f32)) -> std::cmp::Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then(a.0.cmp(&b.0))
}

/// A dense matrix of unit-norm embedding vectors, position-aligned with
/// the metadata table published beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from row vectors, normalizing each one.
    pub fn from_rows(rows: Vec<Vec<f32>>, dimension: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for row in &rows {
            if row.len() != dimension {
                return Err(Error::Embedding(format!(
                    "vector dimension {} does not match index dimension {dimension}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }

        data.par_chunks_mut(dimension).for_each(l2_normalize);

        Ok(Self { dimension, data })
    }

    /// An index with zero rows (published for an empty corpus).
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Inner product of `query` against every row, in row order.
    pub fn scores(&self, query: &[f32]) -> Vec<f32> {
        self.data
            .par_chunks(self.dimension)
            .map(|row| dot(row, query))
            .collect()
    }

    /// Serialize to the on-disk binary layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.data.len() * 4);
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));
        bytes
    }

    /// Deserialize from the on-disk binary layout, failing closed on any
    /// length mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::CorruptArtifact(format!(
                "vector file too short: {} bytes",
                bytes.len()
            )));
        }

        let rows = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let dimension =
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;

        let expected = HEADER_SIZE + rows * dimension * 4;
        if bytes.len() != expected {
            return Err(Error::CorruptArtifact(format!(
                "vector file length {} does not match header ({rows} rows x {dimension} dims)",
                bytes.len()
            )));
        }

        let data = bytes[HEADER_SIZE..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Ok(Self { dimension, data })
    }
}
