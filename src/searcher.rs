//! Query-time retrieval.
//!
//! Two interchangeable strategies sit behind [`SearchBackend`]: the exact
//! flat index (partial selection over the persisted index) and a linear
//! scan over the raw embedding matrix. Both rank by descending inner
//! product with ties broken by ascending row, so for identical persisted
//! vectors they return identical results; which one served a request is
//! logged, never surfaced as an error.

use std::sync::Arc;

use crate::{
    artifact::{ArtifactStore, IndexBackendKind},
    embedder::TextEmbedder,
    error::{Error, Result},
    index::{FlatIndex, by_score_then_row, l2_normalize},
    knowledge::KnowledgeDocument,
};

/// A retrieval strategy over persisted vectors.
pub trait SearchBackend {
    fn kind(&self) -> IndexBackendKind;

    /// The `k` best rows for a unit-norm query, best first.
    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;
}

/// Exact retrieval straight from the flat inner-product index.
pub struct ExactFlatBackend<'a> {
    index: &'a FlatIndex,
}

impl<'a> ExactFlatBackend<'a> {
    pub fn new(index: &'a FlatIndex) -> Self {
        Self { index }
    }
}

impl SearchBackend for ExactFlatBackend<'_> {
    fn kind(&self) -> IndexBackendKind {
        IndexBackendKind::Exact
    }

    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut pairs: Vec<(usize, f32)> =
            self.index.scores(query).into_iter().enumerate().collect();
        let k = k.min(pairs.len());
        if k == 0 {
            return Vec::new();
        }
        // Partial selection: move the k best to the front, then order them.
        if k < pairs.len() {
            pairs.select_nth_unstable_by(k - 1, by_score_then_row);
            pairs.truncate(k);
        }
        pairs.sort_by(by_score_then_row);
        pairs
    }
}

/// Fallback retrieval: score every row of the raw matrix and sort.
pub struct LinearScanBackend<'a> {
    matrix: &'a FlatIndex,
}

impl<'a> LinearScanBackend<'a> {
    pub fn new(matrix: &'a FlatIndex) -> Self {
        Self { matrix }
    }
}

impl SearchBackend for LinearScanBackend<'_> {
    fn kind(&self) -> IndexBackendKind {
        IndexBackendKind::Fallback
    }

    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut pairs: Vec<(usize, f32)> =
            self.matrix.scores(query).into_iter().enumerate().collect();
        pairs.sort_by(by_score_then_row);
        pairs.truncate(k);
        pairs
    }
}

/// Encodes queries and retrieves the nearest documents from the currently
/// published artifact.
pub struct VectorSearcher {
    embedder: Arc<dyn TextEmbedder>,
    store: ArtifactStore,
}

impl VectorSearcher {
    pub fn new(embedder: Arc<dyn TextEmbedder>, store: ArtifactStore) -> Self {
        Self { embedder, store }
    }

    /// Retrieve the `top_k` most similar documents for a free-text query.
    ///
    /// A query that is empty after trimming is a client error. Missing
    /// artifacts (nothing published yet) yield an empty result, not an
    /// error; `top_k` is clamped to `[1, rows]`.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument(
                "query must not be empty".into(),
            ));
        }

        let Some(artifact) = self.store.load()? else {
            return Ok(Vec::new());
        };
        if artifact.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut embedded = self.embedder.embed(&[query.to_string()])?;
        let Some(mut query_vector) = embedded.pop() else {
            return Err(Error::Embedding(
                "embedder returned no vector for the query".into(),
            ));
        };
        l2_normalize(&mut query_vector);

        let k = top_k.clamp(1, artifact.vectors.len());
        let hits = match artifact.backend {
            IndexBackendKind::Exact => {
                let backend = ExactFlatBackend::new(&artifact.vectors);
                tracing::debug!(backend = "exact", k, "serving search");
                backend.top_k(&query_vector, k)
            }
            IndexBackendKind::Fallback => {
                let backend = LinearScanBackend::new(&artifact.vectors);
                tracing::debug!(backend = "fallback", k, "serving search");
                backend.top_k(&query_vector, k)
            }
        };

        Ok(hits
            .into_iter()
            .map(|(row, _)| artifact.documents[row].clone())
            .collect())
    }
}
