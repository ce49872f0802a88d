//! Text embedding backends.
//!
//! [`TextEmbedder`] is the one seam between the search core and any model:
//! a batch of texts in, fixed-dimension vectors out. Two implementations:
//!
//! - [`MiniLmEmbedder`] wraps fastembed's AllMiniLML6V2 sentence model
//!   (384 dimensions). Loading the model is expensive, so it happens at
//!   most once per instance behind a `OnceCell` barrier; concurrent first
//!   calls block on the same initialization instead of racing.
//! - [`HashingEmbedder`] produces deterministic feature-hashed bag-of-words
//!   vectors. It needs no model download, which makes it the offline and
//!   test backend; texts sharing tokens score positive similarity.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Mutex,
};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use once_cell::sync::OnceCell;

use crate::error::{Error, Result};

/// Embedding dimensionality shared by both backends (AllMiniLML6V2).
pub const EMBEDDING_DIM: usize = 384;

/// A capability that maps text to fixed-dimension vectors.
///
/// Implementations must be safe to call concurrently once initialized and
/// must not have side effects beyond model warm-up.
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The fixed dimension of produced vectors.
    fn dimension(&self) -> usize;

    /// A short label for logs and build summaries.
    fn name(&self) -> &'static str;
}

/// Sentence embedder backed by fastembed's AllMiniLML6V2 model.
pub struct MiniLmEmbedder {
    // fastembed's embed() takes &mut self, so the loaded model sits behind
    // a Mutex; the OnceCell is the single-initialization barrier.
    model: OnceCell<Mutex<TextEmbedding>>,
}

impl MiniLmEmbedder {
    /// Create an embedder without loading the model. The first `embed`
    /// call (or an explicit [`Self::warm_up`]) loads it.
    pub fn new() -> Self {
        Self {
            model: OnceCell::new(),
        }
    }

    /// Returns `true` once the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Force model initialization ahead of the first request.
    pub fn warm_up(&self) -> Result<()> {
        self.ensure_loaded().map(|_| ())
    }

    fn ensure_loaded(&self) -> Result<&Mutex<TextEmbedding>> {
        self.model.get_or_try_init(|| {
            tracing::info!("loading AllMiniLML6V2 embedding model");
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                    .with_show_download_progress(false),
            )
            .map_err(|e| {
                Error::Embedding(format!(
                    "failed to initialize embedding model: {e}"
                ))
            })?;
            Ok(Mutex::new(model))
        })
    }
}

impl Default for MiniLmEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEmbedder for MiniLmEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.ensure_loaded()?;
        let mut guard = model.lock().map_err(|_| {
            Error::Embedding("embedding model lock poisoned".into())
        })?;

        let embeddings = guard
            .embed(texts.to_vec(), None)
            .map_err(|e| Error::Embedding(format!("embed failed: {e}")))?;

        for v in &embeddings {
            if v.len() != EMBEDDING_DIM {
                return Err(Error::Embedding(format!(
                    "unexpected embedding dimension {} (wanted {EMBEDDING_DIM})",
                    v.len()
                )));
            }
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &'static str {
        "minilm"
    }
}

/// Deterministic feature-hashing embedder.
///
/// Each lowercased whitespace token hashes into one of the 384 buckets
/// with a sign derived from the same hash; the result is L2-normalized.
/// Identical texts always yield identical vectors.
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn embed_one(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % EMBEDDING_DIM as u64) as usize;
            let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEmbedder for HashingEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn hashing_is_deterministic() {
        let e = HashingEmbedder::new();
        let a = e.embed(&["renew my passport".to_string()]).unwrap();
        let b = e.embed(&["renew my passport".to_string()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hashing_produces_unit_vectors() {
        let e = HashingEmbedder::new();
        let vs = e.embed(&["tax filing deadline".to_string()]).unwrap();
        let norm: f32 = vs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(vs[0].len(), EMBEDDING_DIM);
    }

    #[test]
    fn shared_tokens_score_higher_than_disjoint() {
        let e = HashingEmbedder::new();
        let vs = e
            .embed(&[
                "passport renewal steps".to_string(),
                "how do I renew my passport".to_string(),
                "tax filing deadline".to_string(),
            ])
            .unwrap();
        let related = dot(&vs[0], &vs[1]);
        let unrelated = dot(&vs[0], &vs[2]);
        assert!(
            related > unrelated,
            "expected passport texts ({related}) to beat tax text ({unrelated})"
        );
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let e = HashingEmbedder::new();
        let vs = e.embed(&[String::new()]).unwrap();
        assert!(vs[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn tokenization_is_case_insensitive() {
        let e = HashingEmbedder::new();
        let vs = e
            .embed(&["Passport Renewal".to_string(), "passport renewal".to_string()])
            .unwrap();
        assert_eq!(vs[0], vs[1]);
    }

    #[test]
    fn minilm_starts_unloaded() {
        let e = MiniLmEmbedder::new();
        assert!(!e.is_loaded());
        assert_eq!(e.dimension(), EMBEDDING_DIM);
    }
}
