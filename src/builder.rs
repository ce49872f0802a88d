//! Index rebuild pipeline.
//!
//! A rebuild is a wholesale batch operation over the entire corpus: embed
//! every document's content, normalize, lay the vectors into a flat index,
//! and publish vectors + metadata atomically. There is no incremental
//! mutation path. Rebuilds are serialized single-flight: a build attempted
//! while another holds the lock fails fast with `RebuildInProgress` rather
//! than racing on the artifact location.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::{
    artifact::{ArtifactStore, IndexBackendKind},
    embedder::TextEmbedder,
    error::{Error, Result},
    index::FlatIndex,
    knowledge::KnowledgeDocument,
};

/// The result of a completed rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub document_count: usize,
    pub backend: &'static str,
}

pub struct IndexBuilder {
    embedder: Arc<dyn TextEmbedder>,
    store: ArtifactStore,
    backend: IndexBackendKind,
    rebuild_lock: Mutex<()>,
}

impl IndexBuilder {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        store: ArtifactStore,
        backend: IndexBackendKind,
    ) -> Self {
        Self {
            embedder,
            store,
            backend,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Rebuild and publish the index from a flattened corpus.
    ///
    /// An empty corpus publishes an empty artifact (searches then return
    /// empty results, not errors). Documents with empty content are
    /// embedded like any other; their zero-norm vectors are kept as
    /// deterministic zero rows.
    pub fn build(
        &self,
        documents: &[KnowledgeDocument],
    ) -> Result<BuildSummary> {
        let _guard = self
            .rebuild_lock
            .try_lock()
            .map_err(|_| Error::RebuildInProgress)?;

        let dimension = self.embedder.dimension();

        if documents.is_empty() {
            self.store
                .publish(&FlatIndex::empty(dimension), self.backend, &[])?;
            return Ok(BuildSummary {
                document_count: 0,
                backend: self.backend.as_str(),
            });
        }

        let texts: Vec<String> =
            documents.iter().map(|d| d.content.clone()).collect();

        tracing::info!(
            documents = documents.len(),
            embedder = self.embedder.name(),
            "embedding corpus"
        );
        let embeddings = self.embedder.embed(&texts)?;
        if embeddings.len() != documents.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let index = FlatIndex::from_rows(embeddings, dimension)?;
        self.store.publish(&index, self.backend, documents)?;

        Ok(BuildSummary {
            document_count: documents.len(),
            backend: self.backend.as_str(),
        })
    }
}
