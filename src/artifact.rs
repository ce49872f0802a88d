//! Persisted index artifacts.
//!
//! An artifact is a vectors/metadata pair that must only ever be observed
//! together. Each rebuild writes a fresh generation directory and then
//! atomically repoints the `CURRENT` file at it, so in-flight readers keep
//! the generation they resolved and never see a torn pair:
//!
//! ```text
//! artifacts/
//!   CURRENT              -> "gen-000003"
//!   gen-000003/
//!     metadata.json      document table, in index row order
//!     index.flat         exact backend vectors, or
//!     embeddings.mat     fallback raw embedding matrix
//! ```

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    index::FlatIndex,
    knowledge::KnowledgeDocument,
};

const CURRENT_FILE: &str = "CURRENT";
const METADATA_FILE: &str = "metadata.json";
const INDEX_FILE: &str = "index.flat";
const MATRIX_FILE: &str = "embeddings.mat";

/// Which retrieval strategy the persisted vectors were built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackendKind {
    /// Flat exact inner-product index.
    Exact,
    /// Raw embedding matrix served by linear scan.
    Fallback,
}

impl IndexBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexBackendKind::Exact => "exact",
            IndexBackendKind::Fallback => "fallback",
        }
    }

    fn vector_file(self) -> &'static str {
        match self {
            IndexBackendKind::Exact => INDEX_FILE,
            IndexBackendKind::Fallback => MATRIX_FILE,
        }
    }
}

/// A fully resolved vectors/metadata pair.
#[derive(Debug)]
pub struct LoadedArtifact {
    pub vectors: FlatIndex,
    pub backend: IndexBackendKind,
    pub documents: Vec<KnowledgeDocument>,
}

/// Stores and resolves published index generations.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Publish a new generation and atomically make it current.
    ///
    /// The vectors and metadata land in a fresh directory which is fully
    /// written and synced before `CURRENT` is swapped; stale generations
    /// are pruned best-effort afterwards.
    pub fn publish(
        &self,
        vectors: &FlatIndex,
        backend: IndexBackendKind,
        documents: &[KnowledgeDocument],
    ) -> Result<String> {
        if vectors.len() != documents.len() {
            return Err(Error::CorruptArtifact(format!(
                "refusing to publish {} vectors against {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        fs::create_dir_all(&self.root)?;
        let generation = format!("gen-{:06}", self.next_sequence()?);
        let gen_dir = self.root.join(&generation);
        fs::create_dir_all(&gen_dir)?;

        write_synced(
            &gen_dir.join(METADATA_FILE),
            &serde_json::to_vec(documents)?,
        )?;
        write_synced(&gen_dir.join(backend.vector_file()), &vectors.encode())?;

        // Swap the pointer: temp write + rename is the atomic step.
        let tmp = self.root.join(format!("{CURRENT_FILE}.tmp"));
        write_synced(&tmp, generation.as_bytes())?;
        fs::rename(&tmp, self.root.join(CURRENT_FILE))?;

        self.prune(&generation);

        tracing::info!(
            generation,
            documents = documents.len(),
            backend = backend.as_str(),
            "published index artifact"
        );
        Ok(generation)
    }

    /// Resolve the current generation, if any has ever been published.
    ///
    /// Returns `Ok(None)` when nothing is published; a published pair that
    /// is internally inconsistent fails closed with `CorruptArtifact`.
    pub fn load(&self) -> Result<Option<LoadedArtifact>> {
        let Some(generation) = self.current_generation()? else {
            return Ok(None);
        };
        let gen_dir = self.root.join(&generation);

        let metadata_path = gen_dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Err(Error::CorruptArtifact(format!(
                "generation {generation} is missing its metadata table"
            )));
        }
        let documents: Vec<KnowledgeDocument> =
            serde_json::from_slice(&fs::read(&metadata_path)?)?;

        let (bytes, backend) = if gen_dir.join(INDEX_FILE).exists() {
            (fs::read(gen_dir.join(INDEX_FILE))?, IndexBackendKind::Exact)
        } else if gen_dir.join(MATRIX_FILE).exists() {
            (
                fs::read(gen_dir.join(MATRIX_FILE))?,
                IndexBackendKind::Fallback,
            )
        } else {
            return Err(Error::CorruptArtifact(format!(
                "generation {generation} has metadata but no vector file"
            )));
        };

        let vectors = FlatIndex::decode(&bytes)?;
        if vectors.len() != documents.len() {
            return Err(Error::CorruptArtifact(format!(
                "generation {generation} pairs {} vectors with {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        Ok(Some(LoadedArtifact {
            vectors,
            backend,
            documents,
        }))
    }

    /// The name of the live generation, if one is published.
    pub fn current_generation(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.root.join(CURRENT_FILE)) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn next_sequence(&self) -> Result<u64> {
        let mut max = 0u64;
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                if let Some(seq) = name
                    .to_str()
                    .and_then(|n| n.strip_prefix("gen-"))
                    .and_then(|n| n.parse::<u64>().ok())
                {
                    max = max.max(seq);
                }
            }
        }
        Ok(max + 1)
    }

    /// Remove generation directories other than `keep`. Best effort: a
    /// reader may still hold an old generation open, and a failed removal
    /// is retried on the next publish.
    fn prune(&self, keep: &str) {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with("gen-") && name != keep {
                let _ = fs::remove_dir_all(entry.path());
            }
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::DocMetadata;

    fn doc(n: usize) -> KnowledgeDocument {
        KnowledgeDocument {
            doc_id: format!("org::topic::q{n}#abc{n}"),
            source_id: "org".into(),
            parent_id: "topic".into(),
            title: format!("q{n}"),
            content: format!("content {n}"),
            metadata: DocMetadata::default(),
        }
    }

    fn two_rows() -> FlatIndex {
        FlatIndex::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 2).unwrap()
    }

    #[test]
    fn load_before_publish_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        assert!(store.load().unwrap().is_none());
        assert!(store.current_generation().unwrap().is_none());
    }

    #[test]
    fn publish_then_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        let generation = store
            .publish(&two_rows(), IndexBackendKind::Exact, &[doc(0), doc(1)])
            .unwrap();
        assert_eq!(generation, "gen-000001");

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.backend, IndexBackendKind::Exact);
        assert_eq!(loaded.vectors.len(), 2);
        assert_eq!(loaded.documents[1].title, "q1");
    }

    #[test]
    fn fallback_backend_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        store
            .publish(&two_rows(), IndexBackendKind::Fallback, &[doc(0), doc(1)])
            .unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.backend, IndexBackendKind::Fallback);
    }

    #[test]
    fn republish_advances_generation_and_prunes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        store
            .publish(&two_rows(), IndexBackendKind::Exact, &[doc(0), doc(1)])
            .unwrap();
        let second = store
            .publish(&two_rows(), IndexBackendKind::Exact, &[doc(2), doc(3)])
            .unwrap();

        assert_eq!(second, "gen-000002");
        assert_eq!(store.current_generation().unwrap().unwrap(), second);
        assert!(!tmp.path().join("gen-000001").exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.documents[0].title, "q2");
    }

    #[test]
    fn publish_rejects_mismatched_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        let err = store
            .publish(&two_rows(), IndexBackendKind::Exact, &[doc(0)])
            .unwrap_err();
        assert!(matches!(err, Error::CorruptArtifact(_)));
    }

    #[test]
    fn load_fails_closed_on_length_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        store
            .publish(&two_rows(), IndexBackendKind::Exact, &[doc(0), doc(1)])
            .unwrap();

        // Corrupt the pair by rewriting the metadata with one entry.
        let gen_dir = tmp.path().join("gen-000001");
        std::fs::write(
            gen_dir.join("metadata.json"),
            serde_json::to_vec(&[doc(0)]).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            store.load().unwrap_err(),
            Error::CorruptArtifact(_)
        ));
    }

    #[test]
    fn load_fails_closed_on_missing_vector_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        store
            .publish(&two_rows(), IndexBackendKind::Exact, &[doc(0), doc(1)])
            .unwrap();
        std::fs::remove_file(tmp.path().join("gen-000001").join("index.flat"))
            .unwrap();

        assert!(matches!(
            store.load().unwrap_err(),
            Error::CorruptArtifact(_)
        ));
    }

    #[test]
    fn empty_artifact_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        store
            .publish(&FlatIndex::empty(384), IndexBackendKind::Exact, &[])
            .unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.vectors.is_empty());
        assert!(loaded.documents.is_empty());
    }
}
