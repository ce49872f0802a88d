//! civiq - semantic search and recommendations for a citizen-services
//! knowledge base.
//!
//! civiq flattens a hierarchical multilingual snapshot of organizations,
//! topics, and question/answer entries into a flat corpus, embeds it with
//! [fastembed](https://github.com/Anush008/fastembed-rs), and serves
//! nearest-neighbor retrieval from an atomically published on-disk index.
//! A separate scorer ranks promotional candidates against derived user
//! segments and interests.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use civiq::{
//!     ArtifactStore, DataDir, HashingEmbedder, IndexBackendKind,
//!     IndexBuilder, VectorSearcher, answer, knowledge,
//! };
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = ArtifactStore::new(data_dir.artifacts_dir().unwrap());
//! let embedder = Arc::new(HashingEmbedder::new());
//!
//! let snapshot = std::fs::read_to_string("kb.json").unwrap();
//! let kb: knowledge::KnowledgeBase =
//!     serde_json::from_str(&snapshot).unwrap();
//! let docs = knowledge::flatten(&kb);
//!
//! let builder = IndexBuilder::new(
//!     embedder.clone(),
//!     store.clone(),
//!     IndexBackendKind::Exact,
//! );
//! builder.build(&docs).unwrap();
//!
//! let searcher = VectorSearcher::new(embedder, store);
//! let hits = searcher.search("how do I renew my passport", 5).unwrap();
//! let result = answer::compose("how do I renew my passport", &hits);
//! println!("{}", result.answer);
//! ```

pub mod answer;
pub mod artifact;
pub mod builder;
pub mod cli;
pub mod data_dir;
pub mod doc_id;
pub mod embedder;
pub mod error;
pub mod index;
pub mod knowledge;
pub mod recommend;
pub mod searcher;
pub mod segment;

pub use artifact::{ArtifactStore, IndexBackendKind, LoadedArtifact};
pub use builder::{BuildSummary, IndexBuilder};
pub use data_dir::DataDir;
pub use doc_id::DocumentId;
pub use embedder::{HashingEmbedder, MiniLmEmbedder, TextEmbedder};
pub use error::{Error, Result};
pub use knowledge::{KnowledgeBase, KnowledgeDocument};
pub use searcher::VectorSearcher;
