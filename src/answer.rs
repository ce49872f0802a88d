//! Response composition.
//!
//! Assembles retrieved documents into a response envelope: a concatenated
//! excerpt plus source pointers. Deterministic concatenation only — no
//! generation or summarization happens here.

use serde::{Deserialize, Serialize};

use crate::{doc_id::truncate_chars, knowledge::KnowledgeDocument};

/// Maximum characters of each hit's content used as an answer fragment.
pub const FRAGMENT_LEN: usize = 800;

/// Separator between answer fragments.
pub const FRAGMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Answer text when no documents matched.
pub const NO_MATCH_ANSWER: &str = "No matching content found.";

/// A pointer back to the knowledge base entry a fragment came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub source_id: String,
    pub parent_id: String,
    pub title: String,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub hit_count: usize,
}

/// Compose a [`QueryResult`] from retrieved hits, best hit first.
pub fn compose(query: &str, hits: &[KnowledgeDocument]) -> QueryResult {
    let fragments: Vec<&str> = hits
        .iter()
        .map(|h| truncate_chars(&h.content, FRAGMENT_LEN))
        .collect();

    let answer = if fragments.is_empty() {
        NO_MATCH_ANSWER.to_string()
    } else {
        fragments.join(FRAGMENT_SEPARATOR)
    };

    let sources = hits
        .iter()
        .map(|h| SourceRef {
            source_id: h.source_id.clone(),
            parent_id: h.parent_id.clone(),
            title: h.title.clone(),
            downloads: h.metadata.downloads.clone(),
            location: h.metadata.location.clone(),
            instructions: h.metadata.instructions.clone(),
        })
        .collect::<Vec<_>>();

    QueryResult {
        query: query.to_string(),
        hit_count: sources.len(),
        answer,
        sources,
    }
}
