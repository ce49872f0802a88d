//! Knowledge base snapshot types and the corpus flattener.
//!
//! A snapshot is a tree of organizations, each with sub-topics, each with
//! question/answer entries. Text fields are multilingual maps with an "en"
//! fallback. Flattening produces one independently retrievable
//! [`KnowledgeDocument`] per question/answer entry; no references into the
//! tree survive, so the snapshot can be rebuilt or dropped freely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::doc_id::DocumentId;

/// Separator joining organization, topic, question and answer into the
/// embeddable `content` string.
pub const CONTENT_SEPARATOR: &str = " | ";

/// A text field that is either a plain string or a language → text map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Text {
    /// Resolve to English, falling back to any available translation.
    pub fn resolve(&self) -> &str {
        match self {
            Text::Plain(s) => s,
            Text::Localized(map) => map
                .get("en")
                .or_else(|| map.values().next())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }
}

impl Default for Text {
    fn default() -> Self {
        Text::Plain(String::new())
    }
}

/// The full knowledge base snapshot as deserialized from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: Text,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: Text,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// A single question/answer entry, the leaf unit of the knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub question: Text,
    #[serde(default)]
    pub answer: Text,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Auxiliary fields carried alongside a flattened document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocMetadata {
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// A flat, independently retrievable document unit.
///
/// `content` is the unit of embedding: organization name, topic name,
/// question and answer joined with [`CONTENT_SEPARATOR`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeDocument {
    pub doc_id: String,
    pub source_id: String,
    pub parent_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: DocMetadata,
}

/// Flatten a knowledge base snapshot into a sequence of documents.
///
/// Emits one document per question/answer entry, in tree order. A document
/// with all four source fields empty still appears (with empty content);
/// the index builder only short-circuits when the whole corpus is empty.
pub fn flatten(kb: &KnowledgeBase) -> Vec<KnowledgeDocument> {
    let mut docs = Vec::new();
    for org in &kb.organizations {
        let org_name = org.name.resolve();
        for topic in &org.topics {
            let topic_name = topic.name.resolve();
            for entry in &topic.entries {
                let question = entry.question.resolve();
                let answer = entry.answer.resolve();
                let content = [org_name, topic_name, question, answer]
                    .join(CONTENT_SEPARATOR);
                let id = DocumentId::new(&org.id, &topic.id, question);
                docs.push(KnowledgeDocument {
                    doc_id: id.readable,
                    source_id: org.id.clone(),
                    parent_id: topic.id.clone(),
                    title: question.to_string(),
                    content,
                    metadata: DocMetadata {
                        downloads: entry.downloads.clone(),
                        location: entry.location.clone(),
                        instructions: entry.instructions.clone(),
                    },
                });
            }
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localized(en: &str, si: &str) -> Text {
        let mut map = BTreeMap::new();
        map.insert("en".to_string(), en.to_string());
        map.insert("si".to_string(), si.to_string());
        Text::Localized(map)
    }

    fn sample_kb() -> KnowledgeBase {
        KnowledgeBase {
            organizations: vec![Organization {
                id: "immigration".into(),
                name: localized("Department of Immigration", "ආගමන"),
                topics: vec![Topic {
                    id: "passports".into(),
                    name: Text::Plain("Passports".into()),
                    entries: vec![
                        Entry {
                            question: Text::Plain(
                                "How do I renew my passport?".into(),
                            ),
                            answer: Text::Plain(
                                "Submit form K and your old passport.".into(),
                            ),
                            downloads: vec!["form-k.pdf".into()],
                            location: Some("Colombo HQ".into()),
                            instructions: None,
                        },
                        Entry {
                            question: Text::Plain(
                                "What is the passport fee?".into(),
                            ),
                            answer: Text::Plain("LKR 3,500.".into()),
                            ..Default::default()
                        },
                    ],
                }],
            }],
        }
    }

    #[test]
    fn one_document_per_entry() {
        let docs = flatten(&sample_kb());
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn content_joins_all_four_fields() {
        let docs = flatten(&sample_kb());
        assert_eq!(
            docs[0].content,
            "Department of Immigration | Passports | \
             How do I renew my passport? | Submit form K and your old passport."
        );
    }

    #[test]
    fn metadata_carried_through() {
        let docs = flatten(&sample_kb());
        assert_eq!(docs[0].metadata.downloads, vec!["form-k.pdf"]);
        assert_eq!(docs[0].metadata.location.as_deref(), Some("Colombo HQ"));
        assert!(docs[0].metadata.instructions.is_none());
    }

    #[test]
    fn localized_text_prefers_english() {
        let kb = sample_kb();
        assert_eq!(
            kb.organizations[0].name.resolve(),
            "Department of Immigration"
        );
    }

    #[test]
    fn localized_text_falls_back_without_english() {
        let mut map = BTreeMap::new();
        map.insert("si".to_string(), "ආගමන".to_string());
        assert_eq!(Text::Localized(map).resolve(), "ආගමන");
    }

    #[test]
    fn all_empty_entry_still_emitted() {
        let kb = KnowledgeBase {
            organizations: vec![Organization {
                id: "o".into(),
                name: Text::Plain(String::new()),
                topics: vec![Topic {
                    id: "t".into(),
                    name: Text::Plain(String::new()),
                    entries: vec![Entry::default()],
                }],
            }],
        };
        let docs = flatten(&kb);
        assert_eq!(docs.len(), 1);
        // Only separators remain when every field is empty.
        assert_eq!(docs[0].content, " |  |  | ");
    }

    #[test]
    fn distinct_entries_get_distinct_ids() {
        let docs = flatten(&sample_kb());
        assert_ne!(docs[0].doc_id, docs[1].doc_id);
    }

    #[test]
    fn snapshot_roundtrips_through_json() {
        let kb = sample_kb();
        let json = serde_json::to_string(&kb).unwrap();
        let back: KnowledgeBase = serde_json::from_str(&json).unwrap();
        assert_eq!(flatten(&kb), flatten(&back));
    }
}
