use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// Length of the human-readable title prefix kept in the identity string.
pub const TITLE_PREFIX_LEN: usize = 80;

/// A stable document identifier derived from (source_id, parent_id, title).
///
/// The readable form keeps a truncated title prefix for operators; because
/// two questions can share the first 80 characters of their titles, a short
/// hex hash of the full triple is appended to keep identities distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId {
    /// The numeric ID, hashed over the full (source, parent, title) triple.
    pub numeric: u64,
    /// The readable form, e.g. `passports::renewal::How do I renew#a1b2c3`.
    pub readable: String,
}

impl DocumentId {
    pub fn new(source_id: &str, parent_id: &str, title: &str) -> Self {
        let numeric = Self::hash_triple(source_id, parent_id, title);
        let prefix = truncate_chars(title, TITLE_PREFIX_LEN);
        let readable = format!(
            "{source_id}::{parent_id}::{prefix}#{}",
            Self::short_hex(numeric, 6)
        );
        Self { numeric, readable }
    }

    fn hash_triple(source_id: &str, parent_id: &str, title: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        source_id.hash(&mut hasher);
        parent_id.hash(&mut hasher);
        title.hash(&mut hasher);
        hasher.finish()
    }

    fn short_hex(value: u64, len: usize) -> String {
        let full = format!("{value:016x}");
        full[..len].to_string()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.readable)
    }
}

/// Truncate a string to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
