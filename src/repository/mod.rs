//! Document repository: canonical document store, inverted term index, and
//! the snapshot-pattern reader primitive.

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ClassifiedError, ErrorKind};

/// A single indexed document. Immutable after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-assigned or generated identifier.
    pub doc_id: String,
    /// Full text content.
    pub content: String,
    /// Display name.
    pub name: String,
    /// Source path or URI, opaque to the repository.
    pub path: String,
    /// Arbitrary caller metadata.
    pub metadata: HashMap<String, String>,
}

/// Aggregate repository statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryStats {
    /// Number of documents stored.
    pub documents: usize,
    /// Number of distinct terms in the index.
    pub terms: usize,
}

/// Errors returned by the document repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested document id has no corresponding document.
    #[error("document not found: {doc_id}")]
    NotFound {
        /// The id that failed to resolve.
        doc_id: String,
    },
}

impl ClassifiedError for RepositoryError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NotFound
    }
}

struct Inner {
    documents: HashMap<String, Document>,
    index: HashMap<String, HashSet<String>>,
    /// First-insertion ordinal per doc_id, used to break score ties in
    /// insertion order without relying on hash-map iteration order.
    insertion_order: HashMap<String, u64>,
}

/// Canonical store of `{doc_id -> Document}` plus an inverted term index,
/// guarded by a single reader-writer lock.
///
/// The central primitive is [`Self::get_index_snapshot`]: it holds the lock
/// only long enough to copy the index entries for the requested terms into a
/// fresh owned map. All scoring against that snapshot then proceeds without
/// holding the lock, so concurrent queries do not serialize on each other —
/// they only ever contend, briefly, with writers taking their own snapshot.
pub struct DocumentRepository {
    inner: RwLock<Inner>,
    next_doc_ordinal: AtomicU64,
}

impl Default for DocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                documents: HashMap::new(),
                index: HashMap::new(),
                insertion_order: HashMap::new(),
            }),
            next_doc_ordinal: AtomicU64::new(0),
        }
    }

    /// Inserts a document and indexes its content. Overwrites any existing
    /// document with the same id along with its index entries.
    pub fn add_document(&self, doc: Document) {
        let terms = tokenize(&doc.content);
        let doc_id = doc.doc_id.clone();

        let mut inner = self.inner.write();
        inner.documents.insert(doc_id.clone(), doc);
        for term in terms {
            inner.index.entry(term).or_default().insert(doc_id.clone());
        }
        if !inner.insertion_order.contains_key(&doc_id) {
            let ordinal = self.next_doc_ordinal.fetch_add(1, Ordering::Relaxed);
            inner.insertion_order.insert(doc_id, ordinal);
        }
    }

    /// The ordinal assigned to `doc_id` at its first insertion, used to break
    /// score ties in a stable, deterministic order. `None` if never inserted.
    pub fn document_ordinal(&self, doc_id: &str) -> Option<u64> {
        self.inner.read().insertion_order.get(doc_id).copied()
    }

    /// Adds a single `(term, doc_id)` posting without touching the document
    /// store. Used when an index needs to be extended independently of
    /// `add_document` (e.g. incremental reindexing).
    pub fn index_term(&self, term: &str, doc_id: &str) {
        let mut inner = self.inner.write();
        inner
            .index
            .entry(term.to_lowercase())
            .or_default()
            .insert(doc_id.to_string());
    }

    /// Looks up a single document.
    pub fn get_document(&self, doc_id: &str) -> Option<Document> {
        self.inner.read().documents.get(doc_id).cloned()
    }

    /// Looks up several documents by id. Missing ids are silently skipped —
    /// the returned list may be shorter than `ids`.
    pub fn get_documents_by_ids(&self, ids: &[String]) -> Vec<Document> {
        let inner = self.inner.read();
        ids.iter()
            .filter_map(|id| inner.documents.get(id).cloned())
            .collect()
    }

    /// Removes a document and prunes it from every term posting list.
    pub fn delete_document(&self, doc_id: &str) -> bool {
        let mut inner = self.inner.write();
        let removed = inner.documents.remove(doc_id).is_some();
        if removed {
            inner.index.retain(|_, postings| {
                postings.remove(doc_id);
                !postings.is_empty()
            });
        }
        removed
    }

    /// All document ids currently stored, in no particular order.
    pub fn document_ids(&self) -> Vec<String> {
        self.inner.read().documents.keys().cloned().collect()
    }

    /// The central snapshot-pattern primitive: copies only the index entries
    /// for `terms` into a fresh map, under a single short critical section,
    /// then releases the lock. The returned map is a point-in-time copy —
    /// subsequent writes never mutate it.
    pub fn get_index_snapshot(&self, terms: &[String]) -> HashMap<String, Vec<String>> {
        let inner = self.inner.read();
        terms
            .iter()
            .filter_map(|term| {
                inner
                    .index
                    .get(term)
                    .map(|doc_ids| (term.clone(), doc_ids.iter().cloned().collect()))
            })
            .collect()
    }

    /// Aggregate statistics.
    pub fn get_stats(&self) -> RepositoryStats {
        let inner = self.inner.read();
        RepositoryStats {
            documents: inner.documents.len(),
            terms: inner.index.len(),
        }
    }
}

/// Lowercased whitespace tokenization, shared by indexing and query parsing.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
