//! Document state management for the OpenAPI LSP.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};
use tracing::debug;

use crate::structure::{self, Forest};

use super::text::{BufferError, TextBuffer};

/// Failure of a document store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("unknown document: {0}")]
    UnknownDocument(Url),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Cached structural parse of a document.
#[derive(Debug, Clone, Default)]
pub enum ForestState {
    /// Not parsed since the document was opened or last edited.
    #[default]
    NotParsed,
    Parsed(Arc<Forest>),
}

/// State for a single open document.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub buffer: TextBuffer,
    /// Document version from the client.
    pub version: i32,
    pub forest: ForestState,
}

impl DocumentState {
    pub fn new(source: String, version: i32) -> Self {
        Self {
            buffer: TextBuffer::new(source),
            version,
            forest: ForestState::NotParsed,
        }
    }

    /// Apply a batch of edits in order.
    ///
    /// Edits are applied to a working copy which replaces the buffer only if
    /// all of them succeed. The cached forest is dropped on success.
    pub fn apply_changes(
        &mut self,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<(), BufferError> {
        let mut buffer = self.buffer.clone();
        for change in changes {
            buffer.apply_edit(change)?;
        }

        self.buffer = buffer;
        self.version = version;
        self.forest = ForestState::NotParsed;
        Ok(())
    }

    /// The forest for the current content, parsing it first if needed.
    pub fn forest(&mut self) -> Arc<Forest> {
        if let ForestState::Parsed(forest) = &self.forest {
            return Arc::clone(forest);
        }

        let source = String::from_utf8_lossy(self.buffer.bytes());
        let forest = Arc::new(structure::parse(&source));
        debug!(version = self.version, lines = forest.len(), "parsed document");
        self.forest = ForestState::Parsed(Arc::clone(&forest));
        forest
    }
}

/// Thread-safe storage for open documents.
///
/// Each document's buffer and forest are only touched while holding its
/// map entry, so an edit and a re-parse of the same document never overlap.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, DocumentState>,
}

impl DocumentStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Open (or re-open) a document with the given source text.
    pub fn open(&self, uri: Url, source: String, version: i32) {
        self.documents.insert(uri, DocumentState::new(source, version));
    }

    /// Close a document.
    pub fn close(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    /// Apply an ordered batch of edits to an open document.
    pub fn change(
        &self,
        uri: &Url,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<(), DocumentError> {
        let mut doc = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))?;
        doc.apply_changes(changes, version)?;
        Ok(())
    }

    /// Get the up-to-date forest of an open document.
    pub fn forest(&self, uri: &Url) -> Result<Arc<Forest>, DocumentError> {
        let mut doc = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))?;
        Ok(doc.forest())
    }

    /// Snapshot of a document's current content.
    pub fn text(&self, uri: &Url) -> Option<String> {
        self.documents
            .get(uri)
            .map(|doc| String::from_utf8_lossy(doc.buffer.bytes()).into_owned())
    }

    pub fn is_open(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }
}
