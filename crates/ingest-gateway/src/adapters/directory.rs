//! In-memory source directory.
//!
//! Documents are kept as raw JSON so that a record with the wrong shape is
//! reported at lookup time, the way a document store would.

use crate::domain::source::{SourceDocument, SourceRecord};
use crate::ports::directory::{DirectoryClient, DirectoryError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Field every document is indexed by.
pub const KEY_FIELD: &str = "alertsourcekey";

/// Concurrent in-memory directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    documents: DashMap<String, Value>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from raw documents. Documents without a string
    /// `alertsourcekey` cannot be indexed and are skipped.
    pub fn from_documents(documents: impl IntoIterator<Item = Value>) -> Self {
        let directory = Self::new();
        for document in documents {
            if !directory.insert_raw(document) {
                warn!("Skipping directory document without a string '{}'", KEY_FIELD);
            }
        }
        directory
    }

    /// Load a JSON array of documents from `path`.
    pub fn from_json_file(path: &Path) -> Result<Self, DirectoryError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DirectoryError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let documents: Vec<Value> = serde_json::from_str(&contents).map_err(|e| {
            DirectoryError::Unavailable(format!("cannot parse {}: {e}", path.display()))
        })?;

        let directory = Self::from_documents(documents);
        info!(
            path = %path.display(),
            sources = directory.len(),
            "Loaded source directory"
        );
        Ok(directory)
    }

    /// Register a well-formed source.
    pub fn insert(&self, document: SourceDocument) {
        let key = document.alertsourcekey.clone();
        let value = serde_json::json!({
            "alertsourcekey": document.alertsourcekey,
            "alertsourcename": document.alertsourcename,
        });
        self.documents.insert(key, value);
    }

    /// Store a raw document under its `alertsourcekey`.
    ///
    /// Returns `false` when the document has no string key.
    pub fn insert_raw(&self, document: Value) -> bool {
        let Some(key) = document.get(KEY_FIELD).and_then(Value::as_str) else {
            return false;
        };
        self.documents.insert(key.to_string(), document);
        true
    }

    /// Remove a source.
    pub fn remove(&self, key: &str) -> bool {
        self.documents.remove(key).is_some()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn lookup(&self, token: &str) -> Result<Option<SourceRecord>, DirectoryError> {
        if token.is_empty() {
            return Ok(None);
        }

        // Clone out so the shard lock is not held while decoding.
        let Some(document) = self.documents.get(token).map(|entry| entry.value().clone())
        else {
            debug!("No directory record for presented token");
            return Ok(None);
        };

        let document: SourceDocument = serde_json::from_value(document)
            .map_err(|e| DirectoryError::MalformedRecord(e.to_string()))?;

        Ok(Some(SourceRecord::from_document(token, document)))
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        Ok(())
    }

    async fn close(&self) {
        debug!(sources = self.documents.len(), "Closing in-memory directory");
    }
}
