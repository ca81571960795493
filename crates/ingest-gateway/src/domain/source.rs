//! Registered event sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory document as stored, keyed by `alertsourcekey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Authorization key; also the lookup key.
    pub alertsourcekey: String,
    /// Display name.
    pub alertsourcename: String,
}

impl SourceDocument {
    /// Create a document.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            alertsourcekey: key.into(),
            alertsourcename: name.into(),
        }
    }
}

/// A registered event producer.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Token the source presents.
    pub token: String,
    /// Secret bound to the token.
    pub authorization_key: String,
    /// Label used in logs.
    pub name: String,
}

impl SourceRecord {
    /// Build the record found for `token`.
    pub fn from_document(token: impl Into<String>, document: SourceDocument) -> Self {
        Self {
            token: token.into(),
            authorization_key: document.alertsourcekey,
            name: document.alertsourcename,
        }
    }
}

// Keeps the token and key out of logs.
impl fmt::Debug for SourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRecord")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
