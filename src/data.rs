use serde::Serialize;

use crate::types::{DocumentId, ShapeKey};

/// Raw response bytes from the validation service for one pair.
pub type ValidationResult = Vec<u8>;

/// One harvested data graph plus its source identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentEntry {
    /// Unique identifier within a listing (URL or object name).
    pub id: DocumentId,
    /// Serialized graph document.
    pub content: Vec<u8>,
}

impl DocumentEntry {
    pub fn new(id: impl Into<DocumentId>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// A provisioned validation schema keyed by the last segment of its locator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeGraph {
    pub key: ShapeKey,
    pub content: Vec<u8>,
}

impl ShapeGraph {
    pub fn new(key: impl Into<ShapeKey>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
        }
    }
}

/// Where a shape locator is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// Has both a scheme and a host; fetched over HTTP.
    Remote,
    /// Anything else; read from the local filesystem.
    Local,
}
