//! Corpus store interfaces and built-in stores.
//!
//! Ownership model:
//! - `CorpusStore` is the orchestrator-facing interface for listing documents
//!   and shapes and for writing named objects into buckets.
//! - Stores are shared by reference across provisioning, dispatch, and
//!   persistence, so implementations must be safe for concurrent callers.

use std::sync::RwLock;

use indexmap::IndexMap;

use crate::data::{DocumentEntry, ShapeGraph};
use crate::errors::MillError;
use crate::types::{BucketName, ObjectName};

/// Filesystem-backed store.
pub mod fs;

pub use fs::FsCorpusStore;

/// Named-object store holding harvested documents, shapes, and run outputs.
pub trait CorpusStore: Send + Sync {
    /// List every document object in `bucket` with its content.
    fn list_documents(&self, bucket: &str) -> Result<Vec<DocumentEntry>, MillError>;

    /// List every shape graph stored in `bucket`.
    ///
    /// The default treats every object in the bucket as a shape keyed by its
    /// object name.
    fn list_shapes(&self, bucket: &str) -> Result<Vec<ShapeGraph>, MillError> {
        Ok(self
            .list_documents(bucket)?
            .into_iter()
            .map(|entry| ShapeGraph::new(entry.id, entry.content))
            .collect())
    }

    /// Create or overwrite `name` in `bucket`.
    fn put_object(&self, bucket: &str, name: &str, content: &[u8]) -> Result<(), MillError>;

    /// Read `name` from `bucket`, or `None` when absent.
    fn get_object(&self, bucket: &str, name: &str) -> Result<Option<Vec<u8>>, MillError>;
}

/// In-memory store with insertion-ordered buckets.
///
/// Writes upsert by object name, so an overwritten object keeps its original
/// listing position.
#[derive(Default)]
pub struct InMemoryStore {
    buckets: RwLock<IndexMap<BucketName, IndexMap<ObjectName, Vec<u8>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bucket with documents.
    pub fn with_documents<I>(self, bucket: &str, documents: I) -> Self
    where
        I: IntoIterator<Item = DocumentEntry>,
    {
        {
            let mut buckets = self.buckets.write().expect("in-memory store poisoned");
            let objects = buckets.entry(bucket.to_string()).or_default();
            for entry in documents {
                objects.insert(entry.id, entry.content);
            }
        }
        self
    }

    /// Names of the objects currently stored in `bucket`.
    pub fn object_names(&self, bucket: &str) -> Vec<ObjectName> {
        let buckets = self.buckets.read().expect("in-memory store poisoned");
        buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn poisoned(bucket: &str, name: &str) -> MillError {
        MillError::Store {
            bucket: bucket.to_string(),
            object: name.to_string(),
            reason: "in-memory store lock poisoned".into(),
        }
    }
}

impl CorpusStore for InMemoryStore {
    fn list_documents(&self, bucket: &str) -> Result<Vec<DocumentEntry>, MillError> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| Self::poisoned(bucket, ""))?;
        Ok(buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(name, content)| DocumentEntry::new(name.clone(), content.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn put_object(&self, bucket: &str, name: &str, content: &[u8]) -> Result<(), MillError> {
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| Self::poisoned(bucket, name))?;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(name.to_string(), content.to_vec());
        Ok(())
    }

    fn get_object(&self, bucket: &str, name: &str) -> Result<Option<Vec<u8>>, MillError> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| Self::poisoned(bucket, name))?;
        Ok(buckets
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_object_upserts_by_name_and_keeps_position() {
        let store = InMemoryStore::new();
        store.put_object("gleaner", "a.ttl", b"first").unwrap();
        store.put_object("gleaner", "b.ttl", b"other").unwrap();
        store.put_object("gleaner", "a.ttl", b"second").unwrap();

        assert_eq!(store.object_names("gleaner"), vec!["a.ttl", "b.ttl"]);
        assert_eq!(
            store.get_object("gleaner", "a.ttl").unwrap().as_deref(),
            Some(&b"second"[..])
        );
    }

    #[test]
    fn list_shapes_defaults_to_every_object_in_bucket() {
        let store = InMemoryStore::new().with_documents(
            "gleaner",
            vec![
                DocumentEntry::new("s1.ttl", "shape one"),
                DocumentEntry::new("s2.ttl", "shape two"),
            ],
        );
        let shapes = store.list_shapes("gleaner").unwrap();
        assert_eq!(
            shapes,
            vec![
                ShapeGraph::new("s1.ttl", "shape one"),
                ShapeGraph::new("s2.ttl", "shape two"),
            ]
        );
        assert!(store.list_shapes("missing").unwrap().is_empty());
    }

    #[test]
    fn missing_object_reads_as_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_object("b", "nope").unwrap(), None);
    }
}
