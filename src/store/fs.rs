use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;
use walkdir::WalkDir;

use crate::constants::store::STAGING_DIR;
use crate::data::DocumentEntry;
use crate::errors::MillError;
use crate::store::CorpusStore;

/// Store that maps each bucket to a directory under `root`.
///
/// Object names are relative paths inside the bucket directory. Writes land
/// in a staging directory beside the buckets first and are renamed into
/// place, so bucket directories only ever hold committed objects.
pub struct FsCorpusStore {
    root: PathBuf,
    follow_links: bool,
}

impl FsCorpusStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
        }
    }

    /// Configure symlink traversal while listing.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, MillError> {
        let relative = checked_relative(bucket)
            .filter(|relative| !relative.starts_with(STAGING_DIR))
            .ok_or_else(|| MillError::Store {
                bucket: bucket.to_string(),
                object: String::new(),
                reason: "bucket name must be a plain relative name".into(),
            })?;
        Ok(self.root.join(relative))
    }

    fn staging_path(&self) -> PathBuf {
        static NEXT_WRITE: AtomicU64 = AtomicU64::new(0);
        let sequence = NEXT_WRITE.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(STAGING_DIR)
            .join(format!("{}-{sequence}", process::id()))
    }

    fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf, MillError> {
        let relative = checked_relative(name).ok_or_else(|| MillError::Store {
            bucket: bucket.to_string(),
            object: name.to_string(),
            reason: "object name must be a relative path without '..'".into(),
        })?;
        Ok(self.bucket_dir(bucket)?.join(relative))
    }
}

impl CorpusStore for FsCorpusStore {
    fn list_documents(&self, bucket: &str) -> Result<Vec<DocumentEntry>, MillError> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut candidates = Vec::new();
        let mut walker = WalkDir::new(&dir);
        if self.follow_links {
            walker = walker.follow_links(true);
        }
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    candidates.push(entry.path().to_path_buf());
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("[shacl:store] skipping unreadable entry in bucket '{bucket}': {err}");
                }
            }
        }
        candidates.sort();

        let mut documents = Vec::with_capacity(candidates.len());
        for path in candidates {
            let name = object_name(&dir, &path);
            let content = fs::read(&path).map_err(|err| MillError::Store {
                bucket: bucket.to_string(),
                object: name.clone(),
                reason: format!("failed reading {}: {err}", path.display()),
            })?;
            documents.push(DocumentEntry::new(name, content));
        }
        Ok(documents)
    }

    fn put_object(&self, bucket: &str, name: &str, content: &[u8]) -> Result<(), MillError> {
        let target = self.object_path(bucket, name)?;
        let store_err = |reason: String| MillError::Store {
            bucket: bucket.to_string(),
            object: name.to_string(),
            reason,
        };
        let temp_target = self.staging_path();
        for dir in [target.parent(), temp_target.parent()].into_iter().flatten() {
            fs::create_dir_all(dir)
                .map_err(|err| store_err(format!("failed creating {}: {err}", dir.display())))?;
        }
        fs::write(&temp_target, content).map_err(|err| {
            store_err(format!("failed writing {}: {err}", temp_target.display()))
        })?;
        fs::rename(&temp_target, &target).map_err(|err| {
            let _ = fs::remove_file(&temp_target);
            store_err(format!("failed committing {}: {err}", target.display()))
        })
    }

    fn get_object(&self, bucket: &str, name: &str) -> Result<Option<Vec<u8>>, MillError> {
        let path = self.object_path(bucket, name)?;
        match fs::read(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(MillError::Store {
                bucket: bucket.to_string(),
                object: name.to_string(),
                reason: format!("failed reading {}: {err}", path.display()),
            }),
        }
    }
}

/// Accept only names made of normal path components.
fn checked_relative(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if name.is_empty() {
        return None;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Object name of `path` relative to its bucket directory, `/`-separated.
fn object_name(bucket_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(bucket_dir).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
