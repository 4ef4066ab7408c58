//! Local filesystem blob store.

use super::{BlobKind, BlobStore, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each blob as one file under a data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::Write {
            blob: "data directory",
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, kind: BlobKind) -> PathBuf {
        self.root.join(kind.file_name())
    }
}

impl BlobStore for LocalStore {
    fn load(&self, kind: BlobKind) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.path_for(kind)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                blob: kind.file_name(),
                source,
            }),
        }
    }

    fn save(&self, kind: BlobKind, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::write(self.path_for(kind), bytes).map_err(|source| StoreError::Write {
            blob: kind.file_name(),
            source,
        })
    }
}
