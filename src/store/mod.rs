//! Persistence boundary for the engine's three blobs.
//!
//! The engine owns the blob formats; the store only moves opaque bytes. A
//! missing blob is `Ok(None)`, never an error, so a fresh deployment starts
//! cold instead of crashing.

use thiserror::Error;

pub mod local;

pub use local::LocalStore;

/// The three independently-persisted blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// Append-only JSON array of check-in records. Source of truth.
    CheckinLog,
    /// Derived JSON mapping of clinic key to snapshot. Always rebuildable.
    ClinicIndex,
    /// Serialized forecaster state.
    ForecasterModel,
}

impl BlobKind {
    pub fn file_name(self) -> &'static str {
        match self {
            BlobKind::CheckinLog => "checkins_index.json",
            BlobKind::ClinicIndex => "clinics_index.json",
            BlobKind::ForecasterModel => "forecaster_state.json",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {blob}: {source}")]
    Read {
        blob: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {blob}: {source}")]
    Write {
        blob: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Whole-blob load/save. Implementations are read-modify-write with no
/// concurrency token; racing writers can overwrite each other, which is
/// accepted at this write volume.
pub trait BlobStore: Send + Sync {
    fn load(&self, kind: BlobKind) -> Result<Option<Vec<u8>>, StoreError>;
    fn save(&self, kind: BlobKind, bytes: &[u8]) -> Result<(), StoreError>;
}
