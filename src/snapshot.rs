//! Byte-exact capture and restore of the candidate artifact.
//!
//! The engine never interprets candidate contents. A snapshot is a full
//! byte copy held in memory together with its SHA-256 digest; restore
//! writes the bytes back through a temp file in the candidate's directory
//! and renames it into place, so the renderer never observes a partial
//! write.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::VergenceError;

/// A captured candidate state.
#[derive(Clone)]
pub struct SnapshotHandle {
    bytes: Vec<u8>,
    digest: [u8; 32],
}

impl SnapshotHandle {
    /// Hex encoded SHA-256 of the captured bytes, for audit logging.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SnapshotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotHandle")
            .field("len", &self.bytes.len())
            .field("digest", &self.digest_hex())
            .finish()
    }
}

/// Capture the current candidate state as a full byte copy.
pub fn capture(candidate: &Path) -> Result<SnapshotHandle, VergenceError> {
    let bytes = fs::read(candidate)
        .map_err(|e| VergenceError::Snapshot(format!("capturing {}: {e}", candidate.display())))?;
    let digest = Sha256::digest(&bytes).into();
    Ok(SnapshotHandle { bytes, digest })
}

/// Overwrite the candidate's live state with the captured bytes.
///
/// Idempotent: restoring the same handle twice is equivalent to once.
pub fn restore(candidate: &Path, handle: &SnapshotHandle) -> Result<(), VergenceError> {
    let dir = match candidate.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| VergenceError::Snapshot(format!("restoring {}: {e}", candidate.display())))?;
    tmp.write_all(&handle.bytes)
        .map_err(|e| VergenceError::Snapshot(format!("restoring {}: {e}", candidate.display())))?;
    tmp.persist(candidate).map_err(|e| {
        VergenceError::Snapshot(format!("restoring {}: {}", candidate.display(), e.error))
    })?;
    Ok(())
}
