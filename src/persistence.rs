//! Last known cover state across restarts.
//!
//! A single postcard-encoded [`CoverSnapshot`] under the "cover" namespace.
//! It is only a fallback: endstop readings at startup always win.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::{Error, Result};
use crate::fsm::MotionOperation;

const SNAPSHOT_NAMESPACE: &str = "cover";
const SNAPSHOT_KEY: &str = "state";
const SNAPSHOT_MAX_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverSnapshot {
    pub position: f32,
    /// Last travel direction, used by the pulse policy after a restart.
    pub last_operation: MotionOperation,
}

impl CoverSnapshot {
    fn is_plausible(&self) -> bool {
        self.position.is_finite() && (0.0..=1.0).contains(&self.position)
    }
}

/// Storage-backed snapshot slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotStore;

impl SnapshotStore {
    pub fn new() -> Self {
        Self
    }

    pub fn save(&self, storage: &mut dyn StoragePort, snapshot: &CoverSnapshot) -> Result<()> {
        let bytes = postcard::to_allocvec(snapshot).map_err(|_| Error::Snapshot("encode failed"))?;
        storage.write(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, &bytes)?;
        Ok(())
    }

    /// Load the stored snapshot.  `Ok(None)` when nothing was stored.
    pub fn load(&self, storage: &dyn StoragePort) -> Result<Option<CoverSnapshot>> {
        let mut buf = [0u8; SNAPSHOT_MAX_LEN];
        let len = match storage.read(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: CoverSnapshot =
            postcard::from_bytes(&buf[..len]).map_err(|_| Error::Snapshot("decode failed"))?;
        if !snapshot.is_plausible() {
            warn!("COVER: stored position {} out of range, ignored", snapshot.position);
            return Err(Error::Snapshot("position out of range"));
        }
        Ok(Some(snapshot))
    }

    pub fn clear(&self, storage: &mut dyn StoragePort) -> Result<()> {
        storage.delete(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY)?;
        Ok(())
    }

    pub fn exists(&self, storage: &dyn StoragePort) -> bool {
        storage.exists(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY)
    }
}
