//! Engine state and `$save` snapshots.

use std::collections::BTreeMap;
use std::path::Path;

use cascade_core::bits::Bits;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::VId;

/// Named state slots of one engine. Scalars are one-element vectors.
pub type EngineState = BTreeMap<String, Vec<Bits>>;

/// Last values an engine has read, by data-plane id.
pub type Input = BTreeMap<VId, Bits>;

/// The full simulation state written by `$save`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: u64,
    pub engines: BTreeMap<String, EngineState>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unable to access save file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed save file {path}: {source}")]
    Format {
        path: String,
        source: serde_json::Error,
    },
}

impl Snapshot {
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| SnapshotError::Format {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, text).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SnapshotError::Format {
            path: path.display().to_string(),
            source,
        })
    }
}

/// A single-slot scalar state.
pub fn scalar(name: &str, value: Bits) -> EngineState {
    let mut state = EngineState::new();
    state.insert(name.to_string(), vec![value]);
    state
}

/// Read back a scalar slot.
pub fn get_scalar<'a>(state: &'a EngineState, name: &str) -> Option<&'a Bits> {
    state.get(name).and_then(|v| v.first())
}
