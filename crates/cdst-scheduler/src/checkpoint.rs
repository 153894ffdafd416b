//! Checkpoint store: periodic snapshots of a running scenario's
//! best-so-far generation, so a crashed worker can resume instead of
//! restarting from generation zero.

use cdst_core::ids::ScenarioId;
use cdst_core::{CdstError, CdstResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// File-format magic bytes: identifies a checkpoint file and its version,
/// so a future format change fails loudly instead of silently
/// misinterpreting an old file.
pub const MAGIC: &[u8; 5] = b"CDST\x01";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    pub scenario_id: String,
    pub generation: usize,
    pub best_composite: f64,
    pub population_json: String,
}

/// Storage backend for checkpoints. Implementations must be safe to call
/// from a blocking worker thread (the scheduler never awaits inside the
/// optimization loop itself).
pub trait CheckpointStore: Send + Sync {
    fn save(&self, scenario_id: &ScenarioId, data: &CheckpointData) -> CdstResult<()>;
    fn load(&self, scenario_id: &ScenarioId) -> CdstResult<Option<CheckpointData>>;
    fn clear(&self, scenario_id: &ScenarioId) -> CdstResult<()>;
}

/// In-memory store, useful for tests and for scheduler instances that
/// don't need checkpoints to survive a process restart.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    entries: Mutex<HashMap<String, CheckpointData>>,
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&self, scenario_id: &ScenarioId, data: &CheckpointData) -> CdstResult<()> {
        self.entries
            .lock()
            .map_err(|_| CdstError::Scheduler("checkpoint store lock poisoned".into()))?
            .insert(scenario_id.as_str().to_string(), data.clone());
        Ok(())
    }

    fn load(&self, scenario_id: &ScenarioId) -> CdstResult<Option<CheckpointData>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| CdstError::Scheduler("checkpoint store lock poisoned".into()))?
            .get(scenario_id.as_str())
            .cloned())
    }

    fn clear(&self, scenario_id: &ScenarioId) -> CdstResult<()> {
        self.entries
            .lock()
            .map_err(|_| CdstError::Scheduler("checkpoint store lock poisoned".into()))?
            .remove(scenario_id.as_str());
        Ok(())
    }
}

/// Durable, file-backed store: one file per scenario under `base_dir`,
/// prefixed with [`MAGIC`] so a truncated or foreign file is rejected
/// rather than misparsed.
pub struct FileCheckpointStore {
    base_dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(base_dir: PathBuf) -> CdstResult<Self> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, scenario_id: &ScenarioId) -> PathBuf {
        self.base_dir.join(format!("{}.ckpt", scenario_id.as_str()))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, scenario_id: &ScenarioId, data: &CheckpointData) -> CdstResult<()> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(serde_json::to_string(data)?.as_bytes());
        std::fs::write(self.path_for(scenario_id), bytes)?;
        Ok(())
    }

    fn load(&self, scenario_id: &ScenarioId) -> CdstResult<Option<CheckpointData>> {
        let path = self.path_for(scenario_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(CdstError::Scheduler("checkpoint file missing or wrong magic bytes".into()));
        }
        let data: CheckpointData = serde_json::from_slice(&bytes[MAGIC.len()..])?;
        Ok(Some(data))
    }

    fn clear(&self, scenario_id: &ScenarioId) -> CdstResult<()> {
        let path = self.path_for(scenario_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
