//! Per-game JSON cache with a `raw` and a `final` partition.
//!
//! Keys are game ids and every key maps to exactly one file per partition, so
//! concurrent workers handling different games never touch the same path.

use crate::config::Layout;
use crate::error::{PipelineError, PipelineResult};
use nba_api::GameId;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Raw,
    Final,
}

impl Partition {
    pub fn label(&self) -> &'static str {
        match self {
            Partition::Raw => "raw",
            Partition::Final => "final",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameCache {
    raw_dir: PathBuf,
    final_dir: PathBuf,
}

impl GameCache {
    pub fn new(layout: &Layout) -> Self {
        Self {
            raw_dir: layout.raw_json_dir(),
            final_dir: layout.final_json_dir(),
        }
    }

    fn dir(&self, partition: Partition) -> &Path {
        match partition {
            Partition::Raw => &self.raw_dir,
            Partition::Final => &self.final_dir,
        }
    }

    pub fn path(&self, partition: Partition, key: GameId) -> PathBuf {
        self.dir(partition).join(format!("{key}.json"))
    }

    /// Overwrites any existing artifact for `key`.
    pub fn write(&self, partition: Partition, key: GameId, bytes: &[u8]) -> PipelineResult<()> {
        let dir = self.dir(partition);
        fs::create_dir_all(dir).map_err(PipelineError::io(dir))?;
        let path = self.path(partition, key);
        fs::write(&path, bytes).map_err(PipelineError::io(&path))
    }

    /// A missing file is [`PipelineError::MissingArtifact`] (skippable); any
    /// other read failure is an I/O error.
    pub fn read(&self, partition: Partition, key: GameId) -> PipelineResult<Vec<u8>> {
        let path = self.path(partition, key);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PipelineError::MissingArtifact(path))
            }
            Err(e) => Err(PipelineError::Io(e, path)),
        }
    }

    pub fn read_json(&self, partition: Partition, key: GameId) -> PipelineResult<serde_json::Value> {
        let bytes = self.read(partition, key)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            PipelineError::Decode(e, format!("{} payload for game {key}", partition.label()))
        })
    }

    pub fn contains(&self, partition: Partition, key: GameId) -> bool {
        self.path(partition, key).is_file()
    }

    /// Every key with an artifact in `partition`. A partition that was never
    /// written to is empty, not an error.
    pub fn keys(&self, partition: Partition) -> PipelineResult<BTreeSet<GameId>> {
        let dir = self.dir(partition);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(PipelineError::Io(e, dir.to_path_buf())),
        };

        let mut keys = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(PipelineError::io(dir))?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse::<GameId>() {
                keys.insert(id);
            }
        }
        Ok(keys)
    }
}
