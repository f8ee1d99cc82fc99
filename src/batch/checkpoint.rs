//! Periodic checkpoints of a running batch.
//!
//! A checkpoint re-expands every input row in input order and attaches the
//! record computed so far, if any. Checkpoints are advisory: they are
//! written for external recovery and never read back by the batch.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use super::record::AnalysisRecord;
use crate::error::Error as CrateError;

/// Error type for checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CheckpointError> for CrateError {
    fn from(err: CheckpointError) -> Self {
        CrateError::Checkpoint(err.to_string())
    }
}

/// One input row; `record` is absent until the URL has been processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRow {
    pub url: String,
    pub record: Option<AnalysisRecord>,
}

/// Snapshot of a batch in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique URLs completed when the snapshot was taken
    pub processed_count: usize,

    /// Every input row, in input order
    pub rows: Vec<CheckpointRow>,
}

impl Checkpoint {
    /// Merge the records computed so far against the input ordering
    pub fn new(order: &[String], records: &HashMap<String, AnalysisRecord>) -> Self {
        let rows = order
            .iter()
            .map(|url| CheckpointRow {
                url: url.clone(),
                record: records.get(url).cloned(),
            })
            .collect();
        Self {
            processed_count: records.len(),
            rows,
        }
    }
}

/// Destination for checkpoints
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    /// Persist a checkpoint taken after `trigger` URLs completed
    async fn write(&self, trigger: usize, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// Discards every checkpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCheckpointSink;

#[async_trait]
impl CheckpointSink for NullCheckpointSink {
    async fn write(&self, _trigger: usize, _checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        Ok(())
    }
}

/// Writes `intermediate_results_<n>.json` files into a directory
#[derive(Debug, Clone)]
pub struct JsonCheckpointSink {
    dir: PathBuf,
}

impl JsonCheckpointSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint written after `trigger` completions
    pub fn path_for(&self, trigger: usize) -> PathBuf {
        self.dir.join(format!("intermediate_results_{trigger}.json"))
    }
}

#[async_trait]
impl CheckpointSink for JsonCheckpointSink {
    async fn write(&self, trigger: usize, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(trigger);
        let json = serde_json::to_vec_pretty(checkpoint)?;
        fs::write(&path, json).await?;
        debug!("Wrote checkpoint {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn order() -> Vec<String> {
        vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
            "https://a.example".to_string(),
        ]
    }

    #[test]
    fn test_rows_follow_input_order() {
        let records = HashMap::from([(
            "https://a.example".to_string(),
            AnalysisRecord::not_ok("https://a.example", 200),
        )]);
        let checkpoint = Checkpoint::new(&order(), &records);

        assert_eq!(checkpoint.processed_count, 1);
        assert_eq!(checkpoint.rows.len(), 3);
        assert!(checkpoint.rows[0].record.is_some());
        assert!(checkpoint.rows[1].record.is_none());
        assert_eq!(checkpoint.rows[2].record, checkpoint.rows[0].record);
    }

    #[tokio::test]
    async fn test_json_sink_writes_file() {
        let dir = TempDir::new().unwrap();
        let sink = JsonCheckpointSink::new(dir.path().join("checkpoints"));
        let checkpoint = Checkpoint::new(&order(), &HashMap::new());

        sink.write(1000, &checkpoint).await.unwrap();

        let path = dir.path().join("checkpoints/intermediate_results_1000.json");
        let written: Checkpoint = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(written, checkpoint);
    }
}
