//! Metrics sinks.
//!
//! A sink keeps exactly one current accuracy per stage. Writes overwrite.

use crate::core::Result;
use crate::metrics::record::Stage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Core trait for metric storage.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Store the accuracy for a stage, replacing any previous value.
    async fn write(&self, stage: Stage, accuracy: f64) -> Result<()>;

    /// Read the current accuracy for a stage.
    ///
    /// Returns None if the stage was never written.
    async fn read(&self, stage: Stage) -> Result<Option<f64>>;
}

/// Persisted form of a stage record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct MetricFile {
    accuracy: f64,
}

/// One `metrics_<stage>.json` file per stage in a directory.
pub struct FileMetricsSink {
    dir: PathBuf,
}

impl FileMetricsSink {
    /// Create a sink rooted at `dir`, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// File backing a stage.
    pub fn path_for(&self, stage: Stage) -> PathBuf {
        self.dir
            .join(format!("metrics_{}.json", stage.key().replace('-', "_")))
    }
}

#[async_trait]
impl MetricsSink for FileMetricsSink {
    async fn write(&self, stage: Stage, accuracy: f64) -> Result<()> {
        let json = serde_json::to_vec(&MetricFile { accuracy })?;
        let path = self.path_for(stage);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read(&self, stage: Stage) -> Result<Option<f64>> {
        match tokio::fs::read(self.path_for(stage)).await {
            Ok(bytes) => {
                let record: MetricFile = serde_json::from_slice(&bytes)?;
                Ok(Some(record.accuracy))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sink held in memory.
#[derive(Default)]
pub struct InMemoryMetricsSink {
    values: RwLock<HashMap<Stage, f64>>,
}

impl InMemoryMetricsSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsSink for InMemoryMetricsSink {
    async fn write(&self, stage: Stage, accuracy: f64) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(stage, accuracy);
        Ok(())
    }

    async fn read(&self, stage: Stage) -> Result<Option<f64>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(&stage).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_file_sink_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileMetricsSink::new(dir.path()).unwrap();

        assert_eq!(sink.read(Stage::PostSwap).await.unwrap(), None);

        sink.write(Stage::PostSwap, 0.7).await.unwrap();
        sink.write(Stage::PostSwap, 0.9).await.unwrap();
        assert_eq!(sink.read(Stage::PostSwap).await.unwrap(), Some(0.9));
        assert_eq!(sink.read(Stage::PreSwap).await.unwrap(), None);

        let text = std::fs::read_to_string(dir.path().join("metrics_post_drift.json")).unwrap();
        assert_eq!(text, r#"{"accuracy":0.9}"#);
    }

    #[tokio::test]
    async fn test_file_sink_readers_never_see_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(FileMetricsSink::new(dir.path()).unwrap());
        sink.write(Stage::PostSwap, 0.5).await.unwrap();

        let writer = {
            let sink = sink.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    sink.write(Stage::PostSwap, i as f64 / 200.0).await.unwrap();
                }
            })
        };
        for _ in 0..200 {
            let value = sink.read(Stage::PostSwap).await.unwrap().unwrap();
            assert!((0.0..=1.0).contains(&value));
        }
        writer.await.unwrap();

        assert_eq!(sink.read(Stage::PostSwap).await.unwrap(), Some(199.0 / 200.0));
        assert!(!dir.path().join("metrics_post_drift.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_sink_reads_external_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metrics_centralized.json"), r#"{"accuracy": 0.83}"#).unwrap();

        let sink = FileMetricsSink::new(dir.path()).unwrap();
        assert_eq!(sink.read(Stage::PreSwap).await.unwrap(), Some(0.83));
    }

    #[test]
    fn test_memory_sink() {
        let sink = InMemoryMetricsSink::new();
        tokio_test::block_on(async {
            sink.write(Stage::PreSwap, 0.8).await.unwrap();
            assert_eq!(sink.read(Stage::PreSwap).await.unwrap(), Some(0.8));
            assert_eq!(sink.read(Stage::PostSwap).await.unwrap(), None);
        });
    }
}
