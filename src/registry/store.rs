//! Model artifact stores.
//!
//! One artifact per cohort, overwritten whenever the cohort retrains.

use crate::core::Result;
use crate::model::TrainedModel;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Storage for fitted cohort models.
///
/// Called from blocking training tasks, so the interface is synchronous.
pub trait ArtifactStore: Send + Sync {
    /// Persist a model under the cohort's name.
    fn save(&self, cohort: &str, model: &TrainedModel) -> Result<()>;

    /// Load a cohort's model.
    ///
    /// Returns None if no artifact exists.
    fn load(&self, cohort: &str) -> Result<Option<TrainedModel>>;
}

/// `model_<cohort>.bin` files in a directory, bincode-encoded.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    /// Create a store rooted at `dir`, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// File backing a cohort.
    pub fn path_for(&self, cohort: &str) -> PathBuf {
        self.dir.join(format!("model_{}.bin", cohort.to_lowercase()))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn save(&self, cohort: &str, model: &TrainedModel) -> Result<()> {
        let bytes = bincode::serialize(model)?;
        let path = self.path_for(cohort);
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, cohort: &str) -> Result<Option<TrainedModel>> {
        match std::fs::read(self.path_for(cohort)) {
            Ok(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Store held in memory.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    models: RwLock<HashMap<String, TrainedModel>>,
}

impl InMemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored cohort names.
    pub fn cohorts(&self) -> Vec<String> {
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        models.keys().cloned().collect()
    }

    /// Drop a cohort's artifact.
    pub fn remove(&self, cohort: &str) -> Option<TrainedModel> {
        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        models.remove(cohort)
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn save(&self, cohort: &str, model: &TrainedModel) -> Result<()> {
        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        models.insert(cohort.to_string(), model.clone());
        Ok(())
    }

    fn load(&self, cohort: &str) -> Result<Option<TrainedModel>> {
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        Ok(models.get(cohort).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;
    use crate::simulation::{cohort_dataset, heart_schema, CohortProfile};

    fn model(seed: u64) -> TrainedModel {
        let data = cohort_dataset(CohortProfile::Typical, 80, seed).unwrap();
        TrainedModel::fit(&data, &heart_schema(), &TrainerConfig::default()).unwrap()
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path()).unwrap();
        let m = model(1);

        store.save("Typical", &m).unwrap();
        assert!(dir.path().join("model_typical.bin").exists());

        let loaded = store.load("Typical").unwrap().unwrap();
        assert_eq!(loaded, m);
        assert!(store.load("Diver").unwrap().is_none());
    }

    #[test]
    fn test_file_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path()).unwrap();

        store.save("Typical", &model(1)).unwrap();
        let newer = model(2);
        store.save("Typical", &newer).unwrap();

        assert_eq!(store.load("Typical").unwrap().unwrap(), newer);
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path()).unwrap();
        std::fs::write(store.path_for("Typical"), b"not a model").unwrap();

        assert!(store.load("Typical").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = InMemoryArtifactStore::new();
        store.save("Diver", &model(3)).unwrap();
        assert_eq!(store.cohorts(), vec!["Diver"]);
        assert!(store.remove("Diver").is_some());
        assert!(store.load("Diver").unwrap().is_none());
    }
}
