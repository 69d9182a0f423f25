//! Lifecycle configuration.
//!
//! Every section has a `Default` matching the reference deployment, and the
//! whole tree can be loaded from a JSON file.

use crate::core::{Error, Result};
use crate::data::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Cohort names in priority order (the first available model starts active)
    pub cohorts: Vec<String>,
    /// Target column; labels are `target > 0`
    pub target: String,
    /// Declared feature schema. Inferred from the first cohort when absent.
    pub schema: Option<FeatureSchema>,
    /// Local training settings
    pub trainer: TrainerConfig,
    /// Aggregation settings
    pub aggregator: AggregatorConfig,
    /// Drift detector settings
    pub drift: DriftConfig,
    /// Artifact and metrics locations
    pub storage: StorageConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cohorts: vec!["Typical".into(), "Athletic".into(), "Diver".into()],
            target: "num".to_string(),
            schema: None,
            trainer: TrainerConfig::default(),
            aggregator: AggregatorConfig::default(),
            drift: DriftConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LifecycleConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the cohort list.
    pub fn with_cohorts<S: AsRef<str>>(mut self, cohorts: &[S]) -> Self {
        self.cohorts = cohorts.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Set the feature schema.
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the round count.
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.aggregator.rounds = rounds;
        self
    }

    /// Reject settings the lifecycle cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cohorts.is_empty() {
            return Err(Error::Config("at least one cohort is required".into()));
        }
        if self.target.trim().is_empty() {
            return Err(Error::Config("target column must be named".into()));
        }
        self.trainer.validate()?;
        self.aggregator.validate()?;
        self.drift.validate()
    }
}

/// Local trainer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Standardize numerical columns after imputation
    pub scale_numeric: bool,
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Inverse L2 regularization strength (`C`)
    pub inverse_regularization: f64,
    /// Maximum gradient steps
    pub max_iter: usize,
    /// Gradient-norm stopping threshold
    pub tolerance: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            scale_numeric: true,
            learning_rate: 0.1,
            inverse_regularization: 1.0,
            max_iter: 1000,
            tolerance: 1e-6,
        }
    }
}

impl TrainerConfig {
    fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0) {
            return Err(Error::Config("trainer.learning_rate must be positive".into()));
        }
        if !(self.inverse_regularization > 0.0) {
            return Err(Error::Config("trainer.inverse_regularization must be positive".into()));
        }
        if self.max_iter == 0 {
            return Err(Error::Config("trainer.max_iter must be at least 1".into()));
        }
        Ok(())
    }
}

/// Federated aggregation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Rounds per training run
    pub rounds: u32,
    /// Largest/smallest cohort size ratio above which the unweighted mean
    /// is reported as imbalanced
    pub imbalance_warning_ratio: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            imbalance_warning_ratio: 2.0,
        }
    }
}

impl AggregatorConfig {
    fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(Error::Config("aggregator.rounds must be at least 1".into()));
        }
        if !(self.imbalance_warning_ratio >= 1.0) {
            return Err(Error::Config("aggregator.imbalance_warning_ratio must be >= 1".into()));
        }
        Ok(())
    }
}

/// Drift detector settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// False-positive confidence parameter
    pub delta: f64,
    /// Minimum observations on each side of a tested split
    pub min_sub_window: u64,
    /// Observations before the first test
    pub grace_period: u64,
    /// Test every `clock` updates
    pub clock: u64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            delta: 0.002,
            min_sub_window: 5,
            grace_period: 10,
            clock: 1,
        }
    }
}

impl DriftConfig {
    /// Set the confidence parameter.
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(Error::Config("drift.delta must lie in (0, 1)".into()));
        }
        if self.min_sub_window == 0 || self.clock == 0 {
            return Err(Error::Config("drift.min_sub_window and drift.clock must be at least 1".into()));
        }
        Ok(())
    }
}

/// Filesystem locations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `model_<cohort>.bin` artifacts
    pub artifact_dir: PathBuf,
    /// Directory holding `metrics_<stage>.json` records
    pub metrics_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
            metrics_dir: PathBuf::from("metrics"),
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Install a global `tracing` subscriber. Fails if one is already set.
    pub fn init(&self) -> Result<()> {
        let level: tracing::Level = self
            .level
            .parse()
            .map_err(|_| Error::Config(format!("unknown log level '{}'", self.level)))?;

        let builder = tracing_subscriber::fmt().with_max_level(level).with_target(true);
        let installed = match self.format {
            LogFormat::Text => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        installed.map_err(|e| Error::Config(format!("logging already initialized: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.aggregator.rounds, 3);
        assert_eq!(config.drift.delta, 0.002);
        assert_eq!(config.cohorts.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"aggregator": {{"rounds": 5}}, "drift": {{"delta": 0.01}}}}"#).unwrap();

        let config = LifecycleConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.aggregator.rounds, 5);
        assert_eq!(config.drift.delta, 0.01);
        assert_eq!(config.drift.min_sub_window, 5);
        assert_eq!(config.target, "num");
    }

    #[test]
    fn test_json_roundtrip_with_schema() {
        let config = LifecycleConfig::default()
            .with_schema(FeatureSchema::new(&["age"], &["sex"]).with_categories("sex", &["Female", "Male"]));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LifecycleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(LifecycleConfig::default().with_rounds(0).validate().is_err());
        assert!(LifecycleConfig::default()
            .with_cohorts::<&str>(&[])
            .validate()
            .is_err());

        let mut config = LifecycleConfig::default();
        config.drift = DriftConfig::default().with_delta(1.5);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_log_level() {
        let logging = LoggingConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(logging.init().is_err());
    }
}
