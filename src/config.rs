//! Ingest configuration
//!
//! Settings can come from environment variables, with defaults that match the
//! published export layout:
//! - `INGEST_DEVICE`: hardware model (default: "forerunner235")
//! - `INGEST_DATA_DIR`: directory holding the export files (default: ".")
//! - `INGEST_SLEEP_FILE`, `INGEST_ACTIVITY_FILE`, `INGEST_HEART_RATE_FILE`:
//!   file names per data kind, relative to the data directory

use std::path::PathBuf;

use crate::devices::DeviceModel;
use crate::error::IngestError;
use crate::source::{DirectorySource, SourcePaths};

pub const ENV_DEVICE: &str = "INGEST_DEVICE";
pub const ENV_DATA_DIR: &str = "INGEST_DATA_DIR";
pub const ENV_SLEEP_FILE: &str = "INGEST_SLEEP_FILE";
pub const ENV_ACTIVITY_FILE: &str = "INGEST_ACTIVITY_FILE";
pub const ENV_HEART_RATE_FILE: &str = "INGEST_HEART_RATE_FILE";

/// Ingest configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Device whose mapper is applied to every record
    pub device: DeviceModel,
    /// Directory holding the export files
    pub data_dir: PathBuf,
    /// Export file name per data kind
    pub paths: SourcePaths,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            device: DeviceModel::Forerunner235,
            data_dir: PathBuf::from("."),
            paths: SourcePaths::default(),
        }
    }
}

impl IngestConfig {
    /// Creates a configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `INGEST_DEVICE` names an unsupported model.
    pub fn from_env() -> Result<Self, IngestError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let device = lookup(ENV_DEVICE)
            .map(|d| d.parse::<DeviceModel>())
            .transpose()?
            .unwrap_or(defaults.device);

        let data_dir = lookup(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let paths = SourcePaths {
            sleep: lookup(ENV_SLEEP_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.paths.sleep),
            activity: lookup(ENV_ACTIVITY_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.paths.activity),
            heart_rate: lookup(ENV_HEART_RATE_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.paths.heart_rate),
        };

        let config = Self {
            device,
            data_dir,
            paths,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject file mappings that cannot name a file
    pub fn validate(&self) -> Result<(), IngestError> {
        for (name, path) in [
            (ENV_SLEEP_FILE, &self.paths.sleep),
            (ENV_ACTIVITY_FILE, &self.paths.activity),
            (ENV_HEART_RATE_FILE, &self.paths.heart_rate),
        ] {
            if path.as_os_str().is_empty() {
                return Err(IngestError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Directory source described by this configuration
    pub fn source(&self) -> DirectorySource {
        DirectorySource::with_paths(self.data_dir.clone(), self.paths.clone())
    }
}
