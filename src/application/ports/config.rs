//! Persisted user settings

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Where `fieldlink config` reads and writes the settings file.
///
/// `load` returns an empty config when there is no file yet, and an error
/// naming the offending key when the file holds something unusable. The
/// session merges the result under env and flag values.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Replace the stored settings with `config`
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write the defaults. `AlreadyExists` if a file is present.
    async fn init(&self) -> Result<(), ConfigError>;
}
