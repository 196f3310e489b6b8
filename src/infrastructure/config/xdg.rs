//! Config file under the XDG config directory
//!
//! The file is checked on every load: unknown keys, wrongly typed values
//! and unusable values are all reported against the dotted key at fault,
//! so `fieldlink config` and the session never run on a half-read file.

use std::ops::Range;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, CONFIG_KEYS};
use crate::domain::error::ConfigError;

const HEADER: &str = "# fieldlink configuration. Keys: `fieldlink config list`\n\n";

/// `$XDG_CONFIG_HOME/fieldlink/config.toml`, or a path given by the caller
pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("~/.config"));
        Self {
            path: base.join("fieldlink").join("config.toml"),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read a config file body: TOML syntax, then known keys, then types,
    /// then values.
    fn parse_toml(content: &str) -> Result<AppConfig, ConfigError> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| syntax_error(content, &e))?;
        reject_unknown_keys(&table)?;

        let config: AppConfig = toml::from_str(content).map_err(|e| {
            match e.span().and_then(|span| key_at(content, span.start)) {
                Some(key) => ConfigError::ValidationError {
                    key,
                    message: e.message().to_string(),
                },
                None => syntax_error(content, &e),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
        let body =
            toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        Ok(format!("{}{}", HEADER, body))
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Every top-level key and every key inside a known table must be listed
fn reject_unknown_keys(table: &toml::Table) -> Result<(), ConfigError> {
    for (name, value) in table {
        let nested = match value {
            toml::Value::Table(inner) => inner.keys().map(|k| format!("{}.{}", name, k)).collect(),
            _ => vec![name.clone()],
        };
        if let Some(key) = nested.into_iter().find(|k| !CONFIG_KEYS.contains(&k.as_str())) {
            return Err(ConfigError::ValidationError {
                key,
                message: "Unknown key".to_string(),
            });
        }
    }
    Ok(())
}

fn syntax_error(content: &str, e: &toml::de::Error) -> ConfigError {
    match e.span() {
        Some(span) => ConfigError::ParseError(format!(
            "line {}: {}",
            line_of(content, span),
            e.message()
        )),
        None => ConfigError::ParseError(e.message().to_string()),
    }
}

fn line_of(content: &str, span: Range<usize>) -> usize {
    let end = span.start.min(content.len());
    content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Dotted key assigned on the line holding `offset`, qualified by the
/// `[table]` it sits in
fn key_at(content: &str, offset: usize) -> Option<String> {
    let mut table: Option<&str> = None;
    let mut start = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(name) = trimmed.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            table = Some(name.trim());
        }
        start += line.len();
        if offset < start {
            let (key, _) = trimmed.split_once('=')?;
            let key = key.trim();
            return Some(match table {
                Some(table) => format!("{}.{}", table, key),
                None => key.to_string(),
            });
        }
    }
    None
}

async fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.exists() {
            return Ok(AppConfig::empty());
        }
        let content = read_file(&self.path).await?;
        let config = Self::parse_toml(&content)?;
        debug!(path = %self.path.display(), "config loaded");
        Ok(config)
    }

    /// Written to a sibling file first and renamed over the old one, so a
    /// failed write never leaves a truncated config behind.
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let write_error = |e: std::io::Error| ConfigError::WriteError(e.to_string());
        let content = Self::to_toml(config)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, content).await.map_err(write_error)?;
        if let Err(e) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(write_error(e));
        }
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(
                self.path.display().to_string(),
            ));
        }
        self.save(&AppConfig::defaults()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{LocationConfig, PermissionsConfig};

    fn failing_key(content: &str) -> String {
        match XdgConfigStore::parse_toml(content) {
            Err(ConfigError::ValidationError { key, .. }) => key,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn default_path_is_xdg() {
        let path = XdgConfigStore::new().path();
        assert!(path.ends_with("fieldlink/config.toml"));
    }

    #[test]
    fn parse_toml_with_sections() {
        let content = r#"
endpoint = "ws://10.0.2.2:8765"
camera_command = "libcamera-still -n -o -"

[permissions]
location = false

[location]
latitude = 59.3293
longitude = 18.0686
"#;

        let config = XdgConfigStore::parse_toml(content).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("ws://10.0.2.2:8765"));
        assert_eq!(config.camera_command(), Some("libcamera-still -n -o -"));
        assert!(!config.location_allowed_or_default());
        assert!(config.camera_allowed_or_default());
        let fix = config.fixed_location().unwrap().unwrap();
        assert_eq!(fix.longitude, 18.0686);
    }

    #[test]
    fn unknown_keys_are_named() {
        assert_eq!(failing_key("[permissions]\ncamra = true\n"), "permissions.camra");
        assert_eq!(failing_key("api_key = \"x\"\n"), "api_key");
        assert_eq!(failing_key("[audio]\nrate = 16000\n"), "audio.rate");
    }

    #[test]
    fn wrong_types_are_named() {
        assert_eq!(failing_key("endpoint = 42\n"), "endpoint");
        assert_eq!(
            failing_key("[location]\nlatitude = \"north\"\nlongitude = 1.0\n"),
            "location.latitude"
        );
        assert_eq!(
            failing_key("[permissions]\ncamera = true\nmicrophone = \"yes\"\n"),
            "permissions.microphone"
        );
    }

    #[test]
    fn unusable_values_are_named() {
        assert_eq!(failing_key("endpoint = \"http://relay.local\"\n"), "endpoint");
        assert_eq!(failing_key("camera_command = \"  \"\n"), "camera_command");
        assert_eq!(
            failing_key("[location]\nlatitude = 95.0\nlongitude = 0.0\n"),
            "location.latitude"
        );
    }

    #[test]
    fn syntax_errors_carry_the_line() {
        let err = XdgConfigStore::parse_toml("endpoint = \"ws://a:1\"\n[location\n").unwrap_err();
        match err {
            ConfigError::ParseError(message) => assert!(message.starts_with("line 2:")),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn key_at_tracks_tables() {
        let content = "endpoint = \"x\"\n\n[location]\nlatitude = 1\n";
        assert_eq!(key_at(content, 3).as_deref(), Some("endpoint"));
        assert_eq!(key_at(content, content.len() - 2).as_deref(), Some("location.latitude"));
        assert_eq!(key_at(content, 17), None);
    }

    #[test]
    fn to_toml_reads_back() {
        let config = AppConfig {
            endpoint: Some("wss://relay.example.org".to_string()),
            permissions: Some(PermissionsConfig {
                microphone: Some(false),
                ..Default::default()
            }),
            location: Some(LocationConfig {
                latitude: Some(-1.5),
                longitude: Some(36.8),
                accuracy: Some(25.0),
            }),
            ..Default::default()
        };

        let toml = XdgConfigStore::to_toml(&config).unwrap();
        assert!(toml.starts_with("# fieldlink"));
        assert_eq!(XdgConfigStore::parse_toml(&toml).unwrap(), config);
    }

    #[tokio::test]
    async fn init_then_load_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("nested/config.toml"));

        assert_eq!(store.load().await.unwrap(), AppConfig::empty());
        store.init().await.unwrap();
        assert!(store.exists());
        assert!(!store.staging_path().exists());
        assert_eq!(store.load().await.unwrap(), AppConfig::defaults());
        assert!(matches!(
            store.init().await,
            Err(ConfigError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[location]\nlatitude = 12.0\nlongitude = 200.0\n").unwrap();

        let err = XdgConfigStore::with_path(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("location.longitude"));
    }

    #[tokio::test]
    async fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));
        store.init().await.unwrap();

        let mut config = store.load().await.unwrap();
        config.endpoint = Some("ws://10.0.0.7:9000".to_string());
        store.save(&config).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.endpoint.as_deref(), Some("ws://10.0.0.7:9000"));
        assert!(!store.staging_path().exists());
    }
}
