use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::ingest::WRITE_WINDOW;
use crate::poll::POLL_INTERVAL;
use crate::store::{FileStore, KvStore, MemoryStore};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Which durable store backs the trail. `none` runs the service without
/// one; every cache operation then degrades as documented.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_store_folder")]
        folder: PathBuf,
    },
    Memory,
    None,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            folder: default_store_folder(),
        }
    }
}

fn default_store_folder() -> PathBuf {
    PathBuf::from("./data")
}

impl StoreConfig {
    /// Resolve the backend once, at startup. The handle never changes for
    /// the lifetime of the process.
    pub fn resolve(&self) -> Option<Arc<dyn KvStore>> {
        match self {
            StoreConfig::File { folder } => Some(Arc::new(FileStore::new(folder.clone()))),
            StoreConfig::Memory => Some(Arc::new(MemoryStore::new())),
            StoreConfig::None => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_write_window", deserialize_with = "duration_str")]
    pub write_window: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            write_window: default_write_window(),
        }
    }
}

fn default_write_window() -> Duration {
    WRITE_WINDOW
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval", deserialize_with = "duration_str")]
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> Duration {
    POLL_INTERVAL
}

fn duration_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    SubmitFix,
    ReadTrail,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gets_all_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert!(matches!(config.store, StoreConfig::File { .. }));
        assert_eq!(config.ingest.write_window, Duration::from_secs(5));
        assert_eq!(config.poll.interval, Duration::from_secs(5));
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn full_document_parses() {
        let yaml = r#"
web:
  bind: "127.0.0.1:9000"
store:
  kind: file
  folder: /var/lib/fixtrail
ingest:
  write_window: 30s
poll:
  interval: 2s
api_keys:
  - key: secret123
    name: phone
    permissions: [submit_fix]
  - key: secret456
    name: dashboard
    permissions: [read_trail, submit_fix]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.web.bind, "127.0.0.1:9000");
        assert_eq!(config.ingest.write_window, Duration::from_secs(30));
        assert_eq!(config.poll.interval, Duration::from_secs(2));

        let phone = config.find_api_key("secret123").unwrap();
        assert_eq!(phone.name, "phone");
        assert!(phone.permissions.contains(&Permission::SubmitFix));
        assert!(!phone.permissions.contains(&Permission::ReadTrail));

        assert!(config.find_api_key("wrong").is_none());
    }

    #[test]
    fn store_kinds_resolve() {
        let memory: StoreConfig = serde_yaml::from_str("kind: memory").unwrap();
        assert!(memory.resolve().is_some());

        let none: StoreConfig = serde_yaml::from_str("kind: none").unwrap();
        assert!(none.resolve().is_none());

        let file: StoreConfig = serde_yaml::from_str("kind: file\nfolder: ./somewhere").unwrap();
        assert!(file.resolve().is_some());
    }

    #[test]
    fn bad_duration_is_a_parse_error() {
        let result: Result<Config, _> = serde_yaml::from_str("ingest:\n  write_window: soon");
        assert!(result.is_err());
    }
}
