use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use opsdesk_transfer::TransferSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub transfer: TransferSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub cors: bool,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: StorageBackend,
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferSection {
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,
    #[serde(default = "default_local_root")]
    pub local_root: String,
    #[serde(default = "default_true")]
    pub seed_demo_files: bool,
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            completion_delay_ms: default_completion_delay_ms(),
            local_root: default_local_root(),
            seed_demo_files: true,
        }
    }
}

impl TransferSection {
    pub fn settings(&self) -> TransferSettings {
        TransferSettings {
            completion_delay: Duration::from_millis(self.completion_delay_ms),
            local_root: self.local_root.clone(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&source)
            .with_context(|| format!("invalid config TOML at {}", path.display()))
    }

    pub fn parse(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_completion_delay_ms() -> u64 {
    1000
}

fn default_local_root() -> String {
    "/local/accessible".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::{RuntimeConfig, StorageBackend};
    use std::time::Duration;

    #[test]
    fn empty_file_uses_defaults() {
        let config = RuntimeConfig::parse("").expect("parse");
        assert_eq!(config.http.bind, "127.0.0.1:8080");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.transfer.seed_demo_files);
        assert_eq!(
            config.transfer.settings().completion_delay,
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn reads_all_sections() {
        let config = RuntimeConfig::parse(
            r#"
            [http]
            bind = "0.0.0.0:9090"
            cors = true

            [storage]
            backend = "sqlite"
            sqlite_path = "data/opsdesk.db"

            [transfer]
            completion_delay_ms = 250
            local_root = "/srv/reports"
            seed_demo_files = false
            "#,
        )
        .expect("parse");

        assert!(config.http.cors);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.sqlite_path.as_deref(), Some("data/opsdesk.db"));
        let settings = config.transfer.settings();
        assert_eq!(settings.completion_delay, Duration::from_millis(250));
        assert_eq!(settings.local_root, "/srv/reports");
        assert!(!config.transfer.seed_demo_files);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(RuntimeConfig::parse("[storage]\nbackend = \"postgres\"\n").is_err());
    }
}
