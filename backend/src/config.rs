//! Application configuration.
//!
//! Settings come from `buildtrack.toml` (path overridable with
//! `BUILDTRACK_CONFIG`); a missing file means defaults. Environment
//! variables override the file:
//!
//! | Variable          | Setting                 |
//! |-------------------|-------------------------|
//! | `HOST`            | `server.host`           |
//! | `PORT`            | `server.port`           |
//! | `REPOSITORY_TYPE` | `repository.type`       |
//! | `DATABASE_URL`    | `postgres.database_url` |
//! | `S3_BUCKET`       | `storage.bucket`        |
//! | `AWS_REGION`      | `storage.region`        |
//! | `S3_ENDPOINT`     | `storage.endpoint`      |
//! | `OPENAI_API_KEY`  | `llm.api_key`           |
//! | `OPENAI_MODEL`    | `llm.model`             |
//! | `OPENAI_BASE_URL` | `llm.base_url`          |

use object_store::memory::InMemory;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::db::{PostgresSettings, RepositoryError, RepositoryFactory, RepositorySettings};
use crate::rpc::Services;
use crate::services::extraction::ExtractionError;
use crate::services::{
    FileStorage, InvoiceExtractor, LlmSettings, OpenAiChatModel, S3Settings, StorageError,
};

pub const DEFAULT_CONFIG_PATH: &str = "buildtrack.toml";
pub const CONFIG_PATH_ENV: &str = "BUILDTRACK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Object storage. Without a bucket, files live in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub presign_expiry_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            presign_expiry_secs: 900,
        }
    }
}

impl StorageSettings {
    pub fn s3(&self) -> Option<S3Settings> {
        let bucket = self.bucket.as_deref().filter(|b| !b.is_empty())?;
        Some(S3Settings {
            bucket: bucket.to_string(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub repository: RepositorySettings,
    pub postgres: PostgresSettings,
    pub storage: StorageSettings,
    pub llm: LlmSettings,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`; a file that does not exist yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// File settings with the process environment applied on top.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port,
            })?;
        }
        if let Some(repo_type) = lookup("REPOSITORY_TYPE") {
            self.repository.repo_type = repo_type;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.postgres.database_url = url;
        }
        if let Some(bucket) = lookup("S3_BUCKET") {
            self.storage.bucket = Some(bucket);
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(endpoint) = lookup("S3_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Repository, storage and (when an API key is set) the invoice extractor.
    pub async fn build_services(&self) -> Result<Services, ConfigError> {
        let repo = RepositoryFactory::from_settings(&self.repository, &self.postgres).await?;

        let storage = match self.storage.s3() {
            Some(s3) => {
                tracing::info!(bucket = %s3.bucket, region = %s3.region, "using S3 storage");
                FileStorage::s3(&s3)?
            }
            None => {
                tracing::warn!("no storage bucket configured, files are kept in memory");
                FileStorage::new(Arc::new(InMemory::new()))
            }
        }
        .with_presign_expiry(Duration::from_secs(self.storage.presign_expiry_secs));

        let mut services = Services::new(repo, storage);
        match OpenAiChatModel::from_settings(&self.llm) {
            Some(model) => {
                tracing::info!(model = %self.llm.model, "invoice extraction enabled");
                let extractor = InvoiceExtractor::new(Arc::new(model))?;
                services = services.with_extractor(Arc::new(extractor));
            }
            None => tracing::warn!("no LLM API key configured, invoice extraction disabled"),
        }
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.storage.s3().is_none());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildtrack.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9000

[repository]
type = "local"

[storage]
bucket = "site-files"
region = "eu-west-1"

[llm]
model = "gpt-4o-mini"
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        let s3 = config.storage.s3().unwrap();
        assert_eq!(s3.bucket, "site-files");
        assert_eq!(s3.region, "eu-west-1");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml("[server]\nport = 9000\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("PORT", "7000"),
            ("REPOSITORY_TYPE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/buildtrack"),
            ("OPENAI_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.repository.repo_type, "postgres");
        assert_eq!(config.postgres.database_url, "postgres://localhost/buildtrack");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_bad_port() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|key| (key == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AppConfig::from_toml("[server\nport = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_build_local_services() {
        let services = AppConfig::default().build_services().await.unwrap();
        assert!(services.extractor.is_none());
        assert!(services.repo.health_check().await.unwrap());
    }
}
